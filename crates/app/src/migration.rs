//! Provision the catalog's collections in the remote database.
//!
//! Collections are processed one at a time in catalog order. Inside a
//! collection, attributes are created before indexes, one call at a time.
//! A failure stops the current collection only; the run moves on to the
//! next one and reports every failure in the summary.

use dernek_domain::{
    AttributeDefinition, AttributeType, CollectionDefinition, CollectionId, IndexDefinition,
};
use dernek_ports::{
    AttributeRequest, CollectionSpec, IndexRequest, LogFields, LoggerPort, SchemaAdminPort,
    log_fields,
};
use dernek_shared::{ErrorEnvelope, RequestContext, Result, RetryPolicy, retry_async_with_observer};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Size used for string attributes that declare none.
pub const DEFAULT_STRING_SIZE: u32 = 255;
/// Size of the string attribute backing an array attribute.
pub const ARRAY_STRING_SIZE: u32 = 1_000;
/// Default stored for optional array attributes.
pub const EMPTY_ARRAY_JSON: &str = "[]";

/// Dependencies of [`migrate`] and [`crate::rollback::rollback`].
#[derive(Clone)]
pub struct MigrationDeps {
    /// Schema administration adapter.
    pub schema: Arc<dyn SchemaAdminPort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Input of [`migrate`].
#[derive(Debug, Clone)]
pub struct MigrationInput {
    /// Collections to provision, in order.
    pub catalog: Vec<CollectionDefinition>,
    /// Retry policy for the existence check.
    pub existence_retry: RetryPolicy,
}

impl MigrationInput {
    /// Provision `catalog` with the standard existence-check retry.
    #[must_use]
    pub const fn new(catalog: Vec<CollectionDefinition>) -> Self {
        Self {
            catalog,
            existence_retry: RetryPolicy::STANDARD,
        }
    }
}

/// Per-collection provisioning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    /// Not checked yet, or confirmed missing.
    Absent,
    /// Collection create call in flight.
    CreatingCollection,
    /// Attribute calls in flight.
    CreatingAttributes,
    /// Index calls in flight.
    CreatingIndexes,
    /// Fully provisioned by this run.
    Done,
    /// Already present; left untouched.
    Skipped,
    /// Stopped by an error.
    Failed,
}

impl CollectionState {
    /// Stage a failure in this state belongs to.
    const fn failing_stage(self) -> MigrationStage {
        match self {
            Self::Absent | Self::Done | Self::Skipped | Self::Failed => {
                MigrationStage::ExistenceCheck
            },
            Self::CreatingCollection => MigrationStage::CreateCollection,
            Self::CreatingAttributes => MigrationStage::CreateAttribute,
            Self::CreatingIndexes => MigrationStage::CreateIndex,
        }
    }
}

/// Step that produced a provisioning error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStage {
    /// Catalog entry failed its consistency check.
    Validate,
    /// Existence check.
    ExistenceCheck,
    /// Collection creation.
    CreateCollection,
    /// Attribute creation.
    CreateAttribute,
    /// Index creation.
    CreateIndex,
    /// Collection deletion (rollback).
    DeleteCollection,
}

/// One recorded provisioning failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationError {
    /// Collection being processed.
    pub collection: CollectionId,
    /// Failing step.
    pub stage: MigrationStage,
    /// Attribute or index key, when the step had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<str>>,
    /// Error message.
    pub message: String,
}

/// Final state of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOutcome {
    /// Collection id.
    pub collection: CollectionId,
    /// Terminal state.
    pub state: CollectionState,
}

/// Result of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    /// Collections in the catalog.
    pub total_collections: usize,
    /// Collections created by this run.
    pub created: usize,
    /// Collections that already existed.
    pub skipped: usize,
    /// Collections stopped by an error.
    pub failed: usize,
    /// Every recorded failure.
    pub errors: Vec<MigrationError>,
    /// Terminal state per collection, in catalog order.
    pub outcomes: Vec<CollectionOutcome>,
    /// Wall-clock duration.
    pub duration_ms: u64,
}

impl MigrationSummary {
    /// No failures recorded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Final one-line report.
    pub fn message(&self) -> String {
        let seconds = Duration::from_millis(self.duration_ms).as_secs_f64();
        if self.is_success() {
            format!("Migration completed successfully in {seconds:.2}s")
        } else {
            format!(
                "Migration completed with {} errors in {seconds:.2}s",
                self.errors.len()
            )
        }
    }
}

/// Provision every collection of the catalog that does not exist yet.
///
/// Only cancellation aborts the run; every other failure is recorded in the
/// summary.
#[tracing::instrument(name = "migration.run", skip_all, fields(collections = input.catalog.len()))]
pub async fn migrate(
    ctx: &RequestContext,
    deps: &MigrationDeps,
    input: MigrationInput,
) -> Result<MigrationSummary> {
    let started_at = Instant::now();
    log_info(
        deps,
        "dernek.migration.start",
        "Migration started",
        log_fields([("totalCollections", Value::from(input.catalog.len()))]),
    );

    let mut errors = Vec::new();
    let mut outcomes = Vec::with_capacity(input.catalog.len());

    for definition in &input.catalog {
        ctx.ensure_not_cancelled("migration.collection")?;
        let state = provision_collection(ctx, deps, definition, input.existence_retry, &mut errors)
            .await?;
        outcomes.push(CollectionOutcome {
            collection: definition.id.clone(),
            state,
        });
    }

    let count = |wanted: CollectionState| {
        outcomes
            .iter()
            .filter(|outcome| outcome.state == wanted)
            .count()
    };
    let (created, skipped, failed) = (
        count(CollectionState::Done),
        count(CollectionState::Skipped),
        count(CollectionState::Failed),
    );
    let summary = MigrationSummary {
        total_collections: input.catalog.len(),
        created,
        skipped,
        failed,
        errors,
        outcomes,
        duration_ms: duration_ms(started_at),
    };

    let fields = log_fields([
        ("created", Value::from(summary.created)),
        ("skipped", Value::from(summary.skipped)),
        ("failed", Value::from(summary.failed)),
        ("durationMs", Value::from(summary.duration_ms)),
    ]);
    if summary.is_success() {
        log_info(deps, "dernek.migration.completed", &summary.message(), fields);
    } else if let Some(logger) = deps.logger.as_ref() {
        logger.warn("dernek.migration.completed", &summary.message(), Some(fields));
    }

    Ok(summary)
}

async fn provision_collection(
    ctx: &RequestContext,
    deps: &MigrationDeps,
    definition: &CollectionDefinition,
    existence_retry: RetryPolicy,
    errors: &mut Vec<MigrationError>,
) -> Result<CollectionState> {
    let id = &definition.id;

    if let Err(error) = definition.validate() {
        let error = ErrorEnvelope::from(error);
        record(deps, errors, id, MigrationStage::Validate, None, &error);
        return Ok(CollectionState::Failed);
    }

    match collection_exists(ctx, deps, id, existence_retry).await {
        Ok(true) => {
            if let Some(logger) = deps.logger.as_ref() {
                logger.warn(
                    "dernek.migration.skipped",
                    &format!("Collection {id} already exists, skipping"),
                    Some(collection_fields(id)),
                );
            }
            return Ok(CollectionState::Skipped);
        },
        Ok(false) => {},
        Err(error) if error.is_cancelled() => return Err(error),
        Err(error) => {
            record(deps, errors, id, MigrationStage::ExistenceCheck, None, &error);
            return Ok(CollectionState::Failed);
        },
    }

    let mut state = CollectionState::CreatingCollection;
    let step = async {
        deps.schema
            .create_collection(
                ctx,
                CollectionSpec {
                    id: id.clone(),
                    name: definition.name.clone(),
                    permissions: definition.permissions.scopes(),
                },
            )
            .await
            .map_err(|error| (None, error))?;

        state = CollectionState::CreatingAttributes;
        for attribute in &definition.attributes {
            ctx.ensure_not_cancelled("migration.create_attribute")
                .map_err(|error| (None, error))?;
            deps.schema
                .create_attribute(ctx, id.clone(), attribute_request(attribute))
                .await
                .map_err(|error| (Some(attribute.key.clone()), error))?;
        }

        state = CollectionState::CreatingIndexes;
        for index in &definition.indexes {
            ctx.ensure_not_cancelled("migration.create_index")
                .map_err(|error| (None, error))?;
            deps.schema
                .create_index(ctx, id.clone(), index_request(index))
                .await
                .map_err(|error| (Some(index.key.clone()), error))?;
        }
        Ok::<(), (Option<Box<str>>, ErrorEnvelope)>(())
    }
    .await;

    match step {
        Ok(()) => {
            log_info(
                deps,
                "dernek.migration.created",
                &format!("Collection {id} created"),
                collection_fields(id),
            );
            Ok(CollectionState::Done)
        },
        Err((_, error)) if error.is_cancelled() => Err(error),
        Err((key, error)) => {
            record(deps, errors, id, state.failing_stage(), key, &error);
            Ok(CollectionState::Failed)
        },
    }
}

async fn collection_exists(
    ctx: &RequestContext,
    deps: &MigrationDeps,
    id: &CollectionId,
    policy: RetryPolicy,
) -> Result<bool> {
    let mut fetch = || deps.schema.get_collection(ctx, id.clone());
    let result = retry_async_with_observer(
        ctx,
        policy,
        "migration.get_collection",
        &mut fetch,
        |attempt, error| {
            if let Some(logger) = deps.logger.as_ref() {
                let mut fields = collection_fields(id);
                fields.insert("attempt".into(), Value::from(attempt));
                fields.insert("code".into(), Value::from(error.code.to_string()));
                logger.warn(
                    "dernek.migration.retry",
                    "Existence check failed, retrying",
                    Some(fields),
                );
            }
        },
    )
    .await;

    match result {
        Ok(_) => Ok(true),
        Err(error) if error.is_not_found() => Ok(false),
        Err(error) => Err(error),
    }
}

/// Attribute creation request for a declared attribute.
///
/// Defaults are only forwarded for optional attributes. Array attributes are
/// stored as a JSON string.
pub fn attribute_request(attribute: &AttributeDefinition) -> AttributeRequest {
    let key = attribute.key.clone();
    let required = attribute.required;
    let default = if required {
        None
    } else {
        attribute.default.as_ref()
    };
    let bounds = attribute.validation.unwrap_or_default();

    match attribute.kind {
        AttributeType::String => AttributeRequest::String {
            key,
            size: attribute.size.unwrap_or(DEFAULT_STRING_SIZE),
            required,
            default: default.and_then(Value::as_str).map(Box::from),
        },
        AttributeType::Integer => AttributeRequest::Integer {
            key,
            required,
            min: bounds.min.map(whole),
            max: bounds.max.map(whole),
            default: default.and_then(Value::as_i64),
        },
        AttributeType::Float => AttributeRequest::Float {
            key,
            required,
            min: bounds.min,
            max: bounds.max,
            default: default.and_then(Value::as_f64),
        },
        AttributeType::Boolean => AttributeRequest::Boolean {
            key,
            required,
            default: default.and_then(Value::as_bool),
        },
        AttributeType::Datetime => AttributeRequest::Datetime {
            key,
            required,
            default: default.and_then(Value::as_str).map(Box::from),
        },
        AttributeType::Enum => AttributeRequest::Enum {
            key,
            elements: attribute.enum_options.clone(),
            required,
            default: default.and_then(Value::as_str).map(Box::from),
        },
        AttributeType::Array => AttributeRequest::String {
            key,
            size: ARRAY_STRING_SIZE,
            required,
            default: (!required).then(|| array_default(default)),
        },
    }
}

/// Index creation request for a declared index.
pub fn index_request(index: &IndexDefinition) -> IndexRequest {
    IndexRequest {
        key: index.key.clone(),
        kind: index.kind,
        attributes: index.attributes.clone(),
    }
}

fn array_default(default: Option<&Value>) -> Box<str> {
    match default {
        Some(Value::String(text)) => text.as_str().into(),
        Some(value @ Value::Array(_)) => value.to_string().into(),
        _ => EMPTY_ARRAY_JSON.into(),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "catalog bounds are small whole numbers"
)]
fn whole(value: f64) -> i64 {
    value as i64
}

fn record(
    deps: &MigrationDeps,
    errors: &mut Vec<MigrationError>,
    collection: &CollectionId,
    stage: MigrationStage,
    key: Option<Box<str>>,
    error: &ErrorEnvelope,
) {
    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = collection_fields(collection);
        fields.insert("stage".into(), serde_json::to_value(stage).unwrap_or(Value::Null));
        if let Some(key) = key.as_deref() {
            fields.insert("key".into(), Value::from(key));
        }
        fields.insert("code".into(), Value::from(error.code.to_string()));
        logger.error("dernek.migration.failed", &error.message, Some(fields));
    }
    errors.push(MigrationError {
        collection: collection.clone(),
        stage,
        key,
        message: error.message.clone(),
    });
}

fn log_info(deps: &MigrationDeps, event: &str, message: &str, fields: LogFields) {
    if let Some(logger) = deps.logger.as_ref() {
        logger.info(event, message, Some(fields));
    }
}

fn collection_fields(id: &CollectionId) -> LogFields {
    log_fields([("collection", Value::from(id.as_str()))])
}

pub(crate) fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
