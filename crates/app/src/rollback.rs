//! Drop the catalog's collections.

use crate::migration::{MigrationDeps, MigrationError, MigrationStage, duration_ms};
use dernek_domain::{CollectionDefinition, CollectionId, rollback_order};
use dernek_ports::log_fields;
use dernek_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// Input of [`rollback`].
#[derive(Debug, Clone)]
pub struct RollbackInput {
    /// Provisioned catalog; collections are dropped in reverse order.
    pub catalog: Vec<CollectionDefinition>,
    /// Explicit confirmation from the operator.
    pub confirmed: bool,
}

/// Result of a rollback run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackSummary {
    /// Collections deleted by this run.
    pub deleted: Vec<CollectionId>,
    /// Collections that did not exist.
    pub absent: Vec<CollectionId>,
    /// Failed deletions.
    pub errors: Vec<MigrationError>,
    /// Wall-clock duration.
    pub duration_ms: u64,
}

impl RollbackSummary {
    /// No failures recorded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Delete every catalog collection, dependents first.
///
/// Refuses to run without confirmation. Missing collections are skipped and
/// a failed deletion does not stop the others.
#[tracing::instrument(name = "migration.rollback", skip_all)]
pub async fn rollback(
    ctx: &RequestContext,
    deps: &MigrationDeps,
    input: RollbackInput,
) -> Result<RollbackSummary> {
    if !input.confirmed {
        return Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "Rollback requires explicit confirmation",
        ));
    }

    let started_at = Instant::now();
    let mut summary = RollbackSummary {
        deleted: Vec::new(),
        absent: Vec::new(),
        errors: Vec::new(),
        duration_ms: 0,
    };

    for id in rollback_order(&input.catalog) {
        ctx.ensure_not_cancelled("rollback.collection")?;
        match deps.schema.delete_collection(ctx, id.clone()).await {
            Ok(()) => {
                if let Some(logger) = deps.logger.as_ref() {
                    logger.info(
                        "dernek.rollback.deleted",
                        &format!("Collection {id} deleted"),
                        Some(log_fields([("collection", Value::from(id.as_str()))])),
                    );
                }
                summary.deleted.push(id);
            },
            Err(error) if error.is_not_found() => summary.absent.push(id),
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                if let Some(logger) = deps.logger.as_ref() {
                    logger.error(
                        "dernek.rollback.failed",
                        &error.message,
                        Some(log_fields([("collection", Value::from(id.as_str()))])),
                    );
                }
                summary.errors.push(MigrationError {
                    collection: id,
                    stage: MigrationStage::DeleteCollection,
                    key: None,
                    message: error.message,
                });
            },
        }
    }

    summary.duration_ms = duration_ms(started_at);
    Ok(summary)
}
