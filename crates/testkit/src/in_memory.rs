//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the application layer
//! - Failure injection without a remote backend
//! - Local experimentation without external dependencies

use crate::errors::attribute_rejected_error;
use dernek_ports::{
    AttributeRequest, BoxFuture, CollectionId, CollectionSpec, ConnectivityProbePort,
    HealthCheckResponse, HealthProbePort, IndexRequest, LogEvent, LogFields, LogLevel, LoggerPort,
    ProbeResponse, ProbeTarget, RemoteCollection, SchemaAdminPort,
};
use dernek_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that records every event; children share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        lock(&self.events).clone()
    }

    /// Recorded events with the given name.
    pub fn events_named(&self, name: &str) -> Vec<LogEvent> {
        lock(&self.events)
            .iter()
            .filter(|event| &*event.event == name)
            .cloned()
            .collect()
    }

    /// Recorded events at the given level.
    pub fn events_at(&self, level: LogLevel) -> Vec<LogEvent> {
        lock(&self.events)
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        lock(&self.events).push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Per-operation call counters of [`InMemorySchemaAdmin`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaCalls {
    /// `get_collection` calls.
    pub get_collection: usize,
    /// `create_collection` calls.
    pub create_collection: usize,
    /// `create_attribute` calls.
    pub create_attribute: usize,
    /// `create_index` calls.
    pub create_index: usize,
    /// `delete_collection` calls.
    pub delete_collection: usize,
}

impl SchemaCalls {
    /// Calls that create or delete something.
    #[must_use]
    pub const fn mutations(&self) -> usize {
        self.create_collection + self.create_attribute + self.create_index + self.delete_collection
    }
}

#[derive(Debug, Clone, Default)]
struct StoredCollection {
    name: Box<str>,
    attributes: Vec<AttributeRequest>,
    indexes: Vec<IndexRequest>,
}

#[derive(Debug, Default)]
struct SchemaState {
    collections: BTreeMap<CollectionId, StoredCollection>,
    calls: SchemaCalls,
    failing_attributes: BTreeSet<(Box<str>, Box<str>)>,
    failing_creates: BTreeSet<Box<str>>,
    get_failures: HashMap<Box<str>, VecDeque<ErrorEnvelope>>,
}

/// In-memory schema administration with call counters and failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaAdmin {
    state: Arc<Mutex<SchemaState>>,
}

impl InMemorySchemaAdmin {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create collections (without attributes).
    #[must_use]
    pub fn with_existing<I>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = CollectionId>,
    {
        {
            let mut state = lock(&self.state);
            for id in ids {
                let name = id.as_str().into();
                state.collections.insert(
                    id,
                    StoredCollection {
                        name,
                        ..StoredCollection::default()
                    },
                );
            }
        }
        self
    }

    /// Make `create_attribute` fail for one attribute of one collection.
    #[must_use]
    pub fn fail_attribute(self, collection: &str, key: &str) -> Self {
        lock(&self.state)
            .failing_attributes
            .insert((collection.into(), key.into()));
        self
    }

    /// Make `create_collection` fail for one collection.
    #[must_use]
    pub fn fail_create(self, collection: &str) -> Self {
        lock(&self.state).failing_creates.insert(collection.into());
        self
    }

    /// Queue errors returned by successive `get_collection` calls for one
    /// collection before normal behaviour resumes.
    #[must_use]
    pub fn fail_get<I>(self, collection: &str, errors: I) -> Self
    where
        I: IntoIterator<Item = ErrorEnvelope>,
    {
        lock(&self.state)
            .get_failures
            .entry(collection.into())
            .or_default()
            .extend(errors);
        self
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> SchemaCalls {
        lock(&self.state).calls
    }

    /// Reset call counters, keeping collections and injected failures.
    pub fn reset_calls(&self) {
        lock(&self.state).calls = SchemaCalls::default();
    }

    /// Ids of existing collections, sorted.
    pub fn collection_ids(&self) -> Vec<CollectionId> {
        lock(&self.state).collections.keys().cloned().collect()
    }

    /// Attributes created on a collection, in creation order.
    pub fn attributes(&self, collection: &str) -> Vec<AttributeRequest> {
        lock(&self.state)
            .collections
            .iter()
            .find(|(id, _)| id.as_str() == collection)
            .map(|(_, stored)| stored.attributes.clone())
            .unwrap_or_default()
    }

    /// Indexes created on a collection, in creation order.
    pub fn indexes(&self, collection: &str) -> Vec<IndexRequest> {
        lock(&self.state)
            .collections
            .iter()
            .find(|(id, _)| id.as_str() == collection)
            .map(|(_, stored)| stored.indexes.clone())
            .unwrap_or_default()
    }
}

fn missing_collection(id: &CollectionId) -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::not_found(), "Collection not found")
        .with_http_status(404)
        .with_metadata("collection", id.as_str())
}

impl SchemaAdminPort for InMemorySchemaAdmin {
    fn get_collection(
        &self,
        ctx: &RequestContext,
        id: CollectionId,
    ) -> BoxFuture<'_, Result<RemoteCollection>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_schema.get_collection")?;
            let mut state = lock(&self.state);
            state.calls.get_collection += 1;
            if let Some(error) = state
                .get_failures
                .get_mut(id.as_str())
                .and_then(VecDeque::pop_front)
            {
                return Err(error);
            }
            state
                .collections
                .get(&id)
                .map(|stored| RemoteCollection {
                    id: id.clone(),
                    name: stored.name.clone(),
                })
                .ok_or_else(|| missing_collection(&id))
        })
    }

    fn create_collection(
        &self,
        ctx: &RequestContext,
        spec: CollectionSpec,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_schema.create_collection")?;
            let mut state = lock(&self.state);
            state.calls.create_collection += 1;
            if state.failing_creates.contains(spec.id.as_str()) {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::invalid_input(),
                    format!("Collection \"{}\" rejected by backend", spec.id),
                )
                .with_http_status(400));
            }
            if state.collections.contains_key(&spec.id) {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::conflict(),
                    "Collection already exists",
                )
                .with_http_status(409));
            }
            state.collections.insert(
                spec.id,
                StoredCollection {
                    name: spec.name,
                    ..StoredCollection::default()
                },
            );
            Ok(())
        })
    }

    fn create_attribute(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        attribute: AttributeRequest,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_schema.create_attribute")?;
            let mut state = lock(&self.state);
            state.calls.create_attribute += 1;
            let failing: (Box<str>, Box<str>) =
                (collection.as_str().into(), attribute.key().into());
            if state.failing_attributes.contains(&failing) {
                return Err(attribute_rejected_error(attribute.key()));
            }
            let stored = state
                .collections
                .get_mut(&collection)
                .ok_or_else(|| missing_collection(&collection))?;
            stored.attributes.push(attribute);
            Ok(())
        })
    }

    fn create_index(
        &self,
        ctx: &RequestContext,
        collection: CollectionId,
        index: IndexRequest,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_schema.create_index")?;
            let mut state = lock(&self.state);
            state.calls.create_index += 1;
            let stored = state
                .collections
                .get_mut(&collection)
                .ok_or_else(|| missing_collection(&collection))?;
            stored.indexes.push(index);
            Ok(())
        })
    }

    fn delete_collection(
        &self,
        ctx: &RequestContext,
        id: CollectionId,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_schema.delete_collection")?;
            let mut state = lock(&self.state);
            state.calls.delete_collection += 1;
            state
                .collections
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| missing_collection(&id))
        })
    }
}

/// Connectivity probe answering from scripted responses.
///
/// Each target replays its queued answers in order and then keeps repeating
/// the last one. Unscripted targets answer `200` with no body.
#[derive(Debug, Clone)]
pub struct ScriptedConnectivityProbe {
    endpoint: Box<str>,
    scripts: Arc<Mutex<HashMap<ProbeTarget, VecDeque<Result<ProbeResponse>>>>>,
    calls: Arc<Mutex<HashMap<ProbeTarget, usize>>>,
}

impl ScriptedConnectivityProbe {
    /// Probe reporting the given endpoint.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.into(),
            scripts: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Queue a status with an optional JSON body.
    #[must_use]
    pub fn respond(self, target: ProbeTarget, status: u16, body: Option<Value>) -> Self {
        self.push(target, Ok(ProbeResponse { status, body }))
    }

    /// Queue a transport failure.
    #[must_use]
    pub fn fail(self, target: ProbeTarget, error: ErrorEnvelope) -> Self {
        self.push(target, Err(error))
    }

    fn push(self, target: ProbeTarget, answer: Result<ProbeResponse>) -> Self {
        lock(&self.scripts)
            .entry(target)
            .or_default()
            .push_back(answer);
        self
    }

    /// Number of probes issued against a target.
    pub fn calls(&self, target: ProbeTarget) -> usize {
        lock(&self.calls).get(&target).copied().unwrap_or(0)
    }
}

impl ConnectivityProbePort for ScriptedConnectivityProbe {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn probe(
        &self,
        ctx: &RequestContext,
        target: ProbeTarget,
    ) -> BoxFuture<'_, Result<ProbeResponse>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("scripted_probe.probe")?;
            *lock(&self.calls).entry(target).or_insert(0) += 1;
            let mut scripts = lock(&self.scripts);
            let Some(queue) = scripts.get_mut(&target) else {
                return Ok(ProbeResponse {
                    status: 200,
                    body: None,
                });
            };
            if queue.len() > 1 {
                if let Some(answer) = queue.pop_front() {
                    return answer;
                }
            }
            queue.front().cloned().unwrap_or(Ok(ProbeResponse {
                status: 200,
                body: None,
            }))
        })
    }
}

/// Health probe returning a fixed answer.
#[derive(Debug, Clone)]
pub struct StaticHealthProbe {
    url: Box<str>,
    answer: Result<HealthCheckResponse>,
}

impl StaticHealthProbe {
    /// Probe answering `200` with `healthy: true`.
    #[must_use]
    pub fn healthy(url: &str) -> Self {
        Self {
            url: url.into(),
            answer: Ok(HealthCheckResponse {
                status: 200,
                healthy: true,
                recommendations: Vec::new(),
            }),
        }
    }

    /// Probe answering with an unhealthy document.
    #[must_use]
    pub fn unhealthy(url: &str, status: u16, recommendations: Vec<String>) -> Self {
        Self {
            url: url.into(),
            answer: Ok(HealthCheckResponse {
                status,
                healthy: false,
                recommendations,
            }),
        }
    }

    /// Probe failing at the transport level.
    #[must_use]
    pub fn failing(url: &str, error: ErrorEnvelope) -> Self {
        Self {
            url: url.into(),
            answer: Err(error),
        }
    }
}

impl HealthProbePort for StaticHealthProbe {
    fn url(&self) -> &str {
        &self.url
    }

    fn check(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<HealthCheckResponse>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("static_health.check")?;
            self.answer.clone()
        })
    }
}
