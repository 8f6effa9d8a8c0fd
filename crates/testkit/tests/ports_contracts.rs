//! Contract-style tests for port traits using in-memory adapters.

use dernek_domain::{IndexKind, PermissionScope};
use dernek_ports::{
    AttributeRequest, CollectionId, CollectionSpec, ConnectivityProbePort, HealthProbePort,
    IndexRequest, LoggerPort, ProbeTarget, SchemaAdminPort,
};
use dernek_shared::{RequestContext, Result};
use dernek_testkit::errors::timeout_error;
use dernek_testkit::in_memory::{
    InMemorySchemaAdmin, NoopLogger, RecordingLogger, ScriptedConnectivityProbe,
    StaticHealthProbe,
};
use std::sync::Arc;

#[tokio::test]
async fn schema_admin_contract_smoke() -> Result<()> {
    let ctx = RequestContext::new_request();
    let admin = InMemorySchemaAdmin::new();
    let port: Arc<dyn SchemaAdminPort> = Arc::new(admin.clone());
    let tasks = CollectionId::parse("tasks")?;

    let missing = port.get_collection(&ctx, tasks.clone()).await;
    assert!(missing.is_err_and(|error| error.is_not_found()));

    port.create_collection(
        &ctx,
        CollectionSpec {
            id: tasks.clone(),
            name: "Görevler".into(),
            permissions: vec![PermissionScope::Read],
        },
    )
    .await?;
    port.create_attribute(
        &ctx,
        tasks.clone(),
        AttributeRequest::Boolean {
            key: "is_read".into(),
            required: false,
            default: Some(false),
        },
    )
    .await?;
    port.create_index(
        &ctx,
        tasks.clone(),
        IndexRequest {
            key: "status_idx".into(),
            kind: IndexKind::Key,
            attributes: vec!["status".into()],
        },
    )
    .await?;

    let remote = port.get_collection(&ctx, tasks.clone()).await?;
    assert_eq!(remote.name.as_ref(), "Görevler");
    assert_eq!(admin.attributes("tasks").len(), 1);
    assert_eq!(admin.indexes("tasks").len(), 1);

    let duplicate = port
        .create_collection(
            &ctx,
            CollectionSpec {
                id: tasks.clone(),
                name: "Görevler".into(),
                permissions: Vec::new(),
            },
        )
        .await;
    assert_eq!(duplicate.err().and_then(|error| error.http_status()), Some(409));

    port.delete_collection(&ctx, tasks).await?;
    assert!(admin.collection_ids().is_empty());
    assert_eq!(admin.calls().mutations(), 5);
    Ok(())
}

#[tokio::test]
async fn cancelled_context_short_circuits_schema_calls() -> Result<()> {
    let ctx = RequestContext::new_request();
    ctx.cancel();
    let admin = InMemorySchemaAdmin::new();

    let result = admin
        .get_collection(&ctx, CollectionId::parse("users")?)
        .await;

    assert!(result.is_err_and(|error| error.is_cancelled()));
    assert_eq!(admin.calls().get_collection, 0);
    Ok(())
}

#[tokio::test]
async fn probe_contract_smoke() -> Result<()> {
    let ctx = RequestContext::new_request();
    let probe: Arc<dyn ConnectivityProbePort> = Arc::new(
        ScriptedConnectivityProbe::new("https://example.test/v1")
            .respond(ProbeTarget::Account, 401, None)
            .fail(ProbeTarget::StorageBuckets, timeout_error()),
    );

    assert_eq!(probe.endpoint(), "https://example.test/v1");
    assert_eq!(probe.probe(&ctx, ProbeTarget::Account).await?.status, 401);
    assert!(probe.probe(&ctx, ProbeTarget::StorageBuckets).await.is_err());

    let health: Arc<dyn HealthProbePort> = Arc::new(StaticHealthProbe::unhealthy(
        "http://localhost:3000/api/health",
        503,
        vec!["Check the database".to_owned()],
    ));
    let response = health.check(&ctx).await?;
    assert!(!response.passed());
    assert_eq!(response.recommendations.len(), 1);
    Ok(())
}

#[test]
fn logger_contract_smoke() {
    let logger: Arc<dyn LoggerPort> = Arc::new(NoopLogger);
    logger.info("dernek.test.start", "start", None);
    let child = logger.child(Default::default());
    child.warn("dernek.test.warn", "warn", None);

    let recorder = RecordingLogger::new();
    recorder.error("dernek.test.error", "boom", None);
    assert_eq!(recorder.events().len(), 1);
}
