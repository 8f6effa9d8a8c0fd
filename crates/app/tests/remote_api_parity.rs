//! The unified API over the REST adapters answers in the same envelope
//! shapes and user messages as the mock backend.

use dernek_adapters::appwrite::{AppwriteClientConfig, AppwriteDocuments, AppwriteStorage};
use dernek_adapters::mock::MockBackend;
use dernek_app::api::{
    MESSAGE_NOT_FOUND, MESSAGE_RATE_LIMITED, MESSAGE_SERVER_ERROR, MESSAGE_UNAUTHORIZED,
    user_message,
};
use dernek_app::{ApiResponse, BackendApi, ListParams};
use dernek_domain::ProviderMode;
use dernek_ports::{DocumentData, FileUpload};
use dernek_shared::{ErrorEnvelope, RequestContext, Result, RetryPolicy, SecretString};
use dernek_testkit::errors::{
    not_found_error, rate_limited_error, unauthorized_error, unavailable_error,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "dernek-project";
const DOCUMENTS: &str = "/v1/databases/dernek_db/collections/beneficiaries/documents";
const FILES: &str = "/v1/storage/buckets/documents/files";

fn remote_api(server: &MockServer) -> Result<BackendApi> {
    let config = AppwriteClientConfig {
        endpoint: format!("{}/v1", server.uri()).into(),
        project_id: PROJECT.into(),
        database_id: "dernek_db".into(),
        api_key: Some(SecretString::new("parity-key")),
        timeout_ms: 5_000,
        retry: RetryPolicy::NONE,
    };
    Ok(BackendApi::new(
        ProviderMode::Appwrite,
        Arc::new(AppwriteDocuments::new(&config)?),
        Arc::new(AppwriteStorage::new(&config)?),
    ))
}

fn mock_api() -> Result<BackendApi> {
    let mock = Arc::new(MockBackend::seeded()?);
    Ok(BackendApi::new(ProviderMode::Mock, mock.clone(), mock))
}

fn keys<T: Serialize>(response: &ApiResponse<T>) -> BTreeSet<String> {
    match serde_json::to_value(response) {
        Ok(Value::Object(fields)) => fields.keys().cloned().collect(),
        _ => BTreeSet::new(),
    }
}

fn data(fields: Value) -> DocumentData {
    match fields {
        Value::Object(fields) => fields,
        _ => DocumentData::new(),
    }
}

fn not_found_body() -> Value {
    json!({
        "message": "Document with the requested ID could not be found.",
        "code": 404,
        "type": "document_not_found"
    })
}

async fn mount_documents(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DOCUMENTS))
        .and(header("x-appwrite-project", PROJECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 2,
            "documents": [
                {"$id": "b1", "name": "Ayşe Yılmaz"},
                {"$id": "b2", "name": "Mehmet Demir"}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCUMENTS}/b1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"$id": "b1", "name": "Ayşe Yılmaz"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{DOCUMENTS}/b404")))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(DOCUMENTS))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"$id": "b3", "name": "Zeynep Kaya"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn list_get_and_create_match_mock_shapes() -> Result<()> {
    let server = MockServer::start().await;
    mount_documents(&server).await;
    let ctx = RequestContext::new_request();
    let remote = remote_api(&server)?;
    let mock = mock_api()?;

    let remote_list = remote.beneficiaries().list(&ctx, ListParams::default()).await?;
    let mock_list = mock.beneficiaries().list(&ctx, ListParams::default()).await?;
    assert_eq!(keys(&remote_list), keys(&mock_list));
    assert_eq!(remote_list.total, Some(2));
    assert_eq!(remote_list.data.map(|documents| documents.len()), Some(2));

    let remote_found = remote.beneficiaries().get(&ctx, "b1").await?;
    let mock_found = mock.beneficiaries().get(&ctx, "beneficiary-001").await?;
    assert_eq!(keys(&remote_found), keys(&mock_found));
    assert!(remote_found.is_ok());

    let remote_missing = remote.beneficiaries().get(&ctx, "b404").await?;
    let mock_missing = mock.beneficiaries().get(&ctx, "beneficiary-999").await?;
    assert_eq!(keys(&remote_missing), keys(&mock_missing));
    assert_eq!(remote_missing.error, mock_missing.error);
    assert_eq!(remote_missing.error.as_deref(), Some(MESSAGE_NOT_FOUND));

    let fields = json!({"name": "Zeynep Kaya"});
    let remote_created = remote.beneficiaries().create(&ctx, data(fields.clone())).await?;
    let mock_created = mock.beneficiaries().create(&ctx, data(fields)).await?;
    assert_eq!(keys(&remote_created), keys(&mock_created));
    assert_eq!(
        remote_created
            .data
            .as_ref()
            .and_then(|document| document.get("name")),
        mock_created
            .data
            .as_ref()
            .and_then(|document| document.get("name"))
    );
    Ok(())
}

#[tokio::test]
async fn remote_failures_use_the_shared_user_messages() -> Result<()> {
    let cases: [(u16, ErrorEnvelope, &str); 4] = [
        (401, unauthorized_error(), MESSAGE_UNAUTHORIZED),
        (404, not_found_error(), MESSAGE_NOT_FOUND),
        (429, rate_limited_error(), MESSAGE_RATE_LIMITED),
        (500, unavailable_error(), MESSAGE_SERVER_ERROR),
    ];
    let ctx = RequestContext::new_request();

    for (status, equivalent, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DOCUMENTS))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "message": format!("backend answered {status}"),
                "code": status,
                "type": "general_error"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = remote_api(&server)?
            .beneficiaries()
            .list(&ctx, ListParams::default())
            .await?;

        assert_eq!(response.error.as_deref(), Some(expected), "status {status}");
        assert_eq!(response.error, Some(user_message(&equivalent)), "status {status}");
        assert!(response.data.is_none());
        assert_eq!(response.total, None);
        assert_eq!(
            keys(&response),
            BTreeSet::from(["data".to_owned(), "error".to_owned()])
        );
    }
    Ok(())
}

#[tokio::test]
async fn storage_calls_match_mock_shapes() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FILES))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "f1",
            "bucketId": "documents",
            "name": "makbuz.pdf",
            "mimeType": "application/pdf",
            "sizeOriginal": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{FILES}/f404")))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(&server)
        .await;
    let ctx = RequestContext::new_request();
    let remote = remote_api(&server)?;
    let mock = mock_api()?;
    let upload = || FileUpload {
        name: "makbuz.pdf".into(),
        content_type: Some("application/pdf".into()),
        bytes: b"pdf".to_vec(),
    };

    let remote_uploaded = remote.storage().upload_file(&ctx, "documents", upload()).await?;
    let mock_uploaded = mock.storage().upload_file(&ctx, "documents", upload()).await?;
    assert_eq!(keys(&remote_uploaded), keys(&mock_uploaded));
    assert_eq!(
        remote_uploaded.data.map(|file| file.name),
        mock_uploaded.data.map(|file| file.name)
    );

    let remote_missing = remote.storage().get_file(&ctx, "documents", "f404").await?;
    let mock_missing = mock.storage().get_file(&ctx, "documents", "f404").await?;
    assert_eq!(keys(&remote_missing), keys(&mock_missing));
    assert_eq!(remote_missing.error, mock_missing.error);

    let remote_url = remote.storage().file_download_url("documents", "f1")?;
    let mock_url = mock.storage().file_download_url("documents", "f1")?;
    assert_eq!(keys(&remote_url), keys(&mock_url));
    assert!(
        remote_url
            .data
            .is_some_and(|url| url.contains("/storage/buckets/documents/files/f1/download"))
    );
    Ok(())
}
