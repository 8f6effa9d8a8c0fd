#![allow(missing_docs)]
#![cfg(feature = "appwrite")]

use dernek_adapters::appwrite::{
    AppwriteClientConfig, AppwriteConnectivityProbe, AppwriteDocuments, AppwriteSchemaAdmin,
    AppwriteStorage,
};
use dernek_ports::{
    AttributeRequest, BucketId, CollectionId, CollectionSpec, ConnectivityProbePort, DocumentId,
    DocumentQuery, DocumentsPort, FileStoragePort, FileUpload, OrderBy, PermissionScope,
    ProbeTarget, SchemaAdminPort, SearchClause, SortDirection,
};
use dernek_shared::{ErrorCode, RequestContext, Result, RetryPolicy, SecretString};
use serde_json::{Map, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "p1";
const KEY: &str = "standard_test_key"; // pragma: allowlist secret

fn config(server: &MockServer, retry: RetryPolicy) -> AppwriteClientConfig {
    AppwriteClientConfig {
        endpoint: format!("{}/v1", server.uri()).into(),
        project_id: PROJECT.into(),
        database_id: "dernek_db".into(),
        api_key: Some(SecretString::new(KEY)),
        timeout_ms: 5_000,
        retry,
    }
}

fn collection(name: &str) -> Result<CollectionId> {
    Ok(CollectionId::parse(name)?)
}

#[tokio::test]
async fn missing_collection_is_not_found() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/databases/dernek_db/collections/users"))
        .and(header("x-appwrite-project", PROJECT))
        .and(header("x-appwrite-key", KEY))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Collection with the requested ID could not be found.",
            "code": 404,
            "type": "collection_not_found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let admin = AppwriteSchemaAdmin::new(&config(&server, RetryPolicy::NONE))?;
    let error = admin
        .get_collection(&RequestContext::new_request(), collection("users")?)
        .await
        .err();

    assert!(error.as_ref().is_some_and(|error| error.is_not_found()));
    assert_eq!(error.and_then(|error| error.http_status()), Some(404));
    Ok(())
}

#[tokio::test]
async fn create_collection_and_attribute_send_backend_payloads() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/dernek_db/collections"))
        .and(body_json(json!({
            "collectionId": "donations",
            "name": "Bağışlar",
            "permissions": ["read(\"users\")", "create(\"users\")"],
            "documentSecurity": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "$id": "donations" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(
            "/v1/databases/dernek_db/collections/donations/attributes/float",
        ))
        .and(body_json(json!({
            "key": "amount",
            "required": true,
            "min": 0.0,
            "max": null,
            "default": null
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "key": "amount" })))
        .expect(1)
        .mount(&server)
        .await;

    let admin = AppwriteSchemaAdmin::new(&config(&server, RetryPolicy::NONE))?;
    let ctx = RequestContext::new_request();
    admin
        .create_collection(
            &ctx,
            CollectionSpec {
                id: collection("donations")?,
                name: "Bağışlar".into(),
                permissions: vec![PermissionScope::Read, PermissionScope::Create],
            },
        )
        .await?;
    admin
        .create_attribute(
            &ctx,
            collection("donations")?,
            AttributeRequest::Float {
                key: "amount".into(),
                required: true,
                min: Some(0.0),
                max: None,
                default: None,
            },
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn list_documents_encodes_queries() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/databases/dernek_db/collections/beneficiaries/documents"))
        .and(query_param("queries[]", r#"{"method":"limit","values":[10]}"#))
        .and(query_param("queries[]", r#"{"method":"offset","values":[10]}"#))
        .and(query_param(
            "queries[]",
            r#"{"attribute":"name","method":"search","values":["ahmet"]}"#,
        ))
        .and(query_param(
            "queries[]",
            r#"{"attribute":"$createdAt","method":"orderDesc"}"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 11,
            "documents": [ { "$id": "b11", "name": "Ahmet Yılmaz" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let documents = AppwriteDocuments::new(&config(&server, RetryPolicy::NONE))?;
    let page = documents
        .list_documents(
            &RequestContext::new_request(),
            collection("beneficiaries")?,
            DocumentQuery {
                limit: 10,
                offset: 10,
                search: Some(SearchClause {
                    field: "name".into(),
                    term: "ahmet".into(),
                }),
                order: Some(OrderBy {
                    field: "$createdAt".into(),
                    direction: SortDirection::Desc,
                }),
                filters: Vec::new(),
            },
        )
        .await?;

    assert_eq!(page.total, 11);
    assert_eq!(page.documents[0].id(), Some("b11"));
    Ok(())
}

#[tokio::test]
async fn server_errors_are_retried_until_success() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/databases/dernek_db/collections/tasks/documents/t1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/databases/dernek_db/collections/tasks/documents/t1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "$id": "t1", "title": "Görev" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let retry = RetryPolicy::STANDARD.with_base_delay_ms(1);
    let documents = AppwriteDocuments::new(&config(&server, retry))?;
    let document = documents
        .get_document(
            &RequestContext::new_request(),
            collection("tasks")?,
            DocumentId::parse("t1")?,
        )
        .await?;

    assert_eq!(document.get("title"), Some(&json!("Görev")));
    Ok(())
}

#[tokio::test]
async fn unauthorized_is_not_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/databases/dernek_db/collections/tasks/documents/t1"))
        .and(body_json(json!({ "data": { "status": "completed" } })))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "The current user is not authorized to perform the requested action.",
            "code": 401,
            "type": "user_unauthorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let retry = RetryPolicy::STANDARD.with_base_delay_ms(1);
    let documents = AppwriteDocuments::new(&config(&server, retry))?;
    let mut data = Map::new();
    data.insert("status".to_owned(), json!("completed"));
    let error = documents
        .update_document(
            &RequestContext::new_request(),
            collection("tasks")?,
            DocumentId::parse("t1")?,
            data,
        )
        .await
        .err();

    assert_eq!(error.map(|error| error.code), Some(ErrorCode::unauthorized()));
    Ok(())
}

#[tokio::test]
async fn create_document_requests_generated_id() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/dernek_db/collections/messages/documents"))
        .and(body_json(json!({
            "documentId": "unique()",
            "data": { "subject": "Merhaba" }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "$id": "generated", "subject": "Merhaba" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let documents = AppwriteDocuments::new(&config(&server, RetryPolicy::NONE))?;
    let mut data = Map::new();
    data.insert("subject".to_owned(), json!("Merhaba"));
    let created = documents
        .create_document(&RequestContext::new_request(), collection("messages")?, data)
        .await?;

    assert_eq!(created.id(), Some("generated"));
    Ok(())
}

#[tokio::test]
async fn upload_file_posts_multipart() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/storage/buckets/receipts/files"))
        .and(header("x-appwrite-project", PROJECT))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "file_1",
            "bucketId": "receipts",
            "name": "makbuz.pdf",
            "mimeType": "application/pdf",
            "sizeOriginal": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = AppwriteStorage::new(&config(&server, RetryPolicy::NONE))?;
    let stored = storage
        .upload_file(
            &RequestContext::new_request(),
            BucketId::parse("receipts")?,
            FileUpload {
                name: "makbuz.pdf".into(),
                content_type: Some("application/pdf".into()),
                bytes: b"%PDF".to_vec(),
            },
        )
        .await?;

    assert_eq!(stored.id.as_ref(), "file_1");
    assert_eq!(stored.size_original, 4);

    let requests = server.received_requests().await.unwrap_or_default();
    let content_type = requests
        .first()
        .and_then(|request| request.headers.get("content-type"))
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("multipart/form-data"));
    Ok(())
}

#[tokio::test]
async fn account_probe_reports_status_without_key() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("x-appwrite-project", PROJECT))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "User (role: guests) missing scope (account)",
            "code": 401
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/databases"))
        .and(header("x-appwrite-key", KEY))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "total": 1, "databases": [] })),
        )
        .mount(&server)
        .await;

    let probe = AppwriteConnectivityProbe::new(&config(&server, RetryPolicy::NONE))?;
    let ctx = RequestContext::new_request();
    let account = probe.probe(&ctx, ProbeTarget::Account).await?;
    let databases = probe.probe(&ctx, ProbeTarget::Databases).await?;

    assert_eq!(account.status, 401);
    assert_eq!(databases.status, 200);
    assert_eq!(
        databases.body.and_then(|body| body.get("total").cloned()),
        Some(json!(1))
    );

    let requests = server.received_requests().await.unwrap_or_default();
    let account_request = requests
        .iter()
        .find(|request| request.url.path() == "/v1/account");
    assert!(account_request.is_some_and(|request| !request.headers.contains_key("x-appwrite-key")));
    Ok(())
}
