//! Mock backend checks.
//!
//! Two independent checks keep the mock backend honest: a schema check that
//! compares seed documents against the collection catalog, and a functional
//! check that drives the unified API through a CRUD and pagination script.

use crate::api::{ApiResponse, BackendApi, ListParams};
use crate::migration::duration_ms;
use chrono::{SecondsFormat, Utc};
use dernek_domain::{AttributeDefinition, AttributeType, CollectionDefinition, collections};
use dernek_ports::{Document, DocumentData, DocumentQuery, DocumentsPort, SYSTEM_FIELD_PREFIX};
use dernek_shared::{RequestContext, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Instant;

/// Collections whose seed data is checked against the catalog.
pub const SCHEMA_CHECKED_COLLECTIONS: [&str; 5] = [
    collections::BENEFICIARIES,
    collections::DONATIONS,
    collections::TASKS,
    collections::MEETINGS,
    collections::MESSAGES,
];

/// A field whose seed value does not fit the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMismatch {
    /// Attribute key.
    pub field: String,
    /// Declared attribute type.
    pub expected_type: AttributeType,
    /// JSON type found in the seed.
    pub actual_type: &'static str,
    /// How to fix the seed value, when obvious.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Schema check result for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchemaCheck {
    /// Collection id.
    pub collection: String,
    /// No missing required fields and no mismatches.
    pub is_valid: bool,
    /// Declared attributes compared.
    pub fields_checked: usize,
    /// Type mismatches.
    pub mismatches: Vec<FieldMismatch>,
    /// Required attributes absent from the sample.
    pub missing_fields: Vec<String>,
    /// Sample fields the catalog does not declare.
    pub extra_fields: Vec<String>,
}

/// Aggregate counts of a schema run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    /// Collections checked.
    pub total_collections: usize,
    /// Collections that passed.
    pub valid_collections: usize,
    /// Collections that failed.
    pub invalid_collections: usize,
    /// Mismatches across all collections.
    pub total_mismatches: usize,
}

/// Schema check report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidationReport {
    /// RFC 3339 time of the run.
    pub timestamp: String,
    /// Aggregate counts.
    pub summary: SchemaSummary,
    /// One entry per checked collection.
    pub results: Vec<CollectionSchemaCheck>,
    /// Fix-up hints.
    pub recommendations: Vec<String>,
}

/// One functional test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTestResult {
    /// Test name.
    pub test_name: String,
    /// Outcome.
    pub passed: bool,
    /// Outcome detail.
    pub message: String,
    /// Duration in milliseconds.
    pub duration: u64,
}

/// Functional test report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTestReport {
    /// Tests run.
    pub total_tests: usize,
    /// Tests passed.
    pub passed: usize,
    /// Tests failed.
    pub failed: usize,
    /// Per-test results in run order.
    pub results: Vec<ApiTestResult>,
    /// Fix-up hints.
    pub recommendations: Vec<String>,
}

/// Compare the first seed document of each checked collection with its
/// catalog definition.
///
/// A listing failure counts as an empty seed. Only cancellation is returned
/// as an error.
#[tracing::instrument(name = "mock.schema", skip_all)]
pub async fn validate_mock_schemas(
    ctx: &RequestContext,
    documents: &dyn DocumentsPort,
    catalog: &[CollectionDefinition],
) -> Result<SchemaValidationReport> {
    let mut results = Vec::new();

    for definition in catalog
        .iter()
        .filter(|definition| SCHEMA_CHECKED_COLLECTIONS.contains(&definition.id.as_str()))
    {
        let query = DocumentQuery {
            limit: 1,
            ..DocumentQuery::default()
        };
        let sample = match documents
            .list_documents(ctx, definition.id.clone(), query)
            .await
        {
            Ok(page) => page.documents.into_iter().next(),
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                tracing::warn!(collection = %definition.id, error = %error, "mock listing failed");
                None
            },
        };
        results.push(check_document(definition, sample.as_ref()));
    }

    let summary = SchemaSummary {
        total_collections: results.len(),
        valid_collections: results.iter().filter(|result| result.is_valid).count(),
        invalid_collections: results.iter().filter(|result| !result.is_valid).count(),
        total_mismatches: results.iter().map(|result| result.mismatches.len()).sum(),
    };

    Ok(SchemaValidationReport {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        summary,
        recommendations: schema_recommendations(&results),
        results,
    })
}

/// Check one sample document against a definition. `None` is an empty seed.
pub fn check_document(
    definition: &CollectionDefinition,
    sample: Option<&Document>,
) -> CollectionSchemaCheck {
    let required = || {
        definition
            .attributes
            .iter()
            .filter(|attribute| attribute.required)
            .map(|attribute| attribute.key.to_string())
    };

    let Some(sample) = sample else {
        return CollectionSchemaCheck {
            collection: definition.id.to_string(),
            is_valid: false,
            fields_checked: 0,
            mismatches: Vec::new(),
            missing_fields: required().collect(),
            extra_fields: Vec::new(),
        };
    };

    let mut mismatches = Vec::new();
    let mut missing_fields = Vec::new();
    for attribute in &definition.attributes {
        match sample.get(&attribute.key) {
            None | Some(Value::Null) => {
                if attribute.required {
                    missing_fields.push(attribute.key.to_string());
                }
            },
            Some(value) => {
                if let Some(mismatch) = compare_type(attribute, value) {
                    mismatches.push(mismatch);
                }
            },
        }
    }

    let extra_fields = sample
        .fields()
        .keys()
        .filter(|key| !key.starts_with(SYSTEM_FIELD_PREFIX))
        .filter(|key| definition.attribute(key).is_none())
        .cloned()
        .collect();

    CollectionSchemaCheck {
        collection: definition.id.to_string(),
        is_valid: mismatches.is_empty() && missing_fields.is_empty(),
        fields_checked: definition.attributes.len(),
        mismatches,
        missing_fields,
        extra_fields,
    }
}

fn compare_type(attribute: &AttributeDefinition, value: &Value) -> Option<FieldMismatch> {
    let matches = match attribute.kind {
        AttributeType::String | AttributeType::Datetime => value.is_string(),
        AttributeType::Enum => value.as_str().is_some_and(|text| {
            attribute.enum_options.is_empty()
                || attribute.enum_options.iter().any(|option| &**option == text)
        }),
        AttributeType::Integer => value.is_i64() || value.is_u64(),
        AttributeType::Float => value.is_number(),
        AttributeType::Boolean => value.is_boolean(),
        // Arrays are stored as serialized JSON text remotely.
        AttributeType::Array => value.is_array() || value.is_string(),
    };
    if matches {
        return None;
    }

    Some(FieldMismatch {
        field: attribute.key.to_string(),
        expected_type: attribute.kind,
        actual_type: json_type(value),
        suggestion: suggestion(attribute, value),
    })
}

fn suggestion(attribute: &AttributeDefinition, value: &Value) -> Option<String> {
    match (attribute.kind, value) {
        (AttributeType::String, Value::Number(number)) => {
            Some(format!("Convert number to string: \"{number}\""))
        },
        (AttributeType::Integer, Value::String(text)) if text.trim().parse::<i64>().is_ok() => {
            Some(format!("Parse string to integer: {}", text.trim()))
        },
        (AttributeType::Integer, Value::Number(number)) => {
            Some(format!("Round {number} to a whole number"))
        },
        (AttributeType::Float, Value::String(text)) if text.trim().parse::<f64>().is_ok() => {
            Some(format!("Parse string to float: {}", text.trim()))
        },
        (AttributeType::Boolean, Value::String(text)) if text == "true" || text == "false" => {
            Some(format!("Convert string to boolean: {text}"))
        },
        (AttributeType::Enum, Value::String(_)) => Some(format!(
            "Use one of: {}",
            attribute
                .enum_options
                .iter()
                .map(|option| &**option)
                .collect::<Vec<_>>()
                .join(", ")
        )),
        (AttributeType::Array, other) => Some(format!("Wrap the value in an array: [{other}]")),
        _ => None,
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn schema_recommendations(results: &[CollectionSchemaCheck]) -> Vec<String> {
    let mut out = Vec::new();
    for result in results {
        if !result.missing_fields.is_empty() {
            out.push(format!(
                "Add missing fields to {} mock data: {}",
                result.collection,
                result.missing_fields.join(", ")
            ));
        }
        for mismatch in &result.mismatches {
            if let Some(suggestion) = mismatch.suggestion.as_deref() {
                out.push(format!(
                    "Fix {}.{}: {suggestion}",
                    result.collection, mismatch.field
                ));
            }
        }
        if !result.extra_fields.is_empty() {
            out.push(format!(
                "Remove extra fields from {} mock data: {}",
                result.collection,
                result.extra_fields.join(", ")
            ));
        }
    }
    out
}

/// Drive the beneficiaries API through a fixed script of reads, writes and
/// pagination, recording one result per step.
#[tracing::instrument(name = "mock.api", skip_all)]
pub async fn run_mock_api_tests(ctx: &RequestContext, api: &BackendApi) -> Result<ApiTestReport> {
    let beneficiaries = api.beneficiaries();
    let mut runner = TestRunner::default();

    let started_at = Instant::now();
    let listed = beneficiaries.list(ctx, ListParams::default()).await?;
    let first_id = listed
        .data
        .as_ref()
        .and_then(|documents| documents.first())
        .and_then(Document::id)
        .map(str::to_owned);
    runner.record(
        "list beneficiaries",
        started_at,
        listed.error.is_none() && listed.data.is_some(),
        describe(&listed, "Invalid response format"),
    );

    let started_at = Instant::now();
    match first_id.as_deref() {
        Some(id) => {
            let response = beneficiaries.get(ctx, id).await?;
            let same = response
                .data
                .as_ref()
                .and_then(Document::id)
                .is_some_and(|found| found == id);
            runner.record(
                "get beneficiary by id",
                started_at,
                same,
                describe(&response, "Returned a different document"),
            );
        },
        None => runner.record("get beneficiary by id", started_at, false, "No data to test".into()),
    }

    let started_at = Instant::now();
    let response = beneficiaries.get(ctx, "invalid-id").await?;
    let rejected = response.data.is_none() && response.error.is_some();
    runner.record(
        "get beneficiary with unknown id",
        started_at,
        rejected,
        if rejected {
            "Correctly returned error".to_owned()
        } else {
            "Should return error".to_owned()
        },
    );

    let started_at = Instant::now();
    let searched = beneficiaries
        .list(ctx, ListParams::default().search("Ahmet"))
        .await?;
    let found = searched.data.as_ref().is_some_and(|documents| {
        documents.iter().any(|document| {
            document
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.contains("Ahmet"))
        })
    });
    runner.record(
        "search beneficiaries",
        started_at,
        found,
        describe(&searched, "Search not working"),
    );

    let started_at = Instant::now();
    let filtered = beneficiaries
        .list(ctx, ListParams::default().filter("status", "AKTIF"))
        .await?;
    let all_active = filtered.data.as_ref().is_some_and(|documents| {
        documents
            .iter()
            .all(|document| document.get("status") == Some(&Value::from("AKTIF")))
    });
    runner.record(
        "filter beneficiaries by status",
        started_at,
        all_active,
        describe(&filtered, "Status filter not working"),
    );

    let started_at = Instant::now();
    let created = beneficiaries.create(ctx, sample_beneficiary()).await?;
    let created_id = created
        .data
        .as_ref()
        .and_then(Document::id)
        .map(str::to_owned);
    let named = field_equals(&created, "name", "Test Beneficiary");
    runner.record(
        "create beneficiary",
        started_at,
        named,
        describe(&created, "Created document lost its fields"),
    );

    let started_at = Instant::now();
    match first_id.as_deref() {
        Some(id) => {
            let mut data = DocumentData::new();
            data.insert("name".to_owned(), Value::from("Updated Name"));
            let updated = beneficiaries.update(ctx, id, data).await?;
            runner.record(
                "update beneficiary",
                started_at,
                field_equals(&updated, "name", "Updated Name"),
                describe(&updated, "Update was not applied"),
            );
        },
        None => runner.record("update beneficiary", started_at, false, "No data to update".into()),
    }

    let started_at = Instant::now();
    match created_id.as_deref().or(first_id.as_deref()) {
        Some(id) => {
            let deleted = beneficiaries.delete(ctx, id).await?;
            runner.record(
                "delete beneficiary",
                started_at,
                deleted.error.is_none(),
                describe(&deleted, "Failed to delete"),
            );
        },
        None => runner.record("delete beneficiary", started_at, false, "No data to delete".into()),
    }

    for (page, limit) in [(1, 2), (2, 1)] {
        let started_at = Instant::now();
        let response = beneficiaries
            .list(ctx, ListParams::default().page(page).limit(limit))
            .await?;
        let within = response.total.is_some()
            && response.data.as_ref().is_some_and(|documents| {
                u32::try_from(documents.len()).is_ok_and(|len| len <= limit)
            });
        runner.record(
            &format!("pagination page {page} limit {limit}"),
            started_at,
            within,
            describe(&response, "Invalid pagination"),
        );
    }

    Ok(runner.finish())
}

#[derive(Default)]
struct TestRunner {
    results: Vec<ApiTestResult>,
}

impl TestRunner {
    fn record(&mut self, name: &str, started_at: Instant, passed: bool, message: String) {
        self.results.push(ApiTestResult {
            test_name: name.to_owned(),
            passed,
            message: if passed { "Success".to_owned() } else { message },
            duration: duration_ms(started_at),
        });
    }

    fn finish(self) -> ApiTestReport {
        let passed = self.results.iter().filter(|result| result.passed).count();
        let failed = self.results.len() - passed;
        let mut recommendations = Vec::new();
        if failed > 0 {
            recommendations.push("Review failed tests and fix mock API implementations".to_owned());
        }
        if passed == 0 {
            recommendations.push("All tests failed - check mock API setup".to_owned());
        }
        ApiTestReport {
            total_tests: self.results.len(),
            passed,
            failed,
            results: self.results,
            recommendations,
        }
    }
}

fn describe<T>(response: &ApiResponse<T>, fallback: &str) -> String {
    response
        .error
        .as_ref()
        .map_or_else(|| fallback.to_owned(), |error| format!("Error: {error}"))
}

fn field_equals(response: &ApiResponse<Document>, field: &str, expected: &str) -> bool {
    response
        .data
        .as_ref()
        .and_then(|document| document.get(field))
        .and_then(Value::as_str)
        .is_some_and(|value| value == expected)
}

fn sample_beneficiary() -> DocumentData {
    let value = json!({
        "name": "Test Beneficiary",
        "tc_no": "12345678901",
        "phone": "5551234567",
        "email": "test@example.com",
        "address": "Test Address",
        "city": "ISTANBUL",
        "district": "Test District",
        "neighborhood": "Test Neighborhood",
        "family_size": 4,
        "status": "TASLAK",
    });
    match value {
        Value::Object(fields) => fields,
        _ => DocumentData::new(),
    }
}
