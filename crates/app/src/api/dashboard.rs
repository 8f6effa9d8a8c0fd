//! Dashboard metrics sub-API.

use super::response::{ApiResponse, respond};
use dernek_domain::{CollectionId, collections};
use dernek_ports::{DocumentQuery, DocumentsPort, EqualFilter};
use dernek_shared::{RequestContext, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Donations fetched when summing amounts.
const DONATION_SCAN_LIMIT: u32 = 1_000;

/// Headline numbers shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Beneficiary count.
    pub total_beneficiaries: u64,
    /// Donation count.
    pub total_donations: u64,
    /// Sum of `amount` over completed donations.
    pub total_donation_amount: f64,
    /// Users with `isActive == true`.
    pub active_users: u64,
}

/// Aggregated metrics over several collections.
#[derive(Clone)]
pub struct DashboardApi {
    documents: Arc<dyn DocumentsPort>,
}

impl DashboardApi {
    /// Wrap a documents port.
    pub fn new(documents: Arc<dyn DocumentsPort>) -> Self {
        Self { documents }
    }

    /// Compute the dashboard metrics.
    pub async fn get_metrics(&self, ctx: &RequestContext) -> Result<ApiResponse<DashboardMetrics>> {
        respond(self.collect(ctx).await)
    }

    async fn collect(&self, ctx: &RequestContext) -> Result<DashboardMetrics> {
        let beneficiaries = self
            .documents
            .list_documents(
                ctx,
                CollectionId::from_static(collections::BENEFICIARIES),
                DocumentQuery {
                    limit: 1,
                    ..DocumentQuery::default()
                },
            )
            .await?;

        let donations = self
            .documents
            .list_documents(
                ctx,
                CollectionId::from_static(collections::DONATIONS),
                DocumentQuery {
                    limit: DONATION_SCAN_LIMIT,
                    ..DocumentQuery::default()
                },
            )
            .await?;

        let users = self
            .documents
            .list_documents(
                ctx,
                CollectionId::from_static(collections::USERS),
                DocumentQuery {
                    limit: 1,
                    filters: vec![EqualFilter {
                        field: "isActive".into(),
                        value: Value::Bool(true),
                    }],
                    ..DocumentQuery::default()
                },
            )
            .await?;

        let total_donation_amount = donations
            .documents
            .iter()
            .filter(|donation| donation.get("status").and_then(Value::as_str) == Some("completed"))
            .filter_map(|donation| donation.get("amount").and_then(Value::as_f64))
            .sum();

        Ok(DashboardMetrics {
            total_beneficiaries: beneficiaries.total,
            total_donations: donations.total,
            total_donation_amount,
            active_users: users.total,
        })
    }
}

impl std::fmt::Debug for DashboardApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("DashboardApi").finish_non_exhaustive()
    }
}
