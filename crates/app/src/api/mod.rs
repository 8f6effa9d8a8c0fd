//! Unified data API.
//!
//! [`BackendApi`] is built once from the resolved provider and exposes the
//! same sub-APIs and response shapes whether it runs against the mock
//! backend or the remote one. Callers never branch on the provider.

mod collection;
mod dashboard;
mod response;
mod storage;

pub use collection::{CollectionApi, CollectionProfile, DEFAULT_PAGE_SIZE, ListParams};
pub use dashboard::{DashboardApi, DashboardMetrics};
pub use response::{
    ApiResponse, MESSAGE_NOT_FOUND, MESSAGE_NOT_IMPLEMENTED, MESSAGE_RATE_LIMITED,
    MESSAGE_SERVER_ERROR, MESSAGE_UNAUTHORIZED, MESSAGE_UNEXPECTED, respond, respond_list,
    user_message,
};
pub use storage::StorageApi;

use dernek_domain::{CollectionId, ProviderMode, collections};
use dernek_ports::{
    Document, DocumentQuery, DocumentsPort, EqualFilter, FileStoragePort, OrderBy, SortDirection,
};
use dernek_shared::{RequestContext, Result};
use serde_json::Value;
use std::sync::Arc;

/// Parameters returned by [`BackendApi::parameters_by_category`].
const PARAMETER_CATEGORY_LIMIT: u32 = 100;

/// Every data sub-API, bound to one backend.
#[derive(Clone)]
pub struct BackendApi {
    mode: ProviderMode,
    users: CollectionApi,
    beneficiaries: CollectionApi,
    donations: CollectionApi,
    tasks: CollectionApi,
    meetings: CollectionApi,
    messages: CollectionApi,
    parameters: CollectionApi,
    aid_applications: CollectionApi,
    storage: StorageApi,
    dashboard: DashboardApi,
    documents: Arc<dyn DocumentsPort>,
}

impl BackendApi {
    /// Bind every sub-API to the given ports.
    pub fn new(
        mode: ProviderMode,
        documents: Arc<dyn DocumentsPort>,
        storage: Arc<dyn FileStoragePort>,
    ) -> Self {
        let bind = |name: &'static str, profile: CollectionProfile| {
            CollectionApi::new(
                CollectionId::from_static(name),
                profile,
                Arc::clone(&documents),
            )
        };

        Self {
            mode,
            users: bind(collections::USERS, CollectionProfile::searching("name")),
            beneficiaries: bind(
                collections::BENEFICIARIES,
                CollectionProfile::searching("name"),
            ),
            donations: bind(
                collections::DONATIONS,
                CollectionProfile::searching("donor_name"),
            ),
            tasks: bind(
                collections::TASKS,
                CollectionProfile::searching("title")
                    .page_size(20)
                    .newest_first("$createdAt"),
            ),
            meetings: bind(
                collections::MEETINGS,
                CollectionProfile::searching("title")
                    .page_size(20)
                    .newest_first("meeting_date"),
            ),
            messages: bind(
                collections::MESSAGES,
                CollectionProfile::searching("subject")
                    .page_size(20)
                    .newest_first("$createdAt"),
            ),
            parameters: bind(
                collections::PARAMETERS,
                CollectionProfile::searching("name_tr").page_size(100),
            ),
            aid_applications: bind(
                collections::AID_APPLICATIONS,
                CollectionProfile::searching("applicant_name")
                    .page_size(20)
                    .newest_first("application_date"),
            ),
            storage: StorageApi::new(storage),
            dashboard: DashboardApi::new(Arc::clone(&documents)),
            documents,
        }
    }

    /// Provider the API is bound to.
    pub const fn mode(&self) -> ProviderMode {
        self.mode
    }

    /// Users.
    pub const fn users(&self) -> &CollectionApi {
        &self.users
    }

    /// Beneficiaries.
    pub const fn beneficiaries(&self) -> &CollectionApi {
        &self.beneficiaries
    }

    /// Donations.
    pub const fn donations(&self) -> &CollectionApi {
        &self.donations
    }

    /// Tasks.
    pub const fn tasks(&self) -> &CollectionApi {
        &self.tasks
    }

    /// Meetings.
    pub const fn meetings(&self) -> &CollectionApi {
        &self.meetings
    }

    /// Internal messages.
    pub const fn messages(&self) -> &CollectionApi {
        &self.messages
    }

    /// Lookup parameters.
    pub const fn parameters(&self) -> &CollectionApi {
        &self.parameters
    }

    /// Aid applications.
    pub const fn aid_applications(&self) -> &CollectionApi {
        &self.aid_applications
    }

    /// Document port every collection sub-API is bound to.
    pub fn documents(&self) -> &dyn DocumentsPort {
        self.documents.as_ref()
    }

    /// Bucket file storage.
    pub const fn storage(&self) -> &StorageApi {
        &self.storage
    }

    /// Dashboard metrics.
    pub const fn dashboard(&self) -> &DashboardApi {
        &self.dashboard
    }

    /// Active parameters of one category, in display order.
    pub async fn parameters_by_category(
        &self,
        ctx: &RequestContext,
        category: &str,
    ) -> Result<ApiResponse<Vec<Document>>> {
        self.parameters
            .list_query(
                ctx,
                DocumentQuery {
                    limit: PARAMETER_CATEGORY_LIMIT,
                    offset: 0,
                    search: None,
                    order: Some(OrderBy {
                        field: "order".into(),
                        direction: SortDirection::Asc,
                    }),
                    filters: vec![
                        EqualFilter {
                            field: "category".into(),
                            value: Value::from(category),
                        },
                        EqualFilter {
                            field: "is_active".into(),
                            value: Value::Bool(true),
                        },
                    ],
                },
            )
            .await
    }

    /// Set a task's status.
    pub async fn update_task_status(
        &self,
        ctx: &RequestContext,
        id: &str,
        status: &str,
    ) -> Result<ApiResponse<Document>> {
        self.tasks.update_field(ctx, id, "status", status).await
    }

    /// Set a meeting's status.
    pub async fn update_meeting_status(
        &self,
        ctx: &RequestContext,
        id: &str,
        status: &str,
    ) -> Result<ApiResponse<Document>> {
        self.meetings.update_field(ctx, id, "status", status).await
    }

    /// Move an aid application to another stage.
    pub async fn update_aid_application_stage(
        &self,
        ctx: &RequestContext,
        id: &str,
        stage: &str,
    ) -> Result<ApiResponse<Document>> {
        self.aid_applications
            .update_field(ctx, id, "stage", stage)
            .await
    }
}

impl std::fmt::Debug for BackendApi {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BackendApi")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
