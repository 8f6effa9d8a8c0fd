//! Embedded catalog of the dashboard's collections.
//!
//! The table is static data compiled into the binary. Parsing is structural
//! only; [`CollectionDefinition::validate`] runs per collection at provisioning
//! time so a single malformed entry cannot block the others.

use crate::primitives::CollectionId;
use crate::schema::CollectionDefinition;
use dernek_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeSet;

const CATALOG_JSON: &str = include_str!("../data/collections.json");

/// Well-known collection ids.
pub mod collections {
    /// System users and roles.
    pub const USERS: &str = "users";
    /// People receiving aid.
    pub const BENEFICIARIES: &str = "beneficiaries";
    /// Donation records and receipts.
    pub const DONATIONS: &str = "donations";
    /// Aid requests from beneficiaries.
    pub const AID_REQUESTS: &str = "aid_requests";
    /// Aid applications.
    pub const AID_APPLICATIONS: &str = "aid_applications";
    /// Scholarships.
    pub const SCHOLARSHIPS: &str = "scholarships";
    /// Lookup parameters.
    pub const PARAMETERS: &str = "parameters";
    /// Tasks.
    pub const TASKS: &str = "tasks";
    /// Meetings.
    pub const MEETINGS: &str = "meetings";
    /// SMS, e-mail, and internal messages.
    pub const MESSAGES: &str = "messages";
    /// Finance records.
    pub const FINANCE_RECORDS: &str = "finance_records";
    /// Orphans.
    pub const ORPHANS: &str = "orphans";
    /// Sponsors.
    pub const SPONSORS: &str = "sponsors";
    /// Campaigns.
    pub const CAMPAIGNS: &str = "campaigns";
}

/// Failures loading a collection catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The catalog JSON does not match the schema model.
    #[error("collection catalog is malformed: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
    /// Two entries share a collection id.
    #[error("collection \"{id}\" is declared twice")]
    DuplicateCollection {
        /// Repeated id.
        id: String,
    },
}

impl From<CatalogError> for ErrorEnvelope {
    fn from(error: CatalogError) -> Self {
        Self::invariant(ErrorCode::new("domain", "invalid_catalog"), error.to_string())
    }
}

/// Load the embedded collection catalog in provisioning order.
pub fn collection_catalog() -> Result<Vec<CollectionDefinition>, CatalogError> {
    parse_catalog(CATALOG_JSON)
}

/// Parse a catalog from JSON text, preserving declaration order.
pub fn parse_catalog(json: &str) -> Result<Vec<CollectionDefinition>, CatalogError> {
    let definitions: Vec<CollectionDefinition> =
        serde_json::from_str(json).map_err(|error| CatalogError::Malformed {
            message: error.to_string(),
        })?;

    let mut seen = BTreeSet::new();
    for definition in &definitions {
        if !seen.insert(definition.id.as_str()) {
            return Err(CatalogError::DuplicateCollection {
                id: definition.id.to_string(),
            });
        }
    }

    Ok(definitions)
}

/// Collections to drop on rollback: reverse provisioning order, so dependents
/// go before the collections they reference.
pub fn rollback_order(catalog: &[CollectionDefinition]) -> Vec<CollectionId> {
    catalog
        .iter()
        .rev()
        .map(|definition| definition.id.clone())
        .collect()
}
