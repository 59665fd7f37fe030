//! Tenant records.

use serde::{Deserialize, Serialize};

use crate::scope::TenantScope;

/// A provisioned tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// Tenant database name.
    pub db_name: String,
    /// Secret holding the database credentials.
    pub db_secret_name: String,
    /// Storage bucket name.
    pub s3_name: String,
    /// Search index name.
    pub os_index_name: String,
    pub env: String,
    /// Event queue URL, if events are published.
    #[serde(default)]
    pub event_queue_url: Option<String>,
}

impl Tenant {
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(&self.env, &self.id)
    }
}

/// Full provisioning record for a new tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTenant {
    pub id: String,
    pub db_name: String,
    pub env: String,
    /// Secret the database credentials are stored under.
    pub db_secret_name: String,
    pub db_role_name: String,
    pub db_role_password: String,
    pub s3_name: String,
    pub os_index_name: String,
    #[serde(default)]
    pub event_queue_url: Option<String>,
    /// CORS origins allowed for presigned uploads.
    #[serde(default)]
    pub origins: Vec<String>,
    /// Queue receiving storage notifications. Needed for presigned uploads.
    #[serde(default)]
    pub s3_queue_arn: Option<String>,
}

impl CreateTenant {
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(&self.env, &self.id)
    }
}
