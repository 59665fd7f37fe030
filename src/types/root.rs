//! Server bootstrap and migration types.

use serde::{Deserialize, Serialize};

use super::Tenant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsInitializedResponse {
    pub initialized: bool,
}

/// A tenant and the names of its pending migrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantWithMigrations {
    pub tenant: Tenant,
    pub migrations: Vec<String>,
}

/// Request to migrate many tenants at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateTenants {
    /// Restrict to tenants in this environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Restrict to a single tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Keep going when a tenant fails to migrate.
    #[serde(default)]
    pub skip_failed: bool,
    /// Stop after applying this migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_migration_name: Option<String>,
}

impl MigrateTenants {
    pub fn skip_failed(skip_failed: bool) -> Self {
        Self {
            skip_failed,
            ..Self::default()
        }
    }
}
