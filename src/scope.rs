//! Scope resolution.
//!
//! The caller owns the selection state (which tenant, which document box,
//! which folder) and passes it explicitly. Everything here only derives keys
//! and URLs from it.

use std::fmt;

use urlencoding::encode;

use crate::http::HttpClient;
use crate::keys::{self, DocboxKeys};
use crate::query::QueryKey;

/// Composite identity of one tenant instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScope {
    pub env: String,
    pub tenant_id: String,
}

impl TenantScope {
    pub fn new(env: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// The docbox key branch owned by this tenant.
    pub fn keys(&self) -> DocboxKeys {
        keys::docbox::instance(self)
    }

    /// Path of this tenant on the admin API, relative to the base URL.
    ///
    /// Both segments are percent-encoded.
    pub fn path(&self) -> String {
        format!("tenant/{}/{}", encode(&self.env), encode(&self.tenant_id))
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.env, self.tenant_id)
    }
}

/// Active selection within a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeContext {
    pub tenant: TenantScope,
    /// Selected document box scope, if any.
    pub document_box: Option<String>,
    /// Selected folder within the box. `None` is the box root.
    pub folder_id: Option<String>,
}

impl ScopeContext {
    pub fn new(tenant: TenantScope) -> Self {
        Self {
            tenant,
            document_box: None,
            folder_id: None,
        }
    }

    pub fn with_document_box(mut self, scope: impl Into<String>) -> Self {
        self.document_box = Some(scope.into());
        self
    }

    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn keys(&self) -> DocboxKeys {
        self.tenant.keys()
    }

    pub fn document_box_key(&self) -> QueryKey {
        self.keys().document_box(self.document_box.as_deref())
    }

    pub fn stats_key(&self) -> QueryKey {
        self.keys().box_stats(self.document_box.as_deref())
    }

    pub fn folder_key(&self) -> QueryKey {
        self.keys()
            .folder(self.document_box.as_deref(), self.folder_id.as_deref())
    }
}

/// Transport context for one tenant's document-box gateway.
///
/// Requests go through `{base}/tenant/{env}/{id}/gateway` on the admin API
/// and reuse the admin session.
#[derive(Debug, Clone)]
pub struct DocboxContext {
    tenant: TenantScope,
    http: HttpClient,
}

impl DocboxContext {
    /// Derive the gateway context for `tenant` from the admin client.
    pub fn new(admin: &HttpClient, tenant: TenantScope) -> Self {
        let gateway = gateway_url(admin.base_url(), &tenant);
        Self {
            http: admin.rebase(gateway),
            tenant,
        }
    }

    pub fn tenant(&self) -> &TenantScope {
        &self.tenant
    }

    pub fn keys(&self) -> DocboxKeys {
        self.tenant.keys()
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Client rooted at the gateway.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Absolute URL of a gateway endpoint, for links handed to a browser.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }
}

fn gateway_url(base: &str, tenant: &TenantScope) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}/{}/gateway", tenant.path())
}
