//! Typed bindings for every admin endpoint.
//!
//! Each area has three layers: free request functions (one round trip,
//! no caching), `*_query` builders producing [`QueryOptions`] for the read
//! cache, and [`AdminClient`] methods returning live [`Subscription`]s or
//! [`Mutation`]s with their invalidations declared.
//!
//! [`QueryOptions`]: crate::query::QueryOptions
//! [`Subscription`]: crate::query::Subscription
//! [`Mutation`]: crate::query::Mutation

pub mod auth;
pub mod docbox;
pub mod root;
pub mod tenant;

use std::sync::Arc;

use crate::Result;
use crate::config::AdminConfig;
use crate::http::HttpClient;
use crate::query::QueryClient;
use crate::scope::{DocboxContext, TenantScope};

pub use docbox::{DocboxBindings, DocumentBoxApi};

/// Entry point for the admin API.
///
/// Cloning is cheap: clones share the HTTP session and the cache registry.
#[derive(Clone)]
pub struct AdminClient {
    http: HttpClient,
    queries: QueryClient,
}

impl AdminClient {
    pub fn new(http: HttpClient, queries: QueryClient) -> Self {
        Self { http, queries }
    }

    /// Build the HTTP client and cache registry from configuration.
    pub fn from_config(config: &AdminConfig) -> Result<Self> {
        let http = HttpClient::from_config(&config.server)?;
        let queries = QueryClient::new(config.query_config());
        Ok(Self::new(http, queries))
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    /// Gateway transport for one tenant, sharing this client's session.
    pub fn docbox_context(&self, tenant: TenantScope) -> DocboxContext {
        DocboxContext::new(&self.http, tenant)
    }

    /// Document-box bindings for one tenant over `api`.
    pub fn docbox(&self, tenant: TenantScope, api: Arc<dyn DocumentBoxApi>) -> DocboxBindings {
        DocboxBindings::new(&self.queries, tenant, api)
    }

    /// Evict every cached read. Call on shutdown or after switching servers.
    pub fn shutdown(&self) {
        self.queries.clear();
    }
}
