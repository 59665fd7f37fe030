//! docbox-admin - cache-coordinated client for the docbox admin API
//!
//! This crate talks to the docbox multi-tenant administration server:
//! sessions, server bootstrap, tenant provisioning and migrations, and
//! browsing each tenant's document boxes through its gateway.
//!
//! Reads are cached per [`QueryKey`]. Writes declare which keys they make
//! stale, and every live [`Subscription`] on a stale key refetches, so a
//! view never shows data a successful write has superseded.
//!
//! # Example
//!
//! ```rust,no_run
//! use docbox_admin::{AdminClient, AdminConfig, TenantScope};
//!
//! #[tokio::main]
//! async fn main() -> docbox_admin::Result<()> {
//!     let client = AdminClient::from_config(&AdminConfig::load(None)?)?;
//!
//!     client.authenticate().execute("hunter2".to_string()).await?;
//!
//!     let mut tenants = client.tenants();
//!     if let Some(list) = tenants.settled().await.data() {
//!         println!("{} tenants", list.len());
//!     }
//!
//!     // Refetches the tenant detail and the migrations list.
//!     client
//!         .migrate_tenant()
//!         .execute(TenantScope::new("prod", "acme"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod keys;
pub mod query;
pub mod scope;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use api::{AdminClient, DocboxBindings, DocumentBoxApi};
pub use config::AdminConfig;
pub use error::{AdminError, ErrorBody, ErrorKind, Result, error_message};
pub use http::{HttpClient, RequestConfig};
pub use query::{
    EntrySnapshot, EntryStatus, KeyFilter, KeySegment, Mutation, MutationRequest, MutationStatus,
    QueryClient, QueryConfig, QueryKey, QueryOptions, QueryState, RetryConfig, Subscription,
};
pub use scope::{DocboxContext, ScopeContext, TenantScope};
