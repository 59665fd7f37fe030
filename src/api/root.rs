//! Server bootstrap and global migrations.

use serde::de::IgnoredAny;

use super::AdminClient;
use crate::Result;
use crate::http::HttpClient;
use crate::keys;
use crate::query::{Mutation, QueryOptions, Subscription};
use crate::types::{IsInitializedResponse, MigrateTenants, TenantWithMigrations};

pub async fn is_initialized(http: &HttpClient) -> Result<IsInitializedResponse> {
    http.get("root/initialized").await
}

pub async fn initialize(http: &HttpClient) -> Result<()> {
    http.post_empty::<IgnoredAny>("root/initialize")
        .await
        .map(|_| ())
}

/// Pending migrations for every tenant.
pub async fn get_migrations(http: &HttpClient) -> Result<Vec<TenantWithMigrations>> {
    http.get("root/migrations").await
}

pub async fn migrate_tenants(http: &HttpClient, request: &MigrateTenants) -> Result<()> {
    http.post::<IgnoredAny, _>("root/migrate", request)
        .await
        .map(|_| ())
}

pub fn is_initialized_query(http: &HttpClient) -> QueryOptions<bool> {
    let http = http.clone();
    QueryOptions::new(keys::root::initialized(), move || {
        let http = http.clone();
        async move { is_initialized(&http).await.map(|r| r.initialized) }
    })
}

pub fn migrations_query(http: &HttpClient) -> QueryOptions<Vec<TenantWithMigrations>> {
    let http = http.clone();
    QueryOptions::new(keys::root::migrations(), move || {
        let http = http.clone();
        async move { get_migrations(&http).await }
    })
}

impl AdminClient {
    pub fn is_initialized(&self) -> Subscription<bool> {
        self.queries.subscribe(is_initialized_query(&self.http))
    }

    pub fn migrations(&self) -> Subscription<Vec<TenantWithMigrations>> {
        self.queries.subscribe(migrations_query(&self.http))
    }

    /// Create and set up the root database.
    pub fn initialize(&self) -> Mutation<(), ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "initialize", move |()| {
            let http = http.clone();
            async move { initialize(&http).await }
        })
        .invalidates(|_| vec![keys::root::initialized().into()])
    }

    /// Migrate every tenant.
    pub fn migrate_tenants(&self) -> Mutation<MigrateTenants, ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "migrate_tenants", move |request: MigrateTenants| {
            let http = http.clone();
            async move { migrate_tenants(&http, &request).await }
        })
        .invalidates(|_| vec![keys::root::migrations().into()])
    }
}
