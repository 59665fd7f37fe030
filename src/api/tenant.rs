//! Tenant provisioning and per-tenant migration.

use serde::de::IgnoredAny;

use super::AdminClient;
use crate::Result;
use crate::http::HttpClient;
use crate::keys;
use crate::query::{KeyFilter, Mutation, QueryOptions, Subscription};
use crate::scope::TenantScope;
use crate::types::{CreateTenant, Tenant};

pub async fn get_tenants(http: &HttpClient) -> Result<Vec<Tenant>> {
    http.get("tenant").await
}

pub async fn get_tenant(http: &HttpClient, tenant: &TenantScope) -> Result<Tenant> {
    http.get(&tenant.path()).await
}

pub async fn create_tenant(http: &HttpClient, request: &CreateTenant) -> Result<()> {
    http.post::<IgnoredAny, _>("tenant", request)
        .await
        .map(|_| ())
}

/// Apply pending migrations to one tenant.
pub async fn migrate_tenant(http: &HttpClient, tenant: &TenantScope) -> Result<()> {
    http.post_empty::<IgnoredAny>(&format!("{}/migrate", tenant.path()))
        .await
        .map(|_| ())
}

pub async fn delete_tenant(http: &HttpClient, tenant: &TenantScope) -> Result<()> {
    http.delete::<IgnoredAny>(&tenant.path()).await.map(|_| ())
}

pub fn tenants_query(http: &HttpClient) -> QueryOptions<Vec<Tenant>> {
    let http = http.clone();
    QueryOptions::new(keys::tenant::list(), move || {
        let http = http.clone();
        async move { get_tenants(&http).await }
    })
}

pub fn tenant_query(http: &HttpClient, tenant: &TenantScope) -> QueryOptions<Tenant> {
    let http = http.clone();
    let scope = tenant.clone();
    QueryOptions::new(keys::tenant::detail(&tenant.env, &tenant.tenant_id), move || {
        let http = http.clone();
        let scope = scope.clone();
        async move { get_tenant(&http, &scope).await }
    })
}

impl AdminClient {
    pub fn tenants(&self) -> Subscription<Vec<Tenant>> {
        self.queries.subscribe(tenants_query(&self.http))
    }

    pub fn tenant(&self, tenant: &TenantScope) -> Subscription<Tenant> {
        self.queries.subscribe(tenant_query(&self.http, tenant))
    }

    /// Provision a tenant. A new tenant also shows up in the migrations list.
    pub fn create_tenant(&self) -> Mutation<CreateTenant, ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "create_tenant", move |request: CreateTenant| {
            let http = http.clone();
            async move { create_tenant(&http, &request).await }
        })
        .invalidates(|_| vec![keys::tenant::list().into(), keys::root::migrations().into()])
    }

    pub fn migrate_tenant(&self) -> Mutation<TenantScope, ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "migrate_tenant", move |tenant: TenantScope| {
            let http = http.clone();
            async move { migrate_tenant(&http, &tenant).await }
        })
        .invalidates(|tenant| {
            vec![
                KeyFilter::Exact(keys::tenant::detail(&tenant.env, &tenant.tenant_id)),
                keys::root::migrations().into(),
            ]
        })
    }

    /// Delete a tenant, dropping everything cached for it.
    pub fn delete_tenant(&self) -> Mutation<TenantScope, ()> {
        let http = self.http.clone();
        Mutation::new(&self.queries, "delete_tenant", move |tenant: TenantScope| {
            let http = http.clone();
            async move { delete_tenant(&http, &tenant).await }
        })
        .invalidates(|tenant| {
            vec![
                keys::tenant::list().into(),
                KeyFilter::Exact(keys::tenant::detail(&tenant.env, &tenant.tenant_id)),
                keys::root::migrations().into(),
                tenant.keys().root().into(),
            ]
        })
    }
}
