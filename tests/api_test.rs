//! End-to-end binding scenarios against a mocked admin API.

use std::time::Duration;

use docbox_admin::types::{CreateTenant, MigrateTenants};
use docbox_admin::{
    AdminClient, EntryStatus, HttpClient, QueryClient, QueryConfig, RetryConfig, TenantScope,
    keys,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

async fn setup() -> (MockServer, AdminClient) {
    let server = MockServer::start().await;
    let http = HttpClient::new(format!("{}/api/", server.uri())).unwrap();
    let queries = QueryClient::new(QueryConfig::new().retry(RetryConfig::disabled()));
    (server, AdminClient::new(http, queries))
}

fn tenant_json(env: &str, id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Tenant {id}"),
        "db_name": format!("docbox-{id}"),
        "db_secret_name": format!("postgres/docbox/{id}"),
        "s3_name": format!("docbox-{id}"),
        "os_index_name": format!("docbox-{id}"),
        "env": env,
        "event_queue_url": null
    })
}

fn create_request(env: &str, id: &str) -> CreateTenant {
    CreateTenant {
        id: id.to_string(),
        db_name: format!("docbox-{id}"),
        env: env.to_string(),
        db_secret_name: format!("postgres/docbox/{id}"),
        db_role_name: format!("docbox-{id}-api"),
        db_role_password: "password".to_string(),
        s3_name: format!("docbox-{id}"),
        os_index_name: format!("docbox-{id}"),
        event_queue_url: None,
        origins: vec!["https://example.com".to_string()],
        s3_queue_arn: None,
    }
}

// ============================================================================
// Tenants
// ============================================================================

#[tokio::test]
async fn concurrent_tenant_views_issue_one_request() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([tenant_json("prod", "abc")]))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut views: Vec<_> = (0..4).map(|_| client.tenants()).collect();
    for view in &mut views {
        let state = view.settled().await;
        assert_eq!(state.data().map(|t| t.len()), Some(1));
    }
}

#[tokio::test]
async fn created_tenant_appears_once_in_list() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tenant_json("prod", "abc")])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            tenant_json("prod", "abc"),
            tenant_json("prod", "new")
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tenant"))
        .and(body_json(serde_json::to_value(create_request("prod", "new")).unwrap()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut list = client.tenants();
    assert_eq!(list.settled().await.data().map(|t| t.len()), Some(1));

    client
        .create_tenant()
        .execute(create_request("prod", "new"))
        .await
        .unwrap();

    let state = list.settled().await;
    let tenants = state.data().unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants.iter().filter(|t| t.id == "new").count(), 1);
}

#[tokio::test]
async fn migrate_tenant_refreshes_migrations_view() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/root/migrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "tenant": tenant_json("prod", "abc"), "migrations": ["m_20250101_add_index"] }
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/root/migrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "tenant": tenant_json("prod", "abc"), "migrations": [] }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tenant/prod/abc/migrate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut view = client.migrations();
    let before = view.settled().await;
    assert_eq!(before.data().unwrap()[0].migrations.len(), 1);

    client
        .migrate_tenant()
        .execute(TenantScope::new("prod", "abc"))
        .await
        .unwrap();

    // Stale and refetching as soon as the mutation returns.
    assert!(view.state().is_stale());
    assert_eq!(
        client.queries().status(&keys::root::migrations()),
        Some(EntryStatus::Loading)
    );

    let after = view.settled().await;
    assert!(after.data().unwrap()[0].migrations.is_empty());
    assert!(!after.is_stale());
}

#[tokio::test]
async fn failed_migration_leaves_cache_untouched() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/root/migrations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tenant/prod/abc/migrate"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "reason": "migration failed" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut view = client.migrations();
    view.settled().await;

    let mutation = client.migrate_tenant();
    let err = mutation
        .execute(TenantScope::new("prod", "abc"))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "migration failed");
    assert_eq!(
        mutation.status().error_message().as_deref(),
        Some("migration failed")
    );
    assert!(!view.state().is_stale());
}

#[tokio::test]
async fn tenant_detail_is_keyed_by_env_and_id() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/prod/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tenant_json("prod", "abc")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/dev/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tenant_json("dev", "abc")))
        .expect(1)
        .mount(&server)
        .await;

    let mut prod = client.tenant(&TenantScope::new("prod", "abc"));
    let mut dev = client.tenant(&TenantScope::new("dev", "abc"));
    assert_eq!(prod.settled().await.data().unwrap().env, "prod");
    assert_eq!(dev.settled().await.data().unwrap().env, "dev");
}

#[tokio::test]
async fn delete_tenant_invalidates_its_branches() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tenant_json("prod", "abc")])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/tenant/prod/abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut list = client.tenants();
    list.settled().await;
    list.set_enabled(false);

    let mutation = client.delete_tenant();
    let scope = TenantScope::new("prod", "abc");
    let filters = mutation.invalidations_for(&scope);
    assert!(filters.iter().any(|f| f.matches(&scope.keys().folder(Some("inbox"), None))));
    assert!(!filters.iter().any(|f| {
        f.matches(&TenantScope::new("prod", "other").keys().document_box(Some("inbox")))
    }));

    mutation.execute(scope).await.unwrap();
    assert_eq!(
        client.queries().status(&keys::tenant::list()),
        Some(EntryStatus::Stale)
    );
}

// ============================================================================
// Auth and root
// ============================================================================

#[tokio::test]
async fn login_refreshes_session_state() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/is-authenticated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authenticated": false })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/is-authenticated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authenticated": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authenticate"))
        .and(body_json(json!({ "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = client.is_authenticated();
    assert_eq!(session.settled().await.data().map(|a| **a), Some(false));

    let login = client.authenticate();
    login.execute("hunter2".to_string()).await.unwrap();
    assert!(!login.is_pending());

    assert_eq!(session.settled().await.data().map(|a| **a), Some(true));
}

#[tokio::test]
async fn wrong_password_is_reported() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authenticate"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "reason": "invalid password" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let login = client.authenticate();
    let err = login.execute("nope".to_string()).await.unwrap_err();
    assert_eq!(err.message(), "invalid password");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn initialize_refreshes_initialized_flag() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/root/initialized"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "initialized": false })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/root/initialized"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "initialized": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/root/initialize"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut flag = client.is_initialized();
    assert_eq!(flag.settled().await.data().map(|i| **i), Some(false));

    client.initialize().execute(()).await.unwrap();
    assert_eq!(flag.settled().await.data().map(|i| **i), Some(true));
}

#[tokio::test]
async fn migrate_all_sends_skip_failed() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/root/migrate"))
        .and(body_json(json!({ "skip_failed": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .migrate_tenants()
        .execute(MigrateTenants::skip_failed(true))
        .await
        .unwrap();
}

#[tokio::test]
async fn read_errors_keep_message() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "not authenticated" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut list = client.tenants();
    let state = list.settled().await;
    assert!(state.is_error());
    assert_eq!(state.error_message().as_deref(), Some("not authenticated"));
}
