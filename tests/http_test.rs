//! Request layer tests against a wiremock server.

use std::time::Duration;

use docbox_admin::api::tenant;
use docbox_admin::types::{IsAuthenticatedResponse, Tenant};
use docbox_admin::{AdminError, HttpClient, RequestConfig, TenantScope};
use serde::de::IgnoredAny;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, HttpClient) {
    let server = MockServer::start().await;
    let client = HttpClient::new(format!("{}/api/", server.uri())).unwrap();
    (server, client)
}

fn tenant_json(env: &str, id: &str) -> serde_json::Value {
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

#[tokio::test]
async fn get_decodes_json() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/prod/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tenant_json("prod", "abc")))
        .expect(1)
        .mount(&server)
        .await;

    let tenant: Tenant = client.get("/tenant/prod/abc").await.unwrap();
    assert_eq!(tenant.id, "abc");
    assert_eq!(tenant.env, "prod");
    assert_eq!(tenant.event_queue_url, None);
}

#[tokio::test]
async fn post_sends_json_body() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authenticate"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let _: IgnoredAny = client
        .post("auth/authenticate", &json!({ "password": "hunter2" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_success_body_is_accepted() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/root/initialize"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let _: IgnoredAny = client.post_empty("root/initialize").await.unwrap();
}

#[tokio::test]
async fn put_patch_delete_use_their_methods() {
    let (server, client) = setup().await;
    for verb in ["PUT", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/api/thing"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let _: IgnoredAny = client.put("thing", &json!({ "a": 1 })).await.unwrap();
    let _: IgnoredAny = client.patch("thing", &json!({ "a": 2 })).await.unwrap();
    let _: IgnoredAny = client.delete("thing").await.unwrap();
}

#[tokio::test]
async fn request_config_adds_query_and_headers() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/things"))
        .and(query_param("offset", "100"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = RequestConfig::new()
        .query("offset", 100)
        .header("x-trace", "abc");
    let things: Vec<u32> = client.get_with("things", &config).await.unwrap();
    assert!(things.is_empty());
}

#[tokio::test]
async fn session_cookie_is_sent_back() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authenticate"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "docbox-admin-session=s3cr3t; Path=/")
                .set_body_json(json!({})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/is-authenticated"))
        .and(header("cookie", "docbox-admin-session=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "authenticated": true })))
        .expect(1)
        .mount(&server)
        .await;

    let _: IgnoredAny = client
        .post("auth/authenticate", &json!({ "password": "pw" }))
        .await
        .unwrap();

    // A rebased clone shares the session.
    let gateway = client.rebase(format!("{}/api/", server.uri()));
    let status: IsAuthenticatedResponse = gateway.get("auth/is-authenticated").await.unwrap();
    assert!(status.authenticated);
}

#[tokio::test]
async fn error_status_carries_body() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/prod/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "reason": "tenant not found" })),
        )
        .mount(&server)
        .await;

    let err = client
        .get::<Tenant>("tenant/prod/missing")
        .await
        .unwrap_err();
    match &err {
        AdminError::Client { status, .. } => assert_eq!(*status, 404),
        other => panic!("expected client error, got {other:?}"),
    }
    assert_eq!(err.message(), "tenant not found");
}

#[tokio::test]
async fn mismatched_body_is_decode_error() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/tenant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "not": "a list" })))
        .mount(&server)
        .await;

    let err = client.get::<Vec<Tenant>>("tenant").await.unwrap_err();
    assert!(matches!(err, AdminError::Decode(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn timeout_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client =
        HttpClient::with_timeout(format!("{}/api/", server.uri()), Duration::from_millis(50))
            .unwrap();
    let err = client.get::<IgnoredAny>("slow").await.unwrap_err();
    assert!(matches!(err, AdminError::Unreachable(_)));
    assert_eq!(
        err.message(),
        "Service unavailable, unreachable, or timed out"
    );
}

#[tokio::test]
async fn tenant_ids_stay_inside_their_path_segment() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tenant/prod/a%2Fmigrate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tenant/prod/a/migrate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tenant/prod/a%3Fx%3D1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tenant_json("prod", "a?x=1")))
        .expect(1)
        .mount(&server)
        .await;

    tenant::delete_tenant(&client, &TenantScope::new("prod", "a/migrate"))
        .await
        .unwrap();
    let fetched = tenant::get_tenant(&client, &TenantScope::new("prod", "a?x=1"))
        .await
        .unwrap();
    assert_eq!(fetched.id, "a?x=1");
}
