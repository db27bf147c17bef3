//! Hub session tests against a mock hub.

use recipes_registry::{
    HubConfig, HubSession, Publisher, RegistryClient, RegistryConfig, RegistryError,
    RepositoryApi,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn login(server: &MockServer) -> HubSession {
    Mock::given(method("POST"))
        .and(path("/v2/users/login/"))
        .and(body_json(json!({"username": "ctferio", "password": "pat"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "hub-token"})))
        .expect(1)
        .mount(server)
        .await;

    HubSession::login(HubConfig::new("ctferio").with_url(server.uri()), "ctferio", "pat")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_returns_token() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    assert_eq!(session.token(), "hub-token");
    assert_eq!(session.config().namespace, "ctferio");
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/users/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let err = HubSession::login(
        HubConfig::new("ctferio").with_url(server.uri()),
        "ctferio",
        "wrong",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RegistryError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn test_repository_exists() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/repositories/ctferio/recipes_present/"))
        .and(header("authorization", "Bearer hub-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "recipes_present"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/ctferio/recipes_absent/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/ctferio/recipes_broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(session.repository_exists("recipes_present").await.unwrap());
    assert!(!session.repository_exists("recipes_absent").await.unwrap());

    let err = session.repository_exists("recipes_broken").await.unwrap_err();
    assert!(matches!(err, RegistryError::HttpError { status: 500, .. }));
}

#[tokio::test]
async fn test_create_repository_payload() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/repositories/"))
        .and(header("authorization", "Bearer hub-token"))
        .and(body_json(json!({
            "registry": "docker",
            "namespace": "ctferio",
            "is_private": false,
            "name": "recipes_chall-manager_debug",
            "description": "Generated from Recipes...",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    session
        .create_repository("recipes_chall-manager_debug")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_repository_requires_201() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("POST"))
        .and(path("/v2/repositories/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = session.create_repository("recipes_x").await.unwrap_err();
    assert!(matches!(err, RegistryError::HttpError { status: 200, .. }));
}

#[tokio::test]
async fn test_ensure_repository_creates_at_most_once() {
    let server = MockServer::start().await;
    let session = login(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/repositories/ctferio/recipes_new/"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/repositories/ctferio/recipes_new/"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/repositories/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = RegistryClient::new(RegistryConfig::new(server.uri())).unwrap();
    let publisher = Publisher::new(&session, &client);

    publisher.ensure_repository("recipes_new").await.unwrap();
    publisher.ensure_repository("recipes_new").await.unwrap();
}
