//! OCI push tests against a mock distribution registry.

use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use recipes_compiler::{LayoutBuilder, LayoutOptions};
use recipes_core::{Descriptor, MediaType};
use recipes_registry::{RegistryAuth, RegistryClient, RegistryConfig, RegistryError};
use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a layout tagged `v1.0.0` and returns it with its manifest.
fn built_layout() -> (tempfile::TempDir, PathBuf, Descriptor) {
    let recipe = tempfile::tempdir().unwrap();
    fs::write(recipe.path().join("main"), b"\x7fELF fake binary").unwrap();
    fs::write(
        recipe.path().join("Pulumi.yaml"),
        "name: debug\nruntime: go\n",
    )
    .unwrap();

    let builder = LayoutBuilder::new(
        LayoutOptions::new().with_created(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    );
    let manifest = builder.build(recipe.path(), "v1.0.0").unwrap();
    let layout_dir = builder.layout_path(recipe.path());
    (recipe, layout_dir, manifest)
}

#[tokio::test]
async fn test_push_uploads_blobs_then_manifest() {
    let (_recipe, layout_dir, manifest) = built_layout();
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/v2/ctferio/recipes_x_debug/blobs/sha256:[0-9a-f]{64}$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/ctferio/recipes_x_debug/blobs/uploads/"))
        .respond_with(
            ResponseTemplate::new(202).insert_header("location", "/upload/session-1?state=abc"),
        )
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(query_param("state", "abc"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2/ctferio/recipes_x_debug/manifests/v1.0.0"))
        .and(header("content-type", MediaType::OCI_MANIFEST))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        RegistryClient::new(RegistryConfig::new(server.uri()).with_namespace("ctferio")).unwrap();
    let digest = client
        .push_layout(&layout_dir, "recipes_x_debug", "v1.0.0")
        .await
        .unwrap();

    assert_eq!(digest, manifest.digest);

    let requests = server.received_requests().await.unwrap();
    let pushed = requests
        .iter()
        .find(|r| r.url.path().ends_with("/manifests/v1.0.0"))
        .unwrap();
    assert_eq!(
        recipes_core::oci::sha256_digest(&pushed.body),
        manifest.digest
    );
}

#[tokio::test]
async fn test_push_skips_existing_blobs() {
    let (_recipe, layout_dir, _manifest) = built_layout();
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/v2/recipes_x_debug/blobs/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2/recipes_x_debug/manifests/v1.0.0"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = RegistryClient::new(RegistryConfig::new(server.uri())).unwrap();
    client
        .push_layout(&layout_dir, "recipes_x_debug", "v1.0.0")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_push_answers_bearer_challenge_once() {
    let (_recipe, layout_dir, _manifest) = built_layout();
    let server = MockServer::start().await;
    let challenge = format!(
        r#"Bearer realm="{}/token",service="registry.test",scope="repository:ctferio/recipes_x_debug:pull,push""#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/token"))
        .and(query_param("service", "registry.test"))
        .and(query_param("scope", "repository:ctferio/recipes_x_debug:pull,push"))
        .and(header("authorization", "Basic Y3RmZXJpbzpwYXQ="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "push-token"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(header("authorization", "Bearer push-token"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2/ctferio/recipes_x_debug/manifests/v1.0.0"))
        .and(header("authorization", "Bearer push-token"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(path_regex(r"^/v2/"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", challenge.as_str()))
        .with_priority(10)
        .mount(&server)
        .await;

    let config = RegistryConfig::new(server.uri())
        .with_namespace("ctferio")
        .with_auth(RegistryAuth::basic("ctferio", "pat"));
    let client = RegistryClient::new(config).unwrap();

    client
        .push_layout(&layout_dir, "recipes_x_debug", "v1.0.0")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_push_rejected_manifest() {
    let (_recipe, layout_dir, _manifest) = built_layout();
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_string("MANIFEST_INVALID"))
        .mount(&server)
        .await;

    let client = RegistryClient::new(RegistryConfig::new(server.uri())).unwrap();
    let err = client
        .push_layout(&layout_dir, "recipes_x_debug", "v1.0.0")
        .await
        .unwrap_err();

    match err {
        RegistryError::ManifestPushFailed { tag, message, .. } => {
            assert_eq!(tag, "v1.0.0");
            assert!(message.contains("MANIFEST_INVALID"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_push_unknown_tag() {
    let (_recipe, layout_dir, _manifest) = built_layout();
    let client = RegistryClient::new(RegistryConfig::new("http://127.0.0.1:1")).unwrap();

    let err = client
        .push_layout(&layout_dir, "recipes_x_debug", "v9.9.9")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidLayout { .. }));
}
