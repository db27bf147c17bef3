//! OCI Distribution API client pushing local layouts.
//!
//! Requests first go out with the configured credentials. A `401` carrying a
//! `Bearer` challenge is answered by fetching a token from the challenge
//! realm; the token is cached per repository and the request replayed once.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use recipes_core::{Descriptor, OciLayout};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{RegistryAuth, RegistryConfig};
use crate::error::RegistryError;

/// Client for pushing OCI layouts to a distribution registry.
#[derive(Debug)]
pub struct RegistryClient {
    config: RegistryConfig,
    http: reqwest::Client,
    tokens: Mutex<HashMap<String, String>>,
}

impl RegistryClient {
    /// Creates a new registry client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use recipes_registry::{RegistryClient, RegistryConfig};
    ///
    /// let config = RegistryConfig::for_host("docker.io").with_namespace("ctferio");
    /// let client = RegistryClient::new(config)?;
    /// # Ok::<(), recipes_registry::RegistryError>(())
    /// ```
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|source| RegistryError::ConnectionFailed {
                url: config.url.clone(),
                source,
            })?;

        Ok(Self {
            config,
            http,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Pushes the manifest tagged `tag` in the layout at `layout_dir`, with
    /// every blob it references, to `<namespace>/<repository>:<tag>`.
    ///
    /// Blobs already present remotely are skipped. The manifest is sent with
    /// its exact local bytes so its digest is preserved. Returns that digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is unreadable or a request fails.
    pub async fn push_layout(
        &self,
        layout_dir: &Path,
        repository: &str,
        tag: &str,
    ) -> Result<String, RegistryError> {
        let invalid = |source| RegistryError::InvalidLayout {
            path: layout_dir.to_path_buf(),
            source,
        };

        let layout = OciLayout::open(layout_dir).map_err(invalid)?;
        let root = layout.resolve(tag).map_err(invalid)?;
        let manifest = layout.manifest(&root).map_err(invalid)?;
        let repo = self.config.repository_name(repository);

        for desc in manifest.references() {
            if self.blob_exists(&repo, desc).await? {
                debug!(repository = %repo, digest = %desc.digest, "Blob already present");
                continue;
            }
            let content = layout.fetch(desc).map_err(invalid)?;
            self.upload_blob(&repo, &desc.digest, content).await?;
        }

        let raw = layout.fetch(&root).map_err(invalid)?;
        self.push_manifest(&repo, tag, root.media_type.as_str(), raw)
            .await?;

        info!(
            reference = %self.config.reference(repository, tag),
            digest = %root.digest,
            "Pushed artifact"
        );
        Ok(root.digest)
    }

    async fn blob_exists(&self, repo: &str, desc: &Descriptor) -> Result<bool, RegistryError> {
        let url = format!("{}/v2/{repo}/blobs/{}", self.config.url, desc.digest);
        let response = self.send(repo, || self.http.head(&url)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RegistryError::HttpError {
                status: status.as_u16(),
                message: format!("checking blob {}", desc.digest),
            }),
        }
    }

    async fn upload_blob(
        &self,
        repo: &str,
        digest: &str,
        content: Vec<u8>,
    ) -> Result<(), RegistryError> {
        let start_url = format!("{}/v2/{repo}/blobs/uploads/", self.config.url);
        let response = self.send(repo, || self.http.post(&start_url)).await?;

        if !response.status().is_success() {
            return Err(RegistryError::UploadFailed {
                digest: digest.to_string(),
                message: format!("starting upload: {}", response.status()),
            });
        }

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::UploadFailed {
                digest: digest.to_string(),
                message: "no upload location returned".to_string(),
            })?;
        let upload_url = self.upload_url(location, digest)?;

        let size = content.len();
        let response = self
            .send(repo, || {
                self.http
                    .put(upload_url.clone())
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(content.clone())
            })
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::UploadFailed {
                digest: digest.to_string(),
                message: format!(
                    "{}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        debug!(repository = %repo, digest, size, "Uploaded blob");
        Ok(())
    }

    async fn push_manifest(
        &self,
        repo: &str,
        tag: &str,
        media_type: &str,
        raw: Vec<u8>,
    ) -> Result<(), RegistryError> {
        let url = format!("{}/v2/{repo}/manifests/{tag}", self.config.url);
        let response = self
            .send(repo, || {
                self.http
                    .put(&url)
                    .header(CONTENT_TYPE, media_type)
                    .body(raw.clone())
            })
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::ManifestPushFailed {
                repository: repo.to_string(),
                tag: tag.to_string(),
                message: format!(
                    "{}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        Ok(())
    }

    /// Resolves an upload `Location` against the registry URL and appends the
    /// blob digest to its query.
    fn upload_url(&self, location: &str, digest: &str) -> Result<Url, RegistryError> {
        let mut url = Url::parse(&self.config.url)
            .and_then(|base| base.join(location))
            .map_err(|_| RegistryError::InvalidUrl {
                url: location.to_string(),
            })?;
        url.query_pairs_mut().append_pair("digest", digest);
        Ok(url)
    }

    /// Sends a request, answering one bearer challenge if the registry asks.
    async fn send(
        &self,
        repo: &str,
        build: impl Fn() -> RequestBuilder + Send,
    ) -> Result<Response, RegistryError> {
        let response = build().headers(self.auth_headers(repo)?).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(challenge) = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(BearerChallenge::parse)
        else {
            return Err(RegistryError::AuthenticationFailed {
                message: format!("registry rejected credentials for {repo}"),
            });
        };

        let token = self.fetch_token(&challenge).await?;
        self.tokens.lock().insert(repo.to_string(), token);

        let response = build().headers(self.auth_headers(repo)?).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(RegistryError::AuthenticationFailed {
                message: format!("token for {repo} was rejected"),
            });
        }
        Ok(response)
    }

    async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<String, RegistryError> {
        let mut request = self.http.get(&challenge.realm);
        if let Some(service) = &challenge.service {
            request = request.query(&[("service", service)]);
        }
        if let Some(scope) = &challenge.scope {
            request = request.query(&[("scope", scope)]);
        }

        let response = request.headers(self.credential_headers()?).send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::AuthenticationFailed {
                message: format!("token endpoint returned {}", response.status()),
            });
        }

        let body: TokenResponse = response.json().await?;
        body.token
            .or(body.access_token)
            .ok_or_else(|| RegistryError::AuthenticationFailed {
                message: "token endpoint returned no token".to_string(),
            })
    }

    /// Headers for a request on `repo`: a cached token, else the configured
    /// credentials.
    fn auth_headers(&self, repo: &str) -> Result<HeaderMap, RegistryError> {
        if let Some(token) = self.tokens.lock().get(repo) {
            return bearer_headers(token);
        }
        self.credential_headers()
    }

    fn credential_headers(&self) -> Result<HeaderMap, RegistryError> {
        match &self.config.auth {
            RegistryAuth::None => Ok(HeaderMap::new()),
            RegistryAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                let mut headers = HeaderMap::new();
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|_| {
                        RegistryError::AuthenticationFailed {
                            message: "Invalid credentials".to_string(),
                        }
                    })?,
                );
                Ok(headers)
            }
            RegistryAuth::Bearer { token } => bearer_headers(token),
        }
    }
}

fn bearer_headers(token: &str) -> Result<HeaderMap, RegistryError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            RegistryError::AuthenticationFailed {
                message: "Invalid token".to_string(),
            }
        })?,
    );
    Ok(headers)
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        for param in split_params(params) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        Some(Self {
            realm: realm?,
            service,
            scope,
        })
    }
}

/// Splits on commas outside double quotes.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
