//! Hub session: login and repository management.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{HubConfig, RegistryAuth};
use crate::error::RegistryError;
use crate::publisher::RepositoryApi;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct CreateRepository<'a> {
    registry: &'a str,
    namespace: &'a str,
    is_private: bool,
    name: &'a str,
    description: &'a str,
}

/// An authenticated handle on the hub API, scoped to one login.
///
/// The bearer token is read-only after [`HubSession::login`].
pub struct HubSession {
    config: HubConfig,
    http: reqwest::Client,
    username: String,
    password: String,
    token: String,
}

impl HubSession {
    /// Logs in with `username` and `password`.
    ///
    /// # Errors
    ///
    /// Fails before any request if a credential is empty, and returns an
    /// [`RegistryError::AuthenticationFailed`] unless the hub answers 200
    /// with a token.
    pub async fn login(
        config: HubConfig,
        username: &str,
        password: &str,
    ) -> Result<Self, RegistryError> {
        if username.is_empty() || password.is_empty() {
            return Err(RegistryError::AuthenticationFailed {
                message: "empty credentials".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|source| RegistryError::ConnectionFailed {
                url: config.url.clone(),
                source,
            })?;

        let url = format!("{}/v2/users/login/", config.url);
        let response = http
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(RegistryError::AuthenticationFailed {
                message: format!(
                    "login returned {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let LoginResponse { token } = response.json::<LoginResponse>().await?;
        info!(hub = %config.url, username, "Logged in");

        Ok(Self {
            config,
            http,
            username: username.to_string(),
            password: password.to_string(),
            token,
        })
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Returns the session bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the credentials to present to the registry on push.
    #[must_use]
    pub fn registry_auth(&self) -> RegistryAuth {
        RegistryAuth::basic(&self.username, &self.password)
    }

    fn repository_url(&self, name: &str) -> String {
        format!(
            "{}/v2/repositories/{}/{name}/",
            self.config.url, self.config.namespace
        )
    }
}

impl std::fmt::Debug for HubSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSession")
            .field("config", &self.config)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RepositoryApi for HubSession {
    async fn repository_exists(&self, name: &str) -> Result<bool, RegistryError> {
        let response = self
            .http
            .get(self.repository_url(name))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RegistryError::HttpError {
                status: status.as_u16(),
                message: format!(
                    "checking repository {name}: {}",
                    response.text().await.unwrap_or_default()
                ),
            }),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<(), RegistryError> {
        let body = CreateRepository {
            registry: &self.config.registry,
            namespace: &self.config.namespace,
            is_private: self.config.private,
            name,
            description: &self.config.description,
        };

        let response = self
            .http
            .post(format!("{}/v2/repositories/", self.config.url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(RegistryError::HttpError {
                status: response.status().as_u16(),
                message: format!(
                    "creating repository {name}: {}",
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        debug!(namespace = %self.config.namespace, name, "Created repository");
        Ok(())
    }
}
