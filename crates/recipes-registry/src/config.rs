//! Configuration types for the registry clients.

use std::time::Duration;

/// Docker Hub web API.
pub const DOCKER_HUB_URL: &str = "https://hub.docker.com";

/// Description given to repositories created by the pipeline.
pub const DEFAULT_DESCRIPTION: &str = "Generated from Recipes...";

/// Configuration for the OCI distribution client.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry API base URL (e.g., "<https://registry-1.docker.io>").
    pub url: String,

    /// Registry host used in references (e.g., "docker.io").
    pub host: String,

    /// Namespace prefix for repositories (e.g., "ctferio").
    pub namespace: String,

    /// Authentication configuration.
    pub auth: RegistryAuth,

    /// Request timeout; requests only end on completion or cancellation
    /// when unset.
    pub timeout: Option<Duration>,

    /// User agent string.
    pub user_agent: String,
}

impl RegistryConfig {
    /// Creates a new registry configuration with the given API URL.
    ///
    /// The reference host is derived from the URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use recipes_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::new("https://registry.example.com");
    /// assert_eq!(config.host, "registry.example.com");
    /// ```
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        let host = url
            .split_once("://")
            .map_or(url.as_str(), |(_, rest)| rest)
            .to_string();
        Self {
            url,
            host,
            namespace: String::new(),
            auth: RegistryAuth::None,
            timeout: None,
            user_agent: format!("recipes-registry/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Creates a configuration for a registry host as written in references.
    ///
    /// `docker.io` is served by `registry-1.docker.io`.
    ///
    /// # Examples
    ///
    /// ```
    /// use recipes_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::for_host("docker.io");
    /// assert_eq!(config.url, "https://registry-1.docker.io");
    /// assert_eq!(config.host, "docker.io");
    /// ```
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        let api = if host == "docker.io" {
            "registry-1.docker.io"
        } else {
            host
        };
        let mut config = Self::new(format!("https://{api}"));
        config.host = host.to_string();
        config
    }

    /// Sets the namespace prefix.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: RegistryAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the full repository name.
    ///
    /// # Examples
    ///
    /// ```
    /// use recipes_registry::RegistryConfig;
    ///
    /// let config = RegistryConfig::new("https://registry.example.com")
    ///     .with_namespace("ctferio");
    /// assert_eq!(config.repository_name("recipes_debug"), "ctferio/recipes_debug");
    ///
    /// let config_no_ns = RegistryConfig::new("https://registry.example.com");
    /// assert_eq!(config_no_ns.repository_name("recipes_debug"), "recipes_debug");
    /// ```
    #[must_use]
    pub fn repository_name(&self, repository: &str) -> String {
        if self.namespace.is_empty() {
            repository.to_string()
        } else {
            format!("{}/{}", self.namespace, repository)
        }
    }

    /// Returns the reference `<host>/<namespace>/<repository>:<tag>`.
    #[must_use]
    pub fn reference(&self, repository: &str, tag: &str) -> String {
        format!("{}/{}:{tag}", self.host, self.repository_name(repository))
    }
}

/// Authentication methods for registry access.
#[derive(Debug, Clone)]
pub enum RegistryAuth {
    /// No authentication (for local development).
    None,

    /// Basic authentication (username/password or username/token).
    ///
    /// Also used to answer bearer token challenges.
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// Bearer token authentication.
    Bearer {
        /// Token value.
        token: String,
    },
}

impl RegistryAuth {
    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }
}

/// Configuration for the hub (repository management) API.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hub API base URL.
    pub url: String,

    /// Namespace owning the repositories.
    pub namespace: String,

    /// Registry identifier sent on repository creation.
    pub registry: String,

    /// Description of created repositories.
    pub description: String,

    /// Whether created repositories are private.
    pub private: bool,

    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: DOCKER_HUB_URL.to_string(),
            namespace: String::new(),
            registry: "docker".to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            private: false,
            timeout: None,
        }
    }
}

impl HubConfig {
    /// Creates a hub configuration for a namespace on Docker Hub.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Sets the hub API base URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
