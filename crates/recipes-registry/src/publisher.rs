//! Repository upsert and artifact publication.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::client::RegistryClient;
use crate::error::RegistryError;

/// Repository management operations of a hub.
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Returns whether the repository exists in the session namespace.
    async fn repository_exists(&self, name: &str) -> Result<bool, RegistryError>;

    /// Creates the repository in the session namespace.
    async fn create_repository(&self, name: &str) -> Result<(), RegistryError>;
}

/// Publishes OCI layouts to their repositories, creating them on demand.
pub struct Publisher<'a> {
    repositories: &'a dyn RepositoryApi,
    client: &'a RegistryClient,
}

impl<'a> Publisher<'a> {
    /// Creates a publisher.
    #[must_use]
    pub fn new(repositories: &'a dyn RepositoryApi, client: &'a RegistryClient) -> Self {
        Self {
            repositories,
            client,
        }
    }

    /// Creates the repository unless it already exists.
    ///
    /// The check and the creation are not atomic; names are derived from the
    /// recipe so concurrent creators are not expected.
    ///
    /// # Errors
    ///
    /// Returns an error on any unexpected hub answer.
    pub async fn ensure_repository(&self, name: &str) -> Result<(), RegistryError> {
        if self.repositories.repository_exists(name).await? {
            return Ok(());
        }
        self.repositories.create_repository(name).await?;
        info!(repository = name, "Created repository");
        Ok(())
    }

    /// Ensures the repository exists, then pushes the layout tagged `tag`.
    ///
    /// Returns the pushed manifest digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be ensured or the push fails.
    pub async fn publish(
        &self,
        layout_dir: &Path,
        repository: &str,
        tag: &str,
    ) -> Result<String, RegistryError> {
        self.ensure_repository(repository).await?;
        self.client.push_layout(layout_dir, repository, tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct FakeHub {
        repositories: Mutex<BTreeSet<String>>,
        creations: Mutex<usize>,
    }

    #[async_trait]
    impl RepositoryApi for FakeHub {
        async fn repository_exists(&self, name: &str) -> Result<bool, RegistryError> {
            Ok(self.repositories.lock().contains(name))
        }

        async fn create_repository(&self, name: &str) -> Result<(), RegistryError> {
            *self.creations.lock() += 1;
            self.repositories.lock().insert(name.to_string());
            Ok(())
        }
    }

    struct BrokenHub;

    #[async_trait]
    impl RepositoryApi for BrokenHub {
        async fn repository_exists(&self, _name: &str) -> Result<bool, RegistryError> {
            Err(RegistryError::HttpError {
                status: 500,
                message: "boom".to_string(),
            })
        }

        async fn create_repository(&self, _name: &str) -> Result<(), RegistryError> {
            panic!("must not create after a failed check");
        }
    }

    fn client() -> RegistryClient {
        RegistryClient::new(RegistryConfig::new("http://127.0.0.1:1")).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_repository_creates_once() {
        let hub = FakeHub::default();
        let client = client();
        let publisher = Publisher::new(&hub, &client);

        publisher.ensure_repository("recipes_x_y").await.unwrap();
        publisher.ensure_repository("recipes_x_y").await.unwrap();

        assert_eq!(*hub.creations.lock(), 1);
    }

    #[tokio::test]
    async fn test_ensure_repository_propagates_errors() {
        let client = client();
        let publisher = Publisher::new(&BrokenHub, &client);

        let err = publisher.ensure_repository("recipes_x_y").await.unwrap_err();
        assert!(matches!(err, RegistryError::HttpError { status: 500, .. }));
    }
}
