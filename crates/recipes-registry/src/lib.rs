//! # Recipes Registry
//!
//! Publishes recipe OCI layouts to a Docker Hub style registry.
//!
//! ## Features
//!
//! - **Hub session**: one login per run, bearer token kept read-only
//! - **Repository upsert**: existence check, then creation when absent
//! - **OCI Distribution push**: blob upload and manifest push straight from a
//!   local OCI layout, answering registry token challenges
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipes_registry::{HubConfig, HubSession, Publisher, RegistryClient, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = HubSession::login(HubConfig::new("ctferio"), "ctferio", "pat").await?;
//!
//!     let config = RegistryConfig::for_host("docker.io")
//!         .with_namespace("ctferio")
//!         .with_auth(session.registry_auth());
//!     let client = RegistryClient::new(config)?;
//!
//!     let publisher = Publisher::new(&session, &client);
//!     publisher
//!         .publish("chall-manager/debug/dist".as_ref(), "recipes_chall-manager_debug", "v1.0.0")
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Publisher                   │
//! │  ┌────────────────────┐  ┌────────────────┐  │
//! │  │ dyn RepositoryApi  │  │ RegistryClient │  │
//! │  │ (HubSession)       │  │ (OCI push)     │  │
//! │  └────────────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────┘
//!           │                        │
//!           ▼                        ▼
//!   hub.docker.com/v2/      registry-1.docker.io/v2/
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod hub;
mod publisher;

pub use client::RegistryClient;
pub use config::{HubConfig, RegistryAuth, RegistryConfig, DEFAULT_DESCRIPTION, DOCKER_HUB_URL};
pub use error::RegistryError;
pub use hub::HubSession;
pub use publisher::{Publisher, RepositoryApi};
