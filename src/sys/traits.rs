// src/sys/traits.rs

use async_trait::async_trait;

use crate::cleanup::model::{RegistryType, VersionRecord};
use crate::error::ApiError;

// ==============================================================================
// 1. Registry Access (GitHub Packages REST API)
// ==============================================================================

#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Verifies that registry credentials are usable. Called once per run, after
    /// the safety guard and before any other registry call.
    async fn check_auth(&self) -> Result<(), ApiError>;

    /// Lightweight existence probe of a version-list endpoint. Returns how many
    /// versions came back on the first page.
    async fn probe(&self, path: &str) -> Result<usize, ApiError>;

    /// Fetches every version behind `path`, decoded for the given registry type.
    async fn list_versions(&self, path: &str, registry: RegistryType) -> Result<Vec<VersionRecord>, ApiError>;

    /// Deletes a single version. `path` is the version-list endpoint.
    async fn delete_version(&self, path: &str, version_id: &str) -> Result<(), ApiError>;
}

// ==============================================================================
// 2. Source Control (latest commit message)
// ==============================================================================

#[async_trait]
pub trait CommitLog: Send + Sync {
    /// Full message of the most recent commit. `None` when there is no history
    /// or git is unavailable; never an error.
    async fn latest_message(&self) -> Option<String>;
}
