// src/sys/gh.rs
//
// GitHub Packages access through the `gh` CLI. Every call is a discrete argv
// (no shell), bounded by a timeout, with the token injected via GH_TOKEN.
// Version listings are walked one page per call.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::cleanup::model::{RegistryType, VersionRecord};
use crate::error::ApiError;
use crate::sys::secrets::{RegistryToken, scrub_credentials};
use crate::sys::traits::RegistryApi;

const ACCEPT_HEADER: &str = "Accept: application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version: 2022-11-28";
/// Largest page the packages API serves.
const PAGE_SIZE: usize = 100;

pub struct GhCliRegistry {
    binary: String,
    token: Option<RegistryToken>,
    call_timeout: Duration,
}

impl GhCliRegistry {
    pub fn new(binary: String, token: Option<RegistryToken>, call_timeout: Duration) -> Self {
        Self { binary, token, call_timeout }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ApiError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .env("GH_PROMPT_DISABLED", "1")
            .env("NO_COLOR", "1")
            .kill_on_drop(true);

        if let Some(token) = &self.token {
            token.use_secret(|t| {
                cmd.env("GH_TOKEN", t);
            });
        }

        debug!(program = %self.binary, args = ?args, "spawning");

        let output = tokio::time::timeout(self.call_timeout, cmd.output())
            .await
            .map_err(|_| ApiError::Timeout(self.call_timeout))?
            .map_err(|e| ApiError::Spawn {
                program: self.binary.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::Status {
                code: output.status.code().unwrap_or(-1),
                stderr: scrub_credentials(stderr.trim()),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl RegistryApi for GhCliRegistry {
    async fn check_auth(&self) -> Result<(), ApiError> {
        self.run(&["auth", "status"]).await.map(|_| ())
    }

    async fn probe(&self, path: &str) -> Result<usize, ApiError> {
        let url = format!("{path}?per_page=1");
        let body = self.run(&["api", "-H", ACCEPT_HEADER, "-H", API_VERSION_HEADER, &url]).await?;
        let page: Vec<serde_json::Value> =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(page.len())
    }

    /// One `gh api` call per page, so each page gets the full call timeout
    /// instead of the whole listing sharing one.
    async fn list_versions(&self, path: &str, registry: RegistryType) -> Result<Vec<VersionRecord>, ApiError> {
        collect_pages(registry, |page| async move {
            let url = format!("{path}?per_page={PAGE_SIZE}&page={page}");
            self.run(&["api", "-H", ACCEPT_HEADER, "-H", API_VERSION_HEADER, &url]).await
        })
        .await
    }

    async fn delete_version(&self, path: &str, version_id: &str) -> Result<(), ApiError> {
        let url = format!("{path}/{version_id}");
        self.run(&["api", "-X", "DELETE", "-H", ACCEPT_HEADER, "-H", API_VERSION_HEADER, &url])
            .await
            .map(|_| ())
    }
}

// ==============================================================================
// Response decoding
// ==============================================================================

#[derive(Debug, Deserialize)]
struct RawVersion {
    id: u64,
    name: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    container: Option<RawContainer>,
}

#[derive(Debug, Deserialize)]
struct RawContainer {
    #[serde(default)]
    tags: Vec<String>,
}

impl RawVersion {
    fn into_record(self, registry: RegistryType) -> VersionRecord {
        let labels = match registry {
            RegistryType::Container => self
                .metadata
                .and_then(|m| m.container)
                .map(|c| c.tags)
                .unwrap_or_default(),
            RegistryType::Npm | RegistryType::Maven => vec![self.name],
        };
        VersionRecord { id: self.id.to_string(), labels, created_at: self.created_at }
    }
}

/// Walks pages from 1 until one comes back short. Any failed page fails the
/// whole listing; a partial list would skew retention.
async fn collect_pages<F, Fut>(registry: RegistryType, mut fetch: F) -> Result<Vec<VersionRecord>, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, ApiError>>,
{
    let mut records = Vec::new();
    let mut page = 1;
    loop {
        let body = fetch(page).await?;
        let batch = decode_versions(&body, registry)?;
        let full = batch.len() >= PAGE_SIZE;
        debug!(%registry, page, count = batch.len(), "version page");
        records.extend(batch);
        if !full {
            return Ok(records);
        }
        page += 1;
    }
}

/// The body may hold several JSON arrays back to back, so it is decoded as a
/// stream of arrays rather than a single document.
pub fn decode_versions(body: &[u8], registry: RegistryType) -> Result<Vec<VersionRecord>, ApiError> {
    let mut records = Vec::new();
    for page in serde_json::Deserializer::from_slice(body).into_iter::<Vec<RawVersion>>() {
        let page = page.map_err(|e| ApiError::Decode(e.to_string()))?;
        records.extend(page.into_iter().map(|raw| raw.into_record(registry)));
    }
    Ok(records)
}
