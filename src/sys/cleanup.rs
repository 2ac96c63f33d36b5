// src/sys/cleanup.rs

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::cleanup::model::{CleanupResult, VersionRecord};
use crate::error::DeletionError;
use crate::sys::traits::RegistryApi;

/// Issues one delete per selected version. Individual failures are logged and
/// counted; every entry is attempted exactly once regardless of earlier failures.
pub struct DeletionExecutor<'a> {
    api: &'a dyn RegistryApi,
    concurrency: usize,
    dry_run: bool,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(api: &'a dyn RegistryApi, concurrency: usize, dry_run: bool) -> Self {
        Self { api, concurrency: concurrency.max(1), dry_run }
    }

    pub async fn execute(&self, endpoint: &str, to_delete: &[VersionRecord], mut result: CleanupResult) -> CleanupResult {
        result.endpoint = Some(endpoint.to_string());
        result.dry_run = self.dry_run;
        result.planned = to_delete.iter().map(VersionRecord::display_label).collect();

        if self.dry_run {
            for version in to_delete {
                info!(registry = %result.registry, id = %version.id, label = %version.display_label(), "dry run: would delete");
            }
            return result;
        }

        // 1. Fan the deletes out over a bounded pool, collecting every outcome
        let outcomes: Vec<(&VersionRecord, Result<(), String>)> = stream::iter(to_delete)
            .map(|version| async move {
                let outcome = self
                    .api
                    .delete_version(endpoint, &version.id)
                    .await
                    .map_err(|e| e.to_string());
                (version, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // 2. Tally. A stubborn version never stops its siblings
        for (version, outcome) in outcomes {
            result.attempted += 1;
            match outcome {
                Ok(()) => {
                    result.deleted += 1;
                    info!(registry = %result.registry, id = %version.id, label = %version.display_label(), "deleted");
                }
                Err(reason) => {
                    result.failed += 1;
                    warn!(registry = %result.registry, id = %version.id, error = %reason, "failed to delete version");
                    result.failures.push(DeletionError {
                        id: version.id.clone(),
                        label: version.display_label(),
                        reason,
                    });
                }
            }
        }

        // Pool completion order is arbitrary; keep the report stable
        result.failures.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }
}
