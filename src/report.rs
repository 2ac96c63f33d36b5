// src/report.rs

use std::fmt::Write as _;

use serde::Serialize;
use tracing::{info, warn};

use crate::cleanup::model::{CleanupContext, CleanupResult, RegistryStatus, RetentionStrategy};

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub matched: usize,
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Run summary: human log lines plus this structure for the calling pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub halted: bool,
    pub reason: String,
    pub context: Option<CleanupContext>,
    pub strategy: Option<RetentionStrategy>,
    pub dry_run: bool,
    pub registries: Vec<CleanupResult>,
    pub totals: Totals,
}

impl Report {
    /// Report for a run the safety guard stopped before any registry call.
    pub fn halted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        info!("🛡️ Staging packages preserved: {}", reason);
        Self {
            halted: true,
            reason,
            context: None,
            strategy: None,
            dry_run: false,
            registries: Vec::new(),
            totals: Totals { matched: 0, attempted: 0, deleted: 0, failed: 0 },
        }
    }

    pub fn emit(mut results: Vec<CleanupResult>, ctx: &CleanupContext) -> Self {
        results.sort_by_key(|r| r.registry);

        let totals = Totals {
            matched: results.iter().map(|r| r.matched).sum(),
            attempted: results.iter().map(|r| r.attempted).sum(),
            deleted: results.iter().map(|r| r.deleted).sum(),
            failed: results.iter().map(|r| r.failed).sum(),
        };
        let dry_run = results.iter().any(|r| r.dry_run);

        info!("Strategy: {}", ctx.describe());
        for r in &results {
            match &r.status {
                RegistryStatus::Cleaned => info!(
                    registry = %r.registry,
                    endpoint = r.endpoint.as_deref().unwrap_or("-"),
                    "{}: matched {}, attempted {}, deleted {}, failed {}",
                    r.package, r.matched, r.attempted, r.deleted, r.failed
                ),
                RegistryStatus::NotFound(detail) => {
                    info!(registry = %r.registry, "{}: nothing to clean up ({})", r.package, detail)
                }
                RegistryStatus::ReadFailed(detail) => {
                    warn!(registry = %r.registry, "{}: could not read versions ({})", r.package, detail)
                }
            }
        }
        info!(
            "Total: matched {}, attempted {}, deleted {}, failed {}{}",
            totals.matched,
            totals.attempted,
            totals.deleted,
            totals.failed,
            if dry_run { " (dry run)" } else { "" }
        );

        Self {
            halted: false,
            reason: ctx.describe(),
            context: Some(*ctx),
            strategy: Some(ctx.strategy()),
            dry_run,
            registries: results,
            totals,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Markdown table for the CI job summary.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Staging package cleanup\n\n");
        if self.halted {
            let _ = writeln!(out, "Skipped: {}", self.reason);
            return out;
        }

        let _ = writeln!(out, "{}{}\n", self.reason, if self.dry_run { " (dry run)" } else { "" });
        out.push_str("| Registry | Package | Status | Matched | Deleted | Failed |\n");
        out.push_str("|---|---|---|---|---|---|\n");
        for r in &self.registries {
            let status = match &r.status {
                RegistryStatus::Cleaned => "cleaned",
                RegistryStatus::NotFound(_) => "not found",
                RegistryStatus::ReadFailed(_) => "read failed",
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                r.registry, r.package, status, r.matched, r.deleted, r.failed
            );
        }
        out
    }
}
