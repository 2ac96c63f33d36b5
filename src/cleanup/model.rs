// src/cleanup/model.rs

use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::error::DeletionError;

/// Number of most recent staging versions kept after a failed run.
pub const KEEP_ON_FAILURE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    Container,
    Npm,
    Maven,
}

impl RegistryType {
    /// Path segment GitHub Packages uses for this package type.
    pub fn package_type(self) -> &'static str {
        match self {
            RegistryType::Container => "container",
            RegistryType::Npm => "npm",
            RegistryType::Maven => "maven",
        }
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package_type())
    }
}

/// One logical staging package and every name it may have been published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    registry: RegistryType,
    name_variants: Vec<String>,
    label: String,
}

impl PackageSpec {
    /// Duplicate variants are dropped, first occurrence wins.
    pub fn new(registry: RegistryType, name_variants: Vec<String>, label: impl Into<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(name_variants.len());
        for name in name_variants {
            if !name.is_empty() && !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { registry, name_variants: unique, label: label.into() }
    }

    pub fn registry(&self) -> RegistryType {
        self.registry
    }

    pub fn name_variants(&self) -> &[String] {
        &self.name_variants
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A version as reported by the registry. Containers carry their tags as labels,
/// npm and maven carry the single version name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub id: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    /// Short human form used in logs and the report.
    pub fn display_label(&self) -> String {
        if self.labels.is_empty() {
            format!("<untagged:{}>", self.id)
        } else {
            self.labels.join(",")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Pr,
    Main,
    Unknown,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Pr => "pr",
            Scope::Main => "main",
            Scope::Unknown => "unknown",
        })
    }
}

/// What this run is cleaning up. Built once, shared read-only by every registry
/// pipeline. Fields are private so the scope/PR invariants hold by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupContext {
    outcome: Outcome,
    scope: Scope,
    pr_number: Option<u64>,
}

impl CleanupContext {
    pub fn pull_request(outcome: Outcome, pr_number: u64) -> Self {
        Self { outcome, scope: Scope::Pr, pr_number: Some(pr_number) }
    }

    pub fn main_branch(outcome: Outcome, pr_number: Option<u64>) -> Self {
        Self { outcome, scope: Scope::Main, pr_number }
    }

    pub fn unknown(outcome: Outcome) -> Self {
        Self { outcome, scope: Scope::Unknown, pr_number: None }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn pr_number(&self) -> Option<u64> {
        self.pr_number
    }

    pub fn strategy(&self) -> RetentionStrategy {
        match self.outcome {
            Outcome::Success => RetentionStrategy::DeleteAll,
            Outcome::Failure => RetentionStrategy::KeepLatest(KEEP_ON_FAILURE),
        }
    }

    /// Operator-facing explanation of which versions are targeted and why.
    pub fn describe(&self) -> String {
        let target = match self.pr_number {
            Some(pr) => format!("staging versions of PR #{pr}"),
            None => "all staging versions (broad match)".to_string(),
        };
        format!(
            "outcome={} scope={} -> {} targeting {}",
            self.outcome,
            self.scope,
            self.strategy(),
            target
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionStrategy {
    DeleteAll,
    KeepLatest(usize),
}

impl fmt::Display for RetentionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetentionStrategy::DeleteAll => f.write_str("full-delete"),
            RetentionStrategy::KeepLatest(n) => write!(f, "keep-last-{n}"),
        }
    }
}

impl Serialize for RetentionStrategy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a single registry's pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RegistryStatus {
    Cleaned,
    NotFound(String),
    ReadFailed(String),
}

/// Per-registry accumulator. Owned by one pipeline, filled by the deletion executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    pub registry: RegistryType,
    pub package: String,
    pub endpoint: Option<String>,
    pub status: RegistryStatus,
    pub matched: usize,
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub planned: Vec<String>,
    pub failures: Vec<DeletionError>,
}

impl CleanupResult {
    pub fn new(registry: RegistryType, package: impl Into<String>) -> Self {
        Self {
            registry,
            package: package.into(),
            endpoint: None,
            status: RegistryStatus::Cleaned,
            matched: 0,
            attempted: 0,
            deleted: 0,
            failed: 0,
            dry_run: false,
            planned: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: RegistryStatus) -> Self {
        self.status = status;
        self
    }
}
