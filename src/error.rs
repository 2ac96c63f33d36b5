// src/error.rs

use std::time::Duration;

use thiserror::Error;

/// Top-level error taxonomy for a cleanup run.
///
/// Fatal kinds abort the run before (or instead of) any destructive call and map
/// to exit code 1. `PackageNotFound` and `Registry` are per-registry and end up
/// in the report instead.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("configuration is incomplete, missing: {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("configuration document {path} is unreadable: {reason}")]
    ConfigDocument { path: String, reason: String },

    #[error("registry authentication unavailable: {0}")]
    Authentication(String),

    #[error("package {package} not found, tried: {}", .attempted.join(", "))]
    PackageNotFound {
        package: String,
        attempted: Vec<String>,
    },

    #[error("registry read failed: {0}")]
    Registry(String),

    #[error("cleanup run exceeded {0:?}")]
    Timeout(Duration),
}

impl CleanupError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CleanupError::Configuration { .. }
                | CleanupError::ConfigDocument { .. }
                | CleanupError::Authentication(_)
                | CleanupError::Timeout(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() { 1 } else { 0 }
    }
}

/// Failure of a single `gh` invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("exited with code {code}: {stderr}")]
    Status { code: i32, stderr: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the registry answered that the path does not exist. Anything
    /// else (timeouts, spawn failures, 5xx) says nothing about the package.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Status { stderr, .. } => stderr.contains("HTTP 404") || stderr.contains("Not Found"),
            _ => false,
        }
    }
}

/// One version that could not be deleted. Counted, logged and reported; never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize)]
#[error("failed to delete version {id} ({label}): {reason}")]
pub struct DeletionError {
    pub id: String,
    pub label: String,
    pub reason: String,
}
