// src/sys/git.rs

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::sys::traits::CommitLog;

pub struct SystemGitLog {
    timeout: Duration,
}

impl SystemGitLog {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommitLog for SystemGitLog {
    async fn latest_message(&self) -> Option<String> {
        let run = Command::new("git")
            .arg("-c").arg("core.hooksPath=/dev/null")
            .env("GIT_TERMINAL_PROMPT", "0")
            .args(["log", "-1", "--pretty=%B"])
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                debug!(error = %e, "git unavailable, treating history as empty");
                return None;
            }
            Err(_) => {
                debug!("git log timed out, treating history as empty");
                return None;
            }
        };

        if !output.status.success() {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr).trim(), "git log failed");
            return None;
        }

        let message = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if message.is_empty() { None } else { Some(message) }
    }
}
