// src/cleanup/guard.rs
//
// 🛡️ Safety gate: evaluated before credentials are checked or any registry is touched.

/// Commit-message marker that preserves every staging package for this run.
pub const PRESERVE_MARKER: &str = "[preserve-staging]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    pub should_halt: bool,
    pub reason: String,
}

pub struct SafetyGuard<'a> {
    preserve_flag: bool,
    commit_message: Option<&'a str>,
}

impl<'a> SafetyGuard<'a> {
    pub fn new(preserve_flag: bool, commit_message: Option<&'a str>) -> Self {
        Self { preserve_flag, commit_message }
    }

    pub fn check(&self) -> GuardDecision {
        if self.preserve_flag {
            return GuardDecision {
                should_halt: true,
                reason: "preserve flag is set".to_string(),
            };
        }

        let marker_found = self
            .commit_message
            .map(|msg| msg.to_lowercase().contains(PRESERVE_MARKER))
            .unwrap_or(false);

        if marker_found {
            return GuardDecision {
                should_halt: true,
                reason: format!("latest commit message contains {PRESERVE_MARKER}"),
            };
        }

        GuardDecision { should_halt: false, reason: "no preserve signal".to_string() }
    }
}

/// Accepts the usual truthy spellings used in CI environments.
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
