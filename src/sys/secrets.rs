// src/sys/secrets.rs

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

/// RegistryToken is the memory-safe wrapper for the GitHub Packages API token.
///
/// 1. It cannot be accidentally logged (`{:?}` prints `RegistryToken([REDACTED])`).
/// 2. When dropped, the backing allocation is zeroized by `secrecy`.
pub struct RegistryToken {
    token: SecretString,
}

impl RegistryToken {
    /// Blank tokens are treated as absent.
    pub fn from_raw(raw: String) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self { token: SecretString::new(raw) })
    }

    /// Exposes the token for the duration of `action` only, e.g. to inject it
    /// into a child process environment.
    pub fn use_secret<F, R>(&self, action: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        action(self.token.expose_secret())
    }
}

impl fmt::Debug for RegistryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RegistryToken([REDACTED])")
    }
}

/// 🛡️ Redacts anything shaped like a GitHub credential before it reaches a log line.
pub fn scrub_credentials(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(gh[pousr]_[A-Za-z0-9]{16,}|github_pat_[A-Za-z0-9_]{16,}|(?i:bearer)\s+[A-Za-z0-9._\-]+)")
            .expect("static regex")
    });
    re.replace_all(input, "[REDACTED]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_token() {
        let token = RegistryToken::from_raw("ghp_abcdefghijklmnopqrstuvwxyz".into()).unwrap();
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("ghp_"));
        assert_eq!(token.use_secret(|t| t.len()), 30);
    }

    #[test]
    fn blank_token_is_absent() {
        assert!(RegistryToken::from_raw("  ".into()).is_none());
    }

    #[test]
    fn scrubber_redacts_known_shapes() {
        let raw = "HTTP 401: token ghp_0123456789abcdefABCD rejected; Authorization: Bearer abc.def-1";
        let clean = scrub_credentials(raw);
        assert!(!clean.contains("ghp_0123"));
        assert!(!clean.contains("abc.def-1"));
        assert!(clean.contains("HTTP 401"));
    }
}
