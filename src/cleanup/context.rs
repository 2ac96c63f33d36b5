// src/cleanup/context.rs

use std::sync::OnceLock;

use regex::Regex;

use crate::cleanup::model::{CleanupContext, Outcome};

/// Event signals supplied by the CI system for this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventInfo {
    pub event_name: Option<String>,
    pub ref_name: Option<String>,
    pub pr_number: Option<String>,
    pub commit_message: Option<String>,
}

/// Decides whether the run targets one PR's staging artifacts or falls back to
/// the broad staging pattern. Never touches the network.
pub struct ContextResolver {
    main_branch: String,
}

impl ContextResolver {
    pub fn new(main_branch: impl Into<String>) -> Self {
        Self { main_branch: main_branch.into() }
    }

    pub fn resolve(&self, outcome: Outcome, event: &EventInfo) -> CleanupContext {
        match event.event_name.as_deref() {
            Some("pull_request") | Some("pull_request_target") => {
                let pr = event
                    .pr_number
                    .as_deref()
                    .and_then(parse_pr_number)
                    .or_else(|| event.ref_name.as_deref().and_then(pr_from_merge_ref));
                match pr {
                    Some(n) => CleanupContext::pull_request(outcome, n),
                    None => CleanupContext::unknown(outcome),
                }
            }
            Some("push") if self.is_main(event.ref_name.as_deref()) => {
                let pr = event.commit_message.as_deref().and_then(pr_from_subject);
                CleanupContext::main_branch(outcome, pr)
            }
            _ => CleanupContext::unknown(outcome),
        }
    }

    fn is_main(&self, ref_name: Option<&str>) -> bool {
        match ref_name {
            Some(r) => r.strip_prefix("refs/heads/").unwrap_or(r) == self.main_branch,
            None => false,
        }
    }
}

fn parse_pr_number(raw: &str) -> Option<u64> {
    raw.trim().trim_start_matches('#').parse::<u64>().ok().filter(|n| *n > 0)
}

/// `42/merge` or `refs/pull/42/merge`.
fn pr_from_merge_ref(ref_name: &str) -> Option<u64> {
    let trimmed = ref_name.strip_prefix("refs/pull/").unwrap_or(ref_name);
    let (num, rest) = trimmed.split_once('/')?;
    if rest == "merge" || rest == "head" { parse_pr_number(num) } else { None }
}

/// First `#<digits>` on the subject line of a commit message.
pub fn pr_from_subject(message: &str) -> Option<u64> {
    static PR_REF: OnceLock<Regex> = OnceLock::new();
    let re = PR_REF.get_or_init(|| Regex::new(r"#(\d+)").expect("static regex"));
    let subject = message.lines().next()?;
    re.captures(subject)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_pr_number(m.as_str()))
}
