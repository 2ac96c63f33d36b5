// src/cleanup/selector.rs
//
// Pure selection over already-fetched versions: staging match filter, then the
// outcome-dependent retention rule. No I/O lives here.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::cleanup::model::{CleanupContext, RetentionStrategy, VersionRecord};

fn pr_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|[^a-z0-9])pr[-._]?(\d+)").expect("static regex"))
}

fn staging_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:^|[^a-z0-9])(?:staging|snapshot)(?:$|[^a-z0-9])").expect("static regex")
    })
}

/// Every PR number referenced by any of the labels.
pub fn referenced_prs(labels: &[String]) -> BTreeSet<u64> {
    labels
        .iter()
        .flat_map(|label| pr_token().captures_iter(label))
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<u64>().ok()))
        .collect()
}

/// Matches only versions that reference `pr` and no other PR. A version tagged
/// for two PRs is left alone so one PR's run can never remove another's artifact.
pub fn matches_pr(record: &VersionRecord, pr: u64) -> bool {
    let prs = referenced_prs(&record.labels);
    prs.contains(&pr) && prs.len() == 1
}

/// Any PR-shaped label, or a delimited `staging` / `snapshot` token.
pub fn matches_broad(record: &VersionRecord) -> bool {
    record
        .labels
        .iter()
        .any(|label| pr_token().is_match(label) || staging_token().is_match(label))
}

/// PR-specific when the context knows the PR, broad otherwise.
pub fn is_staging(record: &VersionRecord, ctx: &CleanupContext) -> bool {
    match ctx.pr_number() {
        Some(pr) => matches_pr(record, pr),
        None => matches_broad(record),
    }
}

pub fn staging_matches(versions: &[VersionRecord], ctx: &CleanupContext) -> Vec<VersionRecord> {
    versions.iter().filter(|v| is_staging(v, ctx)).cloned().collect()
}

/// Applies the retention rule to a match set. Ties on `created_at` keep their
/// input order, so the kept set is deterministic for a given listing.
pub fn apply_retention(mut matches: Vec<VersionRecord>, strategy: RetentionStrategy) -> Vec<VersionRecord> {
    match strategy {
        RetentionStrategy::DeleteAll => matches,
        RetentionStrategy::KeepLatest(keep) => {
            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            if matches.len() <= keep {
                return Vec::new();
            }
            matches.split_off(keep)
        }
    }
}

/// Delete-list for one registry.
pub fn select(versions: &[VersionRecord], ctx: &CleanupContext) -> Vec<VersionRecord> {
    apply_retention(staging_matches(versions, ctx), ctx.strategy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::model::Outcome;
    use chrono::{Duration, TimeZone, Utc};

    fn version(id: u32, labels: &[&str], age_hours: i64) -> VersionRecord {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        VersionRecord {
            id: id.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            created_at: base - Duration::hours(age_hours),
        }
    }

    fn ids(records: &[VersionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn pr_success_deletes_only_that_pr() {
        let versions = vec![
            version(1, &["pr-42"], 1),
            version(2, &["pr-43"], 2),
            version(3, &["latest"], 3),
        ];
        let ctx = CleanupContext::pull_request(Outcome::Success, 42);
        let picked = select(&versions, &ctx);
        assert_eq!(ids(&picked), vec!["1"]);
    }

    #[test]
    fn pr_match_respects_number_boundaries() {
        let ctx = CleanupContext::pull_request(Outcome::Success, 42);
        let versions = vec![
            version(1, &["pr-142"], 1),
            version(2, &["pr-420"], 1),
            version(3, &["apr-42"], 1),
            version(4, &["1.4.0-pr.42.3"], 1),
            version(5, &["0.0.0-PR42-abc123"], 1),
            version(6, &["sdk_pr_42"], 1),
        ];
        assert_eq!(ids(&select(&versions, &ctx)), vec!["4", "5", "6"]);
    }

    #[test]
    fn pr_match_never_selects_other_prs() {
        let versions = vec![
            version(1, &["pr-7"], 1),
            version(2, &["pr-8", "pr-7"], 1),
            version(3, &["pr-70"], 1),
            version(4, &["1.0.0-pr.77"], 1),
            version(5, &["staging"], 1),
            version(6, &[], 1),
        ];
        for pr in [7u64, 8, 70, 77, 1] {
            let ctx = CleanupContext::pull_request(Outcome::Success, pr);
            for picked in staging_matches(&versions, &ctx) {
                let prs = referenced_prs(&picked.labels);
                assert!(prs.iter().all(|n| *n == pr), "pr {pr} picked {:?}", picked.labels);
            }
        }
    }

    #[test]
    fn broad_match_without_pr_number() {
        let ctx = CleanupContext::unknown(Outcome::Success);
        let versions = vec![
            version(1, &["pr-1"], 1),
            version(2, &["1.0.0-staging.4"], 1),
            version(3, &["2.0.0-SNAPSHOT"], 1),
            version(4, &["latest", "v1.2.0"], 1),
            version(5, &["prerelease"], 1),
            version(6, &[], 1),
            version(7, &["backstaging"], 1),
        ];
        assert_eq!(ids(&select(&versions, &ctx)), vec!["1", "2", "3"]);
    }

    #[test]
    fn success_deletes_every_match_and_is_idempotent() {
        let ctx = CleanupContext::main_branch(Outcome::Success, None);
        let versions: Vec<_> = (0..9).map(|i| version(i, &["1.0.0-staging"], i as i64)).collect();
        assert_eq!(select(&versions, &ctx).len(), 9);

        let remaining: Vec<VersionRecord> = Vec::new();
        assert!(select(&remaining, &ctx).is_empty());
        assert!(select(&remaining, &ctx).is_empty());
    }

    #[test]
    fn failure_keeps_five_newest_of_seven() {
        let ctx = CleanupContext::unknown(Outcome::Failure);
        // newest first: id 1 is the most recent
        let versions: Vec<_> = (1..=7)
            .map(|i| version(i, &[format!("0.0.{i}-staging").as_str()], i as i64))
            .collect();
        let picked = select(&versions, &ctx);
        assert_eq!(ids(&picked), vec!["6", "7"]);
    }

    #[test]
    fn failure_with_few_matches_deletes_nothing() {
        let ctx = CleanupContext::pull_request(Outcome::Failure, 3);
        for n in 0..=5u32 {
            let versions: Vec<_> = (0..n).map(|i| version(i, &["pr-3"], i as i64)).collect();
            assert!(select(&versions, &ctx).is_empty());
        }
    }

    #[test]
    fn failure_excludes_exactly_min_five() {
        let ctx = CleanupContext::unknown(Outcome::Failure);
        for n in 0..12u32 {
            let versions: Vec<_> = (0..n)
                .map(|i| version(i, &["pr-9"], ((i * 7) % 11) as i64))
                .collect();
            let matches = staging_matches(&versions, &ctx);
            let picked = select(&versions, &ctx);
            assert_eq!(picked.len(), matches.len() - matches.len().min(5));

            let oldest_kept = {
                let mut sorted = matches.clone();
                sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                sorted.into_iter().take(5).map(|v| v.created_at).min()
            };
            if let Some(cutoff) = oldest_kept {
                assert!(picked.iter().all(|v| v.created_at <= cutoff));
            }
        }
    }

    #[test]
    fn ties_resolve_by_listing_order() {
        let ctx = CleanupContext::unknown(Outcome::Failure);
        let versions: Vec<_> = (1..=7).map(|i| version(i, &["pr-1"], 0)).collect();
        let first = select(&versions, &ctx);
        let second = select(&versions, &ctx);
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["6", "7"]);
    }
}
