// src/config.rs

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::Value;

use crate::cleanup::context::EventInfo;
use crate::cleanup::guard::parse_flag;
use crate::cleanup::model::{PackageSpec, RegistryType};
use crate::error::CleanupError;
use crate::sys::secrets::RegistryToken;

pub const DEFAULT_CONFIG_PATH: &str = "config/staging-packages.json";
pub const CONFIG_PATH_VAR: &str = "STAGING_CONFIG_PATH";
const OVERRIDE_PREFIX: &str = "STAGING_";

// ==============================================================================
// 1. Package Naming (document + overrides)
// ==============================================================================

/// One naming field: where it lives in the document and which override wins over it.
struct Field {
    key: &'static str,
    env: &'static str,
}

const ANDROID_GROUP_ID: Field = Field { key: "android.groupId", env: "STAGING_ANDROID_GROUP_ID" };
const ANDROID_ARTIFACT_ID: Field = Field { key: "android.artifactId", env: "STAGING_ANDROID_ARTIFACT_ID" };
const ANDROID_SUFFIX: Field = Field { key: "android.stagingSuffix", env: "STAGING_ANDROID_SUFFIX" };
const NPM_SCOPE: Field = Field { key: "npm.scope", env: "STAGING_NPM_SCOPE" };
const NPM_PACKAGE: Field = Field { key: "npm.packageName", env: "STAGING_NPM_PACKAGE" };
const NPM_SUFFIX: Field = Field { key: "npm.stagingSuffix", env: "STAGING_NPM_SUFFIX" };
const AUTHOR_ID: Field = Field { key: "author.id", env: "STAGING_AUTHOR_ID" };
const DOCKER_IMAGES: Field = Field { key: "docker.images", env: "STAGING_DOCKER_IMAGES" };
const DOCKER_SUFFIX: Field = Field { key: "docker.stagingSuffix", env: "STAGING_DOCKER_SUFFIX" };

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageNamingConfig {
    pub android_group_id: String,
    pub android_artifact_id: String,
    pub android_suffix: String,
    pub npm_scope: String,
    pub npm_package: String,
    pub npm_suffix: String,
    pub author_id: String,
    pub docker_images: Vec<String>,
    pub docker_suffix: String,
}

impl PackageNamingConfig {
    /// Reads the naming document (path from `STAGING_CONFIG_PATH` in `overrides`,
    /// else the default) and applies overrides. A missing document counts as empty.
    pub fn load(overrides: &HashMap<String, String>) -> Result<Self, CleanupError> {
        let path = overrides
            .get(CONFIG_PATH_VAR)
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_CONFIG_PATH);

        let document = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Value>(&raw).map_err(|e| CleanupError::ConfigDocument {
                path: path.to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Value::Null,
            Err(e) => {
                return Err(CleanupError::ConfigDocument { path: path.to_string(), reason: e.to_string() });
            }
        };

        Self::from_document(&document, overrides)
    }

    /// Resolves every field, collecting all missing ones into a single error.
    pub fn from_document(document: &Value, overrides: &HashMap<String, String>) -> Result<Self, CleanupError> {
        let mut missing = Vec::new();
        let mut required = |field: &Field| -> String {
            match lookup(document, overrides, field) {
                Some(v) => v,
                None => {
                    missing.push(field.key.to_string());
                    String::new()
                }
            }
        };

        let android_group_id = required(&ANDROID_GROUP_ID);
        let android_artifact_id = required(&ANDROID_ARTIFACT_ID);
        let android_suffix = required(&ANDROID_SUFFIX);
        let npm_scope = required(&NPM_SCOPE);
        let npm_package = required(&NPM_PACKAGE);
        let npm_suffix = required(&NPM_SUFFIX);
        let author_id = required(&AUTHOR_ID);

        if !missing.is_empty() {
            return Err(CleanupError::Configuration { missing });
        }

        let docker_images = match overrides.get(DOCKER_IMAGES.env) {
            Some(list) => split_list(list),
            None => match path_value(document, DOCKER_IMAGES.key) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                Some(Value::String(list)) => split_list(list),
                _ => Vec::new(),
            },
        };

        Ok(Self {
            android_group_id,
            android_artifact_id,
            android_suffix,
            npm_scope: normalize_scope(&npm_scope),
            npm_package,
            npm_suffix,
            author_id,
            docker_images,
            docker_suffix: lookup(document, overrides, &DOCKER_SUFFIX).unwrap_or_default(),
        })
    }

    /// Fully-qualified staging packages: one per configured docker image, then
    /// npm and maven. `repository` is `owner/repo` and adds repo-scoped container names.
    pub fn package_specs(&self, repository: Option<&str>) -> Vec<PackageSpec> {
        let repo_name = repository.and_then(|r| r.split_once('/')).map(|(_, name)| name);

        // Container: configured images, or the npm base name when none are set
        let images = if self.docker_images.is_empty() {
            vec![self.npm_package.clone()]
        } else {
            self.docker_images.clone()
        };
        let mut specs: Vec<PackageSpec> = images
            .iter()
            .map(|image| {
                let name = format!("{}{}", image, self.docker_suffix);
                let mut variants = vec![name.clone()];
                if let Some(repo) = repo_name {
                    variants.push(format!("{repo}/{name}"));
                }
                PackageSpec::new(RegistryType::Container, variants, format!("container {name}"))
            })
            .collect();

        let npm_name = format!("{}{}", self.npm_package, self.npm_suffix);
        let artifact = format!("{}{}", self.android_artifact_id, self.android_suffix);

        specs.extend([
            PackageSpec::new(
                RegistryType::Npm,
                vec![npm_name.clone(), format!("{}/{}", self.npm_scope, npm_name)],
                format!("npm {}/{}", self.npm_scope, npm_name),
            ),
            PackageSpec::new(
                RegistryType::Maven,
                vec![
                    format!("{}.{}", self.android_group_id, artifact),
                    format!("{}:{}", self.android_group_id, artifact),
                    artifact.clone(),
                ],
                format!("maven {}:{}", self.android_group_id, artifact),
            ),
        ]);
        specs
    }
}

fn lookup(document: &Value, overrides: &HashMap<String, String>, field: &Field) -> Option<String> {
    if let Some(v) = overrides.get(field.env).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    match path_value(document, field.key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Dotted-path lookup into a nested JSON object.
fn path_value<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(document, |node, part| node.get(part))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn normalize_scope(scope: &str) -> String {
    if scope.starts_with('@') { scope.to_string() } else { format!("@{scope}") }
}

// ==============================================================================
// 2. Run Environment (CI-provided signals)
// ==============================================================================

#[derive(Debug)]
pub struct RunEnv {
    pub token: Option<RegistryToken>,
    pub owner_override: Option<String>,
    pub repository: Option<String>,
    pub preserve: bool,
    pub event: EventInfo,
    pub main_branch: String,
    pub step_summary: Option<PathBuf>,
    pub gh_binary: String,
    /// `STAGING_*` variables handed to `PackageNamingConfig::load`. Nothing else
    /// from the process environment is retained, credentials in particular.
    pub overrides: HashMap<String, String>,
}

impl RunEnv {
    pub fn load() -> Self {
        Self::from_vars(env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = get("GH_TOKEN")
            .or_else(|| get("GITHUB_TOKEN"))
            .and_then(RegistryToken::from_raw);

        Self {
            token,
            owner_override: get("STAGING_REPOSITORY_OWNER").or_else(|| get("GITHUB_REPOSITORY_OWNER")),
            repository: get("GITHUB_REPOSITORY"),
            preserve: parse_flag(vars.get("PRESERVE_STAGING_PACKAGES").map(String::as_str)),
            event: EventInfo {
                event_name: get("GITHUB_EVENT_NAME"),
                ref_name: get("GITHUB_REF_NAME"),
                pr_number: get("PR_NUMBER").or_else(|| get("GITHUB_PR_NUMBER")),
                commit_message: get("HEAD_COMMIT_MESSAGE"),
            },
            main_branch: get("STAGING_MAIN_BRANCH").unwrap_or_else(|| "main".to_string()),
            step_summary: get("GITHUB_STEP_SUMMARY").map(PathBuf::from),
            gh_binary: get("GH_BINARY").unwrap_or_else(|| "gh".to_string()),
            overrides: vars.into_iter().filter(|(key, _)| key.starts_with(OVERRIDE_PREFIX)).collect(),
        }
    }

    /// CLI argument, then environment override, then the configured author id.
    pub fn resolve_owner(&self, cli_owner: Option<&str>, naming: &PackageNamingConfig) -> Result<String, CleanupError> {
        cli_owner
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .or_else(|| self.owner_override.clone())
            .or_else(|| Some(naming.author_id.clone()).filter(|a| !a.is_empty()))
            .ok_or_else(|| CleanupError::Configuration { missing: vec!["owner".to_string()] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn full_document() -> Value {
        json!({
            "android": { "groupId": "com.acme", "artifactId": "sdk", "stagingSuffix": "-staging" },
            "npm": { "scope": "acme", "packageName": "sdk", "stagingSuffix": "-staging" },
            "docker": { "images": ["sdk-server"], "stagingSuffix": "-staging" },
            "author": { "id": "acme-bot" }
        })
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn document_values_resolve() {
        let cfg = PackageNamingConfig::from_document(&full_document(), &HashMap::new()).unwrap();
        assert_eq!(cfg.android_group_id, "com.acme");
        assert_eq!(cfg.npm_scope, "@acme");
        assert_eq!(cfg.docker_images, vec!["sdk-server"]);
        assert_eq!(cfg.docker_suffix, "-staging");
    }

    #[test]
    fn overrides_win_over_document() {
        let overrides = vars(&[("STAGING_NPM_PACKAGE", "web"), ("STAGING_DOCKER_IMAGES", "a, b,")]);
        let cfg = PackageNamingConfig::from_document(&full_document(), &overrides).unwrap();
        assert_eq!(cfg.npm_package, "web");
        assert_eq!(cfg.docker_images, vec!["a", "b"]);
    }

    #[test]
    fn every_missing_field_is_reported_at_once() {
        let doc = json!({ "npm": { "scope": "@acme", "packageName": "  " } });
        let err = PackageNamingConfig::from_document(&doc, &vars(&[("STAGING_AUTHOR_ID", "bot")])).unwrap_err();
        match err {
            CleanupError::Configuration { missing } => assert_eq!(
                missing,
                vec![
                    "android.groupId",
                    "android.artifactId",
                    "android.stagingSuffix",
                    "npm.packageName",
                    "npm.stagingSuffix"
                ]
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overrides_alone_satisfy_a_missing_document() {
        let overrides = vars(&[
            (CONFIG_PATH_VAR, "/nonexistent/staging-packages.json"),
            ("STAGING_ANDROID_GROUP_ID", "com.acme"),
            ("STAGING_ANDROID_ARTIFACT_ID", "sdk"),
            ("STAGING_ANDROID_SUFFIX", "-staging"),
            ("STAGING_NPM_SCOPE", "@acme"),
            ("STAGING_NPM_PACKAGE", "sdk"),
            ("STAGING_NPM_SUFFIX", "-staging"),
            ("STAGING_AUTHOR_ID", "acme"),
        ]);
        let cfg = PackageNamingConfig::load(&overrides).unwrap();
        assert!(cfg.docker_images.is_empty());
    }

    #[test]
    fn unparsable_document_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let overrides = vars(&[(CONFIG_PATH_VAR, file.path().to_str().unwrap())]);
        let err = PackageNamingConfig::load(&overrides).unwrap_err();
        assert!(matches!(err, CleanupError::ConfigDocument { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn document_on_disk_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(full_document().to_string().as_bytes()).unwrap();
        let overrides = vars(&[(CONFIG_PATH_VAR, file.path().to_str().unwrap())]);
        let cfg = PackageNamingConfig::load(&overrides).unwrap();
        assert_eq!(cfg.author_id, "acme-bot");
    }

    #[test]
    fn specs_cover_each_registry() {
        let cfg = PackageNamingConfig::from_document(&full_document(), &HashMap::new()).unwrap();
        let specs = cfg.package_specs(Some("acme/sdk-repo"));
        assert_eq!(specs.len(), 3);

        assert_eq!(specs[0].registry(), RegistryType::Container);
        assert_eq!(specs[0].name_variants(), ["sdk-server-staging", "sdk-repo/sdk-server-staging"]);
        assert_eq!(specs[0].label(), "container sdk-server-staging");

        assert_eq!(specs[1].name_variants()[0], "sdk-staging");
        assert_eq!(specs[1].name_variants()[1], "@acme/sdk-staging");

        assert_eq!(specs[2].name_variants()[0], "com.acme.sdk-staging");
        assert_eq!(specs[2].label(), "maven com.acme:sdk-staging");
    }

    #[test]
    fn each_docker_image_is_its_own_package() {
        let overrides = vars(&[("STAGING_DOCKER_IMAGES", "server,test-creds")]);
        let cfg = PackageNamingConfig::from_document(&full_document(), &overrides).unwrap();
        let specs = cfg.package_specs(Some("acme/sdk-repo"));
        assert_eq!(specs.len(), 4);

        let containers: Vec<_> = specs.iter().filter(|s| s.registry() == RegistryType::Container).collect();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name_variants(), ["server-staging", "sdk-repo/server-staging"]);
        assert_eq!(containers[1].name_variants(), ["test-creds-staging", "sdk-repo/test-creds-staging"]);
        assert_ne!(containers[0].label(), containers[1].label());
    }

    #[test]
    fn container_falls_back_to_npm_name() {
        let mut doc = full_document();
        doc["docker"] = json!({});
        let cfg = PackageNamingConfig::from_document(&doc, &HashMap::new()).unwrap();
        let specs = cfg.package_specs(None);
        assert_eq!(specs[0].name_variants(), ["sdk"]);
    }

    #[test]
    fn run_env_reads_ci_signals() {
        let env = RunEnv::from_vars(vars(&[
            ("GITHUB_TOKEN", "ghs_abcdefghijklmnopqrstuvwxyz"),
            ("GITHUB_REPOSITORY_OWNER", "acme"),
            ("PRESERVE_STAGING_PACKAGES", "true"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("PR_NUMBER", "42"),
        ]));
        assert!(env.token.is_some());
        assert!(env.preserve);
        assert_eq!(env.owner_override.as_deref(), Some("acme"));
        assert_eq!(env.event.pr_number.as_deref(), Some("42"));
        assert_eq!(env.main_branch, "main");
        assert_eq!(env.gh_binary, "gh");
    }

    #[test]
    fn run_env_debug_never_shows_token() {
        let env = RunEnv::from_vars(vars(&[
            ("GH_TOKEN", "ghp_SUPERSECRETTOKEN123456"),
            ("GITHUB_TOKEN", "ghs_OTHERSECRETTOKEN654321"),
            ("STAGING_NPM_SCOPE", "@acme"),
            ("HOME", "/home/runner"),
        ]));
        assert!(env.token.is_some());

        let rendered = format!("{:?}", env);
        assert!(!rendered.contains("SUPERSECRET"));
        assert!(!rendered.contains("OTHERSECRET"));
        assert_eq!(env.overrides.len(), 1);
        assert_eq!(env.overrides.get("STAGING_NPM_SCOPE").map(String::as_str), Some("@acme"));
    }

    #[test]
    fn owner_resolution_order() {
        let cfg = PackageNamingConfig::from_document(&full_document(), &HashMap::new()).unwrap();
        let env = RunEnv::from_vars(vars(&[("STAGING_REPOSITORY_OWNER", "env-owner")]));
        assert_eq!(env.resolve_owner(Some("cli-owner"), &cfg).unwrap(), "cli-owner");
        assert_eq!(env.resolve_owner(None, &cfg).unwrap(), "env-owner");

        let bare = RunEnv::from_vars(HashMap::new());
        assert_eq!(bare.resolve_owner(Some(" "), &cfg).unwrap(), "acme-bot");
    }
}
