// src/service.rs

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::cleanup::context::ContextResolver;
use crate::cleanup::guard::SafetyGuard;
use crate::cleanup::locator::EndpointLocator;
use crate::cleanup::model::{CleanupContext, CleanupResult, Outcome, PackageSpec, RegistryStatus};
use crate::cleanup::selector;
use crate::config::{PackageNamingConfig, RunEnv};
use crate::error::CleanupError;
use crate::report::Report;
use crate::sys::cleanup::DeletionExecutor;
use crate::sys::gh::GhCliRegistry;
use crate::sys::git::SystemGitLog;
use crate::sys::traits::{CommitLog, RegistryApi};

/// Per-invocation knobs coming from the command line.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub outcome: Outcome,
    pub owner: Option<String>,
    pub preserve: bool,
    pub dry_run: bool,
    pub concurrency: usize,
}

pub struct CleanupService {
    env: RunEnv,
    registry: Box<dyn RegistryApi>,
    commits: Box<dyn CommitLog>,
}

impl CleanupService {
    pub fn new(mut env: RunEnv, call_timeout: Duration) -> Self {
        let token = env.token.take();
        let registry = Box::new(GhCliRegistry::new(env.gh_binary.clone(), token, call_timeout));
        Self::with_backends(env, registry, Box::new(SystemGitLog::new(call_timeout)))
    }

    pub fn with_backends(env: RunEnv, registry: Box<dyn RegistryApi>, commits: Box<dyn CommitLog>) -> Self {
        Self { env, registry, commits }
    }

    pub fn env(&self) -> &RunEnv {
        &self.env
    }

    /// Safety guard, configuration, authentication, context, then the three
    /// registry pipelines concurrently.
    pub async fn run(&self, opts: &RunOptions) -> Result<Report, CleanupError> {
        // ==========================================================================
        // 1. 🛡️ Safety guard: nothing below runs when staging is preserved
        // ==========================================================================
        let commit_message = match &self.env.event.commit_message {
            Some(message) => Some(message.clone()),
            None => self.commits.latest_message().await,
        };

        let decision = SafetyGuard::new(self.env.preserve || opts.preserve, commit_message.as_deref()).check();
        if decision.should_halt {
            return Ok(Report::halted(decision.reason));
        }

        // ==========================================================================
        // 2. Configuration & credentials (fatal on failure)
        // ==========================================================================
        let naming = PackageNamingConfig::load(&self.env.overrides)?;
        let owner = self.env.resolve_owner(opts.owner.as_deref(), &naming)?;

        self.registry
            .check_auth()
            .await
            .map_err(|e| CleanupError::Authentication(e.to_string()))?;

        // ==========================================================================
        // 3. Context & per-registry pipelines
        // ==========================================================================
        let mut event = self.env.event.clone();
        event.commit_message = commit_message;
        let ctx = ContextResolver::new(self.env.main_branch.clone()).resolve(opts.outcome, &event);
        info!(owner = %owner, outcome = %ctx.outcome(), scope = %ctx.scope(), "{}", ctx.describe());

        let specs = naming.package_specs(self.env.repository.as_deref());
        let results = join_all(specs.iter().map(|spec| self.process_registry(spec, &owner, &ctx, opts))).await;

        Ok(Report::emit(results, &ctx))
    }

    async fn process_registry(
        &self,
        spec: &PackageSpec,
        owner: &str,
        ctx: &CleanupContext,
        opts: &RunOptions,
    ) -> CleanupResult {
        let result = CleanupResult::new(spec.registry(), spec.label());

        let located = match EndpointLocator::new(self.registry.as_ref(), owner).locate(spec).await {
            Ok(located) => located,
            Err(e @ CleanupError::PackageNotFound { .. }) => {
                info!(registry = %spec.registry(), "nothing to clean up: {}", e);
                return result.with_status(RegistryStatus::NotFound(e.to_string()));
            }
            Err(e) => {
                warn!(registry = %spec.registry(), "{}", e);
                return result.with_status(RegistryStatus::ReadFailed(e.to_string()));
            }
        };
        info!(registry = %spec.registry(), endpoint = %located.endpoint, shape = %located.shape, "package located");

        let versions = match self.registry.list_versions(&located.endpoint, spec.registry()).await {
            Ok(versions) => versions,
            Err(e) => {
                let err = CleanupError::Registry(e.to_string());
                warn!(registry = %spec.registry(), endpoint = %located.endpoint, "{}", err);
                let mut failed = result.with_status(RegistryStatus::ReadFailed(err.to_string()));
                failed.endpoint = Some(located.endpoint);
                return failed;
            }
        };

        let mut result = result;
        result.matched = versions.iter().filter(|v| selector::is_staging(v, ctx)).count();
        let to_delete = selector::select(&versions, ctx);

        info!(
            registry = %spec.registry(),
            "{} versions, {} staging matches, {} selected ({})",
            versions.len(),
            result.matched,
            to_delete.len(),
            ctx.strategy()
        );

        DeletionExecutor::new(self.registry.as_ref(), opts.concurrency, opts.dry_run)
            .execute(&located.endpoint, &to_delete, result)
            .await
    }
}
