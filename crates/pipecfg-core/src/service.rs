//! Resolution service: run reuse, override selection, and bounded retries.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{trace, Instrument};

use crate::error::{ResolveError, Result};
use crate::forge::{Forge, ForgeContext};
use crate::model::{Candidate, Pipeline, Repo, ResolvedFile, User, DEFAULT_CONFIG_ORDER};
use crate::obs;
use crate::resolver::first_available;

/// Timeout and retry controls for resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Wall-clock limit for one attempt (milliseconds).
    pub timeout_ms: u64,
    /// Number of attempts (0 is treated as 1).
    pub max_attempts: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            max_attempts: 3,
        }
    }
}

/// Everything the service needs to know about one run.
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    pub user: &'a User,
    pub repo: &'a Repo,
    pub pipeline: &'a Pipeline,
    /// Files resolved by an earlier run of this pipeline.
    pub prior: &'a [ResolvedFile],
    pub restart: bool,
}

impl<'a> ResolveRequest<'a> {
    pub fn new(user: &'a User, repo: &'a Repo, pipeline: &'a Pipeline) -> Self {
        Self {
            user,
            repo,
            pipeline,
            prior: &[],
            restart: false,
        }
    }

    /// Mark the run as a restart that may reuse `prior`.
    pub fn restarting(mut self, prior: &'a [ResolvedFile]) -> Self {
        self.prior = prior;
        self.restart = true;
        self
    }

    fn forge_context(&self) -> ForgeContext<'a> {
        ForgeContext {
            user: self.user,
            repo: self.repo,
            pipeline: self.pipeline,
        }
    }
}

/// Why a [`ResolveScope`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

/// Caller-owned bounds on a resolution: an optional overall deadline and an
/// optional cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct ResolveScope {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Sending half of a scope's cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl ResolveScope {
    /// A scope with no deadline that is never cancelled.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A cancellable scope and the handle that cancels it.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel: Some(rx),
            },
            CancelHandle { tx },
        )
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn interrupted_now(&self) -> Option<Interrupt> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(Interrupt::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Interrupt::DeadlineExceeded);
        }
        None
    }

    async fn interrupted(&self) -> Interrupt {
        let cancelled = async {
            if let Some(rx) = &self.cancel {
                let mut rx = rx.clone();
                if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                    return;
                }
            }
            std::future::pending::<()>().await
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancelled => Interrupt::Cancelled,
            _ = expired => Interrupt::DeadlineExceeded,
        }
    }
}

/// Entry point for config resolution.
///
/// Holds only immutable state and can be shared between tasks; each call to
/// [`ResolutionService::resolve`] is independent.
#[derive(Debug, Clone)]
pub struct ResolutionService {
    config: ResolverConfig,
    default_order: Arc<[Candidate]>,
}

impl ResolutionService {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_default_order(config, DEFAULT_CONFIG_ORDER)
    }

    /// Use a custom default candidate order, fixed for the service's lifetime.
    pub fn with_default_order<I, S>(config: ResolverConfig, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            config,
            default_order: order
                .into_iter()
                .map(|location| Candidate::parse(location.as_ref()))
                .collect(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn default_order(&self) -> &[Candidate] {
        &self.default_order
    }

    /// Resolve the config files governing `request`'s pipeline run.
    pub async fn resolve(
        &self,
        forge: &dyn Forge,
        request: &ResolveRequest<'_>,
        scope: &ResolveScope,
    ) -> Result<Vec<ResolvedFile>> {
        if request.restart && !request.prior.is_empty() {
            obs::emit_prior_config_reused(&request.repo.full_name, request.prior.len());
            return Ok(request.prior.to_vec());
        }

        request.repo.policy.validate()?;

        let span = obs::resolve_span(&request.repo.full_name, request.pipeline.number);
        self.resolve_with_retries(forge, request, scope)
            .instrument(span)
            .await
    }

    async fn resolve_with_retries(
        &self,
        forge: &dyn Forge,
        request: &ResolveRequest<'_>,
        scope: &ResolveScope,
    ) -> Result<Vec<ResolvedFile>> {
        let repo = request.repo.full_name.as_str();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.attempt(forge, request, scope).await {
                Ok(files) => return Ok(files),
                Err(err) => err,
            };
            obs::emit_attempt_failed(repo, attempt, max_attempts, &err);

            if !err.is_retryable() {
                return Err(err);
            }
            // An expired or cancelled scope outranks the cascade's own error.
            if let Some(interrupt) = scope.interrupted_now() {
                return Err(self.interrupt_error(interrupt));
            }
            if attempt >= max_attempts {
                return Err(err);
            }
            attempt += 1;
        }
    }

    /// One pass over the candidates, bounded by a fresh attempt timeout and
    /// by the caller's scope.
    async fn attempt(
        &self,
        forge: &dyn Forge,
        request: &ResolveRequest<'_>,
        scope: &ResolveScope,
    ) -> Result<Vec<ResolvedFile>> {
        if let Some(interrupt) = scope.interrupted_now() {
            return Err(self.interrupt_error(interrupt));
        }

        let attempt_deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        tokio::select! {
            biased;
            result = self.fetch(forge, request) => result,
            _ = tokio::time::sleep_until(attempt_deadline) => Err(ResolveError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
            interrupt = scope.interrupted() => Err(self.interrupt_error(interrupt)),
        }
    }

    async fn fetch(
        &self,
        forge: &dyn Forge,
        request: &ResolveRequest<'_>,
    ) -> Result<Vec<ResolvedFile>> {
        let ctx = request.forge_context();
        let repo = request.repo.full_name.as_str();

        if let Some(config) = request.repo.policy.override_path() {
            trace!(repo = %repo, config = %config, "using user defined config");
            let candidates = [Candidate::parse(config)];
            return first_available(forge, &ctx, &candidates)
                .await
                .map_err(|err| match err {
                    ResolveError::NotFound { .. } | ResolveError::AggregateFetchFailure(_) => {
                        ResolveError::UserOverrideNotFound {
                            config: config.to_string(),
                            source: Box::new(err),
                        }
                    }
                    other => other,
                });
        }

        trace!(repo = %repo, "no user defined config, following default order");
        first_available(forge, &ctx, &self.default_order).await
    }

    fn interrupt_error(&self, interrupt: Interrupt) -> ResolveError {
        match interrupt {
            Interrupt::Cancelled => ResolveError::Cancelled,
            Interrupt::DeadlineExceeded => ResolveError::Timeout {
                timeout_ms: self.config.timeout_ms,
            },
        }
    }
}

impl Default for ResolutionService {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
