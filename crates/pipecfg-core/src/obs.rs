//! Structured observability hooks for config resolution.
//!
//! Events carry an `event` field (`config.*`) so log pipelines can key on them.
//! Verbosity follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{debug, error, info, warn};

/// Build the span a resolution runs in.
pub fn resolve_span(repo: &str, pipeline: u64) -> tracing::Span {
    tracing::info_span!("pipecfg.resolve", repo = %repo, pipeline = pipeline)
}

/// Emit event: a candidate produced the winning file set.
pub fn emit_config_found(repo: &str, candidate: &str, files: &[String]) {
    info!(
        event = "config.found",
        repo = %repo,
        candidate = %candidate,
        count = files.len(),
        files = ?files,
    );
}

/// Emit event: a candidate had nothing usable.
pub fn emit_candidate_skipped(repo: &str, candidate: &str, note: &str) {
    debug!(event = "config.candidate_skipped", repo = %repo, candidate = %candidate, note = %note);
}

/// Emit event: the forge failed for a candidate; the error is kept as evidence.
pub fn emit_forge_error(repo: &str, user: &str, candidate: &str, err: &dyn std::fmt::Display) {
    error!(
        event = "config.forge_error",
        repo = %repo,
        user = %user,
        candidate = %candidate,
        error = %err,
    );
}

/// Emit event: two files share a logical name.
pub fn emit_duplicate_name(repo: &str, err: &dyn std::fmt::Display) {
    error!(event = "config.duplicate_name", repo = %repo, error = %err);
}

/// Emit event: every candidate was absent.
pub fn emit_no_config_found(repo: &str, searched: &[String]) {
    warn!(event = "config.not_found", repo = %repo, searched = ?searched);
}

/// Emit event: one resolution attempt failed.
pub fn emit_attempt_failed(
    repo: &str,
    attempt: u32,
    max_attempts: u32,
    err: &dyn std::fmt::Display,
) {
    debug!(
        event = "config.attempt_failed",
        repo = %repo,
        attempt = attempt,
        max_attempts = max_attempts,
        error = %err,
    );
}

/// Emit event: a restarted run reused its prior config.
pub fn emit_prior_config_reused(repo: &str, files: usize) {
    info!(event = "config.reused", repo = %repo, files = files);
}
