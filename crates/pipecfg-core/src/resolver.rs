//! Candidate lookup and the first-match-wins cascade.

use tracing::trace;

use crate::error::{FetchFailures, ForgeError, ResolveError, Result};
use crate::filter::{filter_pipeline_files, validate_unique_file_names};
use crate::forge::{Forge, ForgeContext};
use crate::model::{Candidate, FileMeta};
use crate::obs;

/// Outcome of looking up a single candidate.
#[derive(Debug)]
pub enum Lookup {
    /// This candidate wins.
    Found(Vec<FileMeta>),
    /// Nothing usable here; the note explains why.
    Skipped(String),
    /// The forge failed; the error is kept for aggregation.
    Failed(ForgeError),
}

/// Look up one candidate.
///
/// Only a duplicate logical name is returned as `Err`, since it aborts the
/// whole resolution. Every other outcome is a [`Lookup`].
pub async fn lookup_candidate(
    forge: &dyn Forge,
    ctx: &ForgeContext<'_>,
    candidate: &Candidate,
) -> Result<Lookup> {
    match candidate {
        Candidate::Directory(path) => lookup_directory(forge, ctx, candidate, path).await,
        Candidate::File(path) => Ok(lookup_file(forge, ctx, path).await),
    }
}

async fn lookup_directory(
    forge: &dyn Forge,
    ctx: &ForgeContext<'_>,
    candidate: &Candidate,
    path: &str,
) -> Result<Lookup> {
    let policy = &ctx.repo.policy;
    let listing = match forge.dir(ctx, path, policy.scan_depth).await {
        Ok(listing) => listing,
        Err(err) if err.is_soft_miss() => {
            return Ok(Lookup::Skipped("not found or not implemented".to_string()));
        }
        Err(err) => return Ok(Lookup::Failed(err)),
    };

    let listed: Vec<String> = listing.iter().map(|f| f.name.clone()).collect();
    let files = filter_pipeline_files(listing, policy.ignore_template_files);
    if files.is_empty() {
        return Ok(Lookup::Skipped(format!(
            "found {} items but none are .yml/.yaml files: {:?}",
            listed.len(),
            listed
        )));
    }

    if let Err(err) = validate_unique_file_names(&files) {
        obs::emit_duplicate_name(&ctx.repo.full_name, &err);
        return Err(err);
    }

    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    obs::emit_config_found(&ctx.repo.full_name, &candidate.to_string(), &names);
    Ok(Lookup::Found(files))
}

async fn lookup_file(forge: &dyn Forge, ctx: &ForgeContext<'_>, path: &str) -> Lookup {
    match forge.file(ctx, path).await {
        Ok(data) if data.is_empty() => Lookup::Skipped("file is empty".to_string()),
        Ok(data) => {
            obs::emit_config_found(&ctx.repo.full_name, path, &[path.to_string()]);
            Lookup::Found(vec![FileMeta::new(path, data)])
        }
        Err(err) if err.is_soft_miss() => Lookup::Skipped("file not found".to_string()),
        Err(err) => Lookup::Failed(err),
    }
}

/// Try `candidates` in order and return the files of the first match.
///
/// Later candidates are never consulted once one matches. When none match,
/// any recorded forge errors are returned together; otherwise the error is
/// `NotFound` naming every candidate tried.
pub async fn first_available(
    forge: &dyn Forge,
    ctx: &ForgeContext<'_>,
    candidates: &[Candidate],
) -> Result<Vec<FileMeta>> {
    let repo = ctx.repo.full_name.as_str();
    let mut failures = FetchFailures::default();
    let mut searched = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let label = candidate.to_string();
        trace!(repo = %repo, candidate = %label, "fetching from forge");

        match lookup_candidate(forge, ctx, candidate).await? {
            Lookup::Found(files) => return Ok(files),
            Lookup::Skipped(note) => {
                obs::emit_candidate_skipped(repo, &label, &note);
                searched.push(format!("{}: {}", label, note));
            }
            Lookup::Failed(err) => {
                obs::emit_forge_error(repo, &ctx.user.login, &label, &err);
                searched.push(format!("{}: error - {}", label, err));
                failures.push(label, err);
            }
        }
    }

    if !failures.is_empty() {
        return Err(ResolveError::AggregateFetchFailure(failures));
    }

    obs::emit_no_config_found(repo, &searched);
    Err(ResolveError::NotFound {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    })
}
