//! Forge capability contract.
//!
//! A forge exposes two capabilities to the resolver:
//! - `file`: fetch a single file by path
//! - `dir`: list the files under a directory up to a depth
//!
//! Directory listing is optional. Forges that cannot list directories keep the
//! default `dir` implementation, which reports `ForgeError::Unsupported` and
//! makes the resolver skip directory candidates.

use async_trait::async_trait;

use crate::error::{ForgeError, ForgeResult};
use crate::model::{FileMeta, Pipeline, Repo, User};

/// Identity of the run a forge request is made for.
#[derive(Debug, Clone, Copy)]
pub struct ForgeContext<'a> {
    pub user: &'a User,
    pub repo: &'a Repo,
    pub pipeline: &'a Pipeline,
}

/// Source-control hosting service the config is read from.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Fetch one file. Returns `ForgeError::NotFound` if it does not exist.
    async fn file(&self, ctx: &ForgeContext<'_>, path: &str) -> ForgeResult<Vec<u8>>;

    /// List files under `path`.
    ///
    /// Depth 0 returns the files directly under `path`; depth N also returns
    /// files nested up to N subdirectory levels below it. Returned names are
    /// relative to the repository root.
    async fn dir(
        &self,
        ctx: &ForgeContext<'_>,
        path: &str,
        depth: u8,
    ) -> ForgeResult<Vec<FileMeta>> {
        let _ = (ctx, path, depth);
        Err(ForgeError::Unsupported { operation: "dir" })
    }
}
