//! In-memory forge for testing.
//!
//! `MemoryForge` holds a flat list of repository files and answers `file` and
//! `dir` requests from it. Failures and delays can be scripted per path, and
//! every call is logged so tests can assert which candidates were tried.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ForgeError, ForgeResult};
use crate::forge::{Forge, ForgeContext};
use crate::model::FileMeta;

#[derive(Debug, Clone, Copy)]
struct Slowdown {
    remaining: u32,
    delay: Duration,
}

/// In-memory forge backed by an insertion-ordered file list.
#[derive(Debug)]
pub struct MemoryForge {
    files: Vec<FileMeta>,
    directory_listing: bool,
    failures: Mutex<HashMap<String, u32>>,
    slowdowns: Mutex<HashMap<String, Slowdown>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MemoryForge {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            directory_listing: true,
            failures: Mutex::new(HashMap::new()),
            slowdowns: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryForge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Directory listings return files in insertion order.
    pub fn with_file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.push(FileMeta::new(name, data));
        self
    }

    /// Behave like a forge that only supports single-file lookup.
    pub fn without_directory_listing(mut self) -> Self {
        self.directory_listing = false;
        self
    }

    /// Fail the next `times` requests for `path` with a request error.
    pub fn fail_path(self, path: impl Into<String>, times: u32) -> Self {
        self.failures.lock().unwrap().insert(path.into(), times);
        self
    }

    /// Delay the next `times` requests for `path` by `delay`.
    pub fn slow_path(self, path: impl Into<String>, times: u32, delay: Duration) -> Self {
        self.slowdowns.lock().unwrap().insert(
            path.into(),
            Slowdown {
                remaining: times,
                delay,
            },
        );
        self
    }

    /// Calls made so far, as `file:<path>` or `dir:<path>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn enter(&self, kind: &str, path: &str) -> ForgeResult<()> {
        self.calls.lock().unwrap().push(format!("{}:{}", kind, path));

        let delay = {
            let mut slowdowns = self.slowdowns.lock().unwrap();
            match slowdowns.get_mut(path) {
                Some(slow) if slow.remaining > 0 => {
                    slow.remaining -= 1;
                    Some(slow.delay)
                }
                _ => None,
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ForgeError::Request(format!("transient failure for {}", path)));
            }
        }
        Ok(())
    }
}

/// Path of `name` below `dir`, if it lies inside it.
fn relative_to<'a>(name: &'a str, dir: &str) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(name);
    }
    name.strip_prefix(dir)?.strip_prefix('/')
}

#[async_trait]
impl Forge for MemoryForge {
    async fn file(&self, _ctx: &ForgeContext<'_>, path: &str) -> ForgeResult<Vec<u8>> {
        self.enter("file", path).await?;
        self.files
            .iter()
            .find(|f| f.name == path)
            .map(|f| f.data.clone())
            .ok_or_else(|| ForgeError::NotFound {
                path: path.to_string(),
            })
    }

    async fn dir(
        &self,
        _ctx: &ForgeContext<'_>,
        path: &str,
        depth: u8,
    ) -> ForgeResult<Vec<FileMeta>> {
        if !self.directory_listing {
            return Err(ForgeError::Unsupported { operation: "dir" });
        }
        self.enter("dir", path).await?;

        let mut exists = false;
        let mut listing = Vec::new();
        for file in &self.files {
            let Some(rest) = relative_to(&file.name, path) else {
                continue;
            };
            exists = true;
            if rest.matches('/').count() <= usize::from(depth) {
                listing.push(file.clone());
            }
        }

        if !exists {
            return Err(ForgeError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(listing)
    }
}
