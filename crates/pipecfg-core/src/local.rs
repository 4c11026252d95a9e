//! Forge backed by a repository checkout on the local filesystem.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{ForgeError, ForgeResult};
use crate::forge::{Forge, ForgeContext};
use crate::model::FileMeta;

/// Reads config candidates from a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalForge {
    root: PathBuf,
    directory_listing: bool,
}

impl LocalForge {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            directory_listing: true,
        }
    }

    /// Only answer single-file lookups, like forges without a tree API.
    pub fn file_only(mut self) -> Self {
        self.directory_listing = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> ForgeResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ForgeError::Request(format!(
                "path '{}' escapes the repository root",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn not_found_or_io(path: &str, err: std::io::Error) -> ForgeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ForgeError::NotFound {
            path: path.to_string(),
        }
    } else {
        ForgeError::Io(err)
    }
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[async_trait]
impl Forge for LocalForge {
    async fn file(&self, _ctx: &ForgeContext<'_>, path: &str) -> ForgeResult<Vec<u8>> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| not_found_or_io(path, e))?;
        if !metadata.is_file() {
            return Err(ForgeError::NotFound {
                path: path.to_string(),
            });
        }
        tokio::fs::read(&full)
            .await
            .map_err(|e| not_found_or_io(path, e))
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

        let base = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&base)
            .await
            .map_err(|e| not_found_or_io(path, e))?;
        if !metadata.is_dir() {
            return Err(ForgeError::NotFound {
                path: path.to_string(),
            });
        }

        let mut files = Vec::new();
        let mut pending = vec![(base, path.trim_end_matches('/').to_string(), 0u8)];
        while let Some((dir, prefix, level)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let file_type = entry.file_type().await?;
                let relative = join_name(&prefix, &name);
                if file_type.is_dir() {
                    if level < depth {
                        pending.push((entry.path(), relative, level + 1));
                    }
                } else if file_type.is_file() {
                    let data = tokio::fs::read(entry.path()).await?;
                    files.push(FileMeta::new(relative, data));
                }
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
