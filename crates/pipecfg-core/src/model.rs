//! Core data model: repository policy, candidates, and resolved files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ResolveError, Result};

/// Deepest subdirectory level a directory candidate may be scanned to.
pub const MAX_SCAN_DEPTH: u8 = 10;

/// Conventional configuration locations, tried in order when a repository
/// does not name its own config.
pub const DEFAULT_CONFIG_ORDER: [&str; 3] =
    [".woodpecker/", ".woodpecker.yaml", ".woodpecker.yml"];

/// Per-repository settings that steer config resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfigPolicy {
    /// Explicit config location. Empty means "use the default order".
    pub config_path: String,

    /// Subdirectory levels included when listing a directory candidate.
    pub scan_depth: u8,

    /// Drop files whose path contains "template" (case-insensitive).
    pub ignore_template_files: bool,
}

impl RepositoryConfigPolicy {
    /// Policy that points at an explicit config location.
    pub fn with_override(config_path: impl Into<String>) -> Self {
        Self {
            config_path: config_path.into(),
            ..Self::default()
        }
    }

    /// Trimmed override, or `None` when the defaults apply.
    pub fn override_path(&self) -> Option<&str> {
        let trimmed = self.config_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan_depth > MAX_SCAN_DEPTH {
            return Err(ResolveError::InvalidPolicy(format!(
                "scan depth {} exceeds maximum of {}",
                self.scan_depth, MAX_SCAN_DEPTH
            )));
        }
        Ok(())
    }
}

/// One location to look up on the forge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Candidate {
    /// A single file path.
    File(String),
    /// A directory, stored without its trailing separator.
    Directory(String),
}

impl Candidate {
    /// Parse a location string; a trailing `/` marks a directory.
    pub fn parse(location: &str) -> Self {
        match location.strip_suffix('/') {
            Some(dir) => Candidate::Directory(dir.to_string()),
            None => Candidate::File(location.to_string()),
        }
    }

    /// Path handed to the forge.
    pub fn path(&self) -> &str {
        match self {
            Candidate::File(path) | Candidate::Directory(path) => path,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Candidate::Directory(_))
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Candidate::File(path) => write!(f, "{}", path),
            Candidate::Directory(path) => write!(f, "{}/", path),
        }
    }
}

/// A file as returned by the forge, and as handed back to callers.
///
/// `name` is relative to the repository root and includes subdirectories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub data: Vec<u8>,
}

/// Files produced by a successful resolution.
pub type ResolvedFile = FileMeta;

impl FileMeta {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// SHA-256 hex digest of the content.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }
}

/// Forge account on whose behalf files are fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

/// Repository being built, together with its config policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    /// "owner/name".
    pub full_name: String,
    pub policy: RepositoryConfigPolicy,
}

impl Repo {
    pub fn new(full_name: impl Into<String>, policy: RepositoryConfigPolicy) -> Self {
        Self {
            full_name: full_name.into(),
            policy,
        }
    }
}

/// The pipeline run the config is resolved for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub number: u64,
    pub commit: String,
    pub branch: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_parse_directory() {
        let candidate = Candidate::parse(".woodpecker/");
        assert_eq!(candidate, Candidate::Directory(".woodpecker".to_string()));
        assert!(candidate.is_directory());
        assert_eq!(candidate.path(), ".woodpecker");
        assert_eq!(candidate.to_string(), ".woodpecker/");
    }

    #[test]
    fn test_candidate_parse_file() {
        let candidate = Candidate::parse(".woodpecker.yml");
        assert_eq!(candidate, Candidate::File(".woodpecker.yml".to_string()));
        assert!(!candidate.is_directory());
        assert_eq!(candidate.to_string(), ".woodpecker.yml");
    }

    #[test]
    fn test_override_path_trims_whitespace() {
        let policy = RepositoryConfigPolicy::with_override("  custom/path.yml \n");
        assert_eq!(policy.override_path(), Some("custom/path.yml"));

        let blank = RepositoryConfigPolicy::with_override("   ");
        assert_eq!(blank.override_path(), None);
    }

    #[test]
    fn test_policy_depth_bounds() {
        let mut policy = RepositoryConfigPolicy::default();
        policy.scan_depth = MAX_SCAN_DEPTH;
        assert!(policy.validate().is_ok());

        policy.scan_depth = MAX_SCAN_DEPTH + 1;
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPolicy(_)));
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: RepositoryConfigPolicy =
            serde_json::from_str(r#"{"scan_depth": 2}"#).expect("deserialize");
        assert_eq!(policy.scan_depth, 2);
        assert!(policy.config_path.is_empty());
        assert!(!policy.ignore_template_files);
    }

    #[test]
    fn test_file_digest_is_content_addressed() {
        let a = FileMeta::new("a.yml", b"steps: []".to_vec());
        let b = FileMeta::new("b.yml", b"steps: []".to_vec());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
