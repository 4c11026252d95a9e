//! pipecfg core - pipeline config resolution against a forge.
//!
//! Decides which configuration file(s) in a repository govern a pipeline run:
//! - an explicit per-repository override wins over the default locations
//! - candidates are tried in order and the first match wins
//! - directory candidates are scanned to the repository's configured depth
//! - duplicate logical file names abort resolution
//! - each attempt is bounded by a timeout and retried a configured number of times
//!
//! Forges plug in through the [`Forge`] trait. [`fakes::MemoryForge`] and
//! [`LocalForge`] are provided.

pub mod error;
pub mod fakes;
pub mod filter;
pub mod forge;
pub mod local;
pub mod model;
pub mod obs;
pub mod resolver;
pub mod service;
pub mod telemetry;

pub use error::{CandidateFailure, FetchFailures, ForgeError, ForgeResult, ResolveError, Result};
pub use filter::{
    filter_pipeline_files, logical_name, validate_unique_file_names, CONFIG_EXTENSIONS,
};
pub use forge::{Forge, ForgeContext};
pub use local::LocalForge;
pub use model::{
    Candidate, FileMeta, Pipeline, Repo, RepositoryConfigPolicy, ResolvedFile, User,
    DEFAULT_CONFIG_ORDER, MAX_SCAN_DEPTH,
};
pub use resolver::{first_available, lookup_candidate, Lookup};
pub use service::{CancelHandle, ResolutionService, ResolveRequest, ResolveScope, ResolverConfig};
pub use telemetry::init_tracing;
