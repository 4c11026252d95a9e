//! pipecfg - find the pipeline config that governs a run
//!
//! Resolves a local repository checkout through the same cascade the server
//! uses, so operators can see which file(s) a pipeline would pick up.
//!
//! ## Commands
//!
//! - `resolve`: run config resolution against a checkout
//! - `defaults`: print the default candidate order

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pipecfg_core::{
    LocalForge, Pipeline, Repo, RepositoryConfigPolicy, ResolutionService, ResolveRequest,
    ResolveScope, ResolvedFile, ResolverConfig, User, DEFAULT_CONFIG_ORDER, MAX_SCAN_DEPTH,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pipecfg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve which pipeline config files govern a CI run", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output and JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the config files for a repository checkout
    Resolve(ResolveArgs),

    /// Print the default candidate order
    Defaults,
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// Repository checkout to resolve against
    #[arg(long, default_value = ".")]
    repo_path: PathBuf,

    /// Repository name used in logs
    #[arg(long, default_value = "local/checkout")]
    repo_name: String,

    /// JSON file holding the repository config policy
    #[arg(long)]
    policy_file: Option<PathBuf>,

    /// Explicit config file, or directory with a trailing '/'
    #[arg(long, env = "PIPECFG_CONFIG_PATH")]
    config: Option<String>,

    /// Subdirectory levels scanned under directory candidates
    #[arg(
        long,
        env = "PIPECFG_SCAN_DEPTH",
        value_parser = clap::value_parser!(u8).range(0..=MAX_SCAN_DEPTH as i64)
    )]
    scan_depth: Option<u8>,

    /// Skip files with "template" in their path
    #[arg(long, env = "PIPECFG_IGNORE_TEMPLATES")]
    ignore_templates: bool,

    /// Pretend the forge cannot list directories
    #[arg(long)]
    file_only: bool,

    /// Per-attempt timeout in milliseconds
    #[arg(long, env = "PIPECFG_TIMEOUT_MS", default_value_t = ResolverConfig::default().timeout_ms)]
    timeout_ms: u64,

    /// Maximum resolution attempts
    #[arg(long, env = "PIPECFG_ATTEMPTS", default_value_t = ResolverConfig::default().max_attempts)]
    attempts: u32,

    /// Print file contents after the summary
    #[arg(long)]
    show_content: bool,
}

/// One resolved file as printed by `resolve`.
#[derive(Debug, Serialize)]
struct ResolvedEntry {
    name: String,
    size: usize,
    digest: String,
}

impl From<&ResolvedFile> for ResolvedEntry {
    fn from(file: &ResolvedFile) -> Self {
        Self {
            name: file.name.clone(),
            size: file.data.len(),
            digest: file.digest(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pipecfg_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Resolve(args) => cmd_resolve(&args, cli.json).await,
        Commands::Defaults => cmd_defaults(cli.json),
    }
}

/// Merge the policy file (if any) with command-line overrides.
fn build_policy(args: &ResolveArgs) -> Result<RepositoryConfigPolicy> {
    let mut policy = match &args.policy_file {
        Some(path) => load_policy(path)?,
        None => RepositoryConfigPolicy::default(),
    };

    if let Some(config) = &args.config {
        policy.config_path = config.clone();
    }
    if let Some(depth) = args.scan_depth {
        policy.scan_depth = depth;
    }
    if args.ignore_templates {
        policy.ignore_template_files = true;
    }
    Ok(policy)
}

fn load_policy(path: &Path) -> Result<RepositoryConfigPolicy> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid policy file {:?}", path))
}

async fn resolve_files(args: &ResolveArgs) -> Result<Vec<ResolvedFile>> {
    let policy = build_policy(args)?;
    let mut forge = LocalForge::new(&args.repo_path);
    if args.file_only {
        forge = forge.file_only();
    }

    let service = ResolutionService::new(ResolverConfig {
        timeout_ms: args.timeout_ms,
        max_attempts: args.attempts,
    });
    let user = User {
        login: whoami(),
    };
    let repo = Repo::new(args.repo_name.clone(), policy);
    let pipeline = Pipeline::default();

    info!(repo = %repo.full_name, path = ?args.repo_path, "resolving pipeline config");
    service
        .resolve(
            &forge,
            &ResolveRequest::new(&user, &repo, &pipeline),
            &ResolveScope::unbounded(),
        )
        .await
        .with_context(|| format!("Failed to resolve pipeline config in {:?}", args.repo_path))
}

async fn cmd_resolve(args: &ResolveArgs, json: bool) -> Result<()> {
    let files = resolve_files(args).await?;
    let entries: Vec<ResolvedEntry> = files.iter().map(ResolvedEntry::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Resolved {} config file(s):", entries.len());
    for entry in &entries {
        println!("  {:<40} {:>8} bytes  {}", entry.name, entry.size, &entry.digest[..12]);
    }
    if args.show_content {
        for file in &files {
            println!();
            println!("--- {}", file.name);
            println!("{}", String::from_utf8_lossy(&file.data));
        }
    }
    Ok(())
}

fn cmd_defaults(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&DEFAULT_CONFIG_ORDER)?);
    } else {
        for (i, location) in DEFAULT_CONFIG_ORDER.iter().enumerate() {
            println!("{}. {}", i + 1, location);
        }
    }
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "local".to_string())
}
