//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};

/// A source-based package manager and build orchestrator for native C/C++ code.
#[derive(Parser)]
#[command(name = "crucible")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug/info)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run without network access
    #[arg(long, global = true)]
    pub offline: bool,

    /// Require the lockfile to be up-to-date (error if resolution would change it)
    #[arg(long, global = true)]
    pub locked: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies and write the lockfile
    Resolve(ResolveArgs),

    /// Build the current package
    Build(BuildArgs),

    /// Display the resolved dependency tree
    Tree(TreeArgs),

    /// Show the compile/link flags for a target
    Flags(FlagsArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Re-resolve even if the lockfile already matches the manifest
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build in release mode
    #[arg(short, long)]
    pub release: bool,

    /// Specific targets to build (defaults to all targets)
    #[arg(long)]
    pub target: Vec<String>,

    /// Disable compile_commands.json generation (enabled by default)
    #[arg(long)]
    pub no_compile_commands: bool,

    /// Emit the build plan as JSON without building
    #[arg(long)]
    pub plan: bool,

    /// Number of parallel jobs (defaults to hardware_concurrency + 2)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Target to show flags for
    pub target: String,

    /// Show compile flags only
    #[arg(long)]
    pub compile: bool,

    /// Show link flags only
    #[arg(long)]
    pub link: bool,
}
