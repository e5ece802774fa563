//! decision-ledger: collision resolution for decision ledgers.
//!
//! A canonical text document (by default `GLOBAL-STATE.yaml`) is treated as
//! an append-only ledger of `[DECISION]` blocks. This crate finds where that
//! ledger has become inconsistent and proposes or applies minimal,
//! reviewable fixes.
//!
//! # Pipeline
//!
//! - **Parse**: extract ordered decision records and their positions
//!   ([`core::record`]).
//! - **Detect**: report missing fields, invalid statuses and dangling
//!   supersede pointers; find exact and near-duplicate ACTIVE decisions
//!   ([`core::collision`]).
//! - **Plan**: exact duplicates become safe supersede edits; near-duplicates
//!   stay gated proposals ([`core::plan`]).
//! - **Patch**: substitute edited blocks by exact content match and render a
//!   unified diff ([`core::patch`], [`core::diff`]).
//! - **Apply**: `scan` is read-only; `apply` writes the canonical document
//!   only when a replacement landed ([`core::apply`]).
//!
//! Near-duplicates are never merged automatically. A matching approval token
//! is acknowledged but selects no gated actions in this version.
//!
//! # Examples
//!
//! ```bash
//! # Write RESOLUTION-DRAFT.{yaml,md} and, if needed, RESOLUTION-PATCH.diff
//! decision-ledger scan --workspace ./ws --kit-dir .
//!
//! # Supersede exact duplicate ACTIVE decisions in place
//! decision-ledger apply --workspace ./ws --kit-dir .
//!
//! # Lint ledger-grammar files without touching them
//! decision-ledger lint MEMORY.md GLOBAL-STATE.yaml
//! ```

pub mod core;
pub mod plugins;

use clap::{Parser, Subcommand};
use crate::core::apply::Mode;
use crate::core::error;
use crate::plugins::{lint, resolve};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(
    name = "decision-ledger",
    version = env!("CARGO_PKG_VERSION"),
    about = "Detect and resolve colliding decision records in a canonical ledger"
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[clap(long, short, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect collisions and write drafts; never mutates the ledger.
    Scan(resolve::ResolveArgs),
    /// Apply safe exact-duplicate supersede edits to the canonical ledger.
    Apply(resolve::ApplyArgs),
    /// Advisory lint over ledger-grammar files (exit 1 on findings).
    Lint(lint::LintCli),
    /// Print JSON schema for the resolver.
    Schema,
    /// Print version.
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Parses process arguments and runs the selected command. Returns the
/// process exit code.
pub fn run() -> Result<i32, error::ResolveError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan(args) => resolve::run_resolve_cli(Mode::Scan, &args, None),
        Command::Apply(args) => {
            resolve::run_resolve_cli(Mode::Apply, &args.common, args.approve.as_deref())
        }
        Command::Lint(args) => lint::run_lint_cli(args),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&resolve::schema())?);
            Ok(0)
        }
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}
