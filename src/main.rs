//! # media-relink CLI
//!
//! ```bash
//! media-relink <projectId> <token> [dataset] [--dry-run] [--verbose] [--prod]
//! ```
//!
//! Lists every legacy video asset in the dataset, maps it to its media-library
//! instance and container, and rewrites the `asset`/`media` reference pairs
//! of every document that points at it. `--dry-run` prints the planned
//! changes without writing anything.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use media_relink::config::{self, RegistryEnvironment, RunSettings};
use media_relink::migrate;
use media_relink::progress::ProgressMode;

/// Rewrite legacy video asset references into media-library global
/// references.
#[derive(Parser)]
#[command(
    name = "media-relink",
    about = "Rewrite legacy video asset references into media-library global references",
    version,
    long_about = "Finds every legacy video asset document in a dataset, resolves its \
    media-library instance and container, and replaces each local `asset` reference \
    (and its sibling `media` field) with weak global references. Run with --dry-run \
    first to review the planned changes."
)]
struct Cli {
    /// Project id of the content store.
    project_id: String,

    /// API token with read and write access to the dataset and media library.
    token: String,

    /// Dataset to migrate.
    #[arg(default_value = "production")]
    dataset: String,

    /// Print planned changes without writing anything.
    #[arg(short, long)]
    dry_run: bool,

    /// Log per-asset and per-document detail.
    #[arg(short, long)]
    verbose: bool,

    /// Use the production media-library API instead of staging.
    #[arg(long)]
    prod: bool,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_or_default(cli.config.as_deref())?;
    let settings = RunSettings {
        project_id: cli.project_id,
        token: cli.token,
        dataset: cli.dataset,
        dry_run: cli.dry_run,
        environment: if cli.prod {
            RegistryEnvironment::Production
        } else {
            RegistryEnvironment::Staging
        },
    };
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    migrate::run_migrate(&settings, &cfg, progress, cli.json).await
}
