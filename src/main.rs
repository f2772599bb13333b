// src/main.rs — tutorlink entry point

use clap::Parser;

use tutorlink::cli::{self, Cli};
use tutorlink::infra::config::Config;
use tutorlink::infra::{logger, paths};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respects RUST_LOG; -v raises the default
    logger::init_logging(logger::level_for(cli.verbose));

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Falls back to defaults if no config.toml
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?.with_env()
    } else {
        Config::load()?
    };
    if let Some(email) = cli.email {
        config.learner.email = Some(email);
    }
    if let Err(e) = paths::ensure_dirs().await {
        tracing::debug!("could not create tutorlink directories: {e}");
    }
    tracing::debug!(api = %config.service.api_base, ai = %config.service.ai_base, "config loaded");

    cli::dispatch(cli.command, &config).await
}
