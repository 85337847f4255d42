use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notefiler::config::Settings;
use notefiler::services::gemini_service::GeminiClient;
use notefiler::services::run_service::RunCoordinator;
use notefiler::services::vault_service::FsVault;
use notefiler::services::watch_service;
use notefiler::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "notefiler",
    version,
    about = "Files new Markdown notes from a vault inbox into folders picked by a language model"
)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, value_name = "PATH", env = "NOTEFILER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every note currently in the inbox, once
    Run,
    /// Watch the vault and classify new notes until interrupted
    Watch,
    /// Check that the configured API key works
    Verify,
}

fn wire(settings: &Settings) -> (Arc<AppState>, Arc<RunCoordinator>) {
    let state = Arc::new(AppState::new());
    let coordinator = Arc::new(RunCoordinator::new(
        state.clone(),
        Arc::new(FsVault::new(settings.vault_dir.clone())),
        Arc::new(GeminiClient::from_settings(settings)),
    ));
    (state, coordinator)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let settings = Settings::load(&config_path)
        .with_context(|| format!("failed to load settings from {}", config_path.display()))?;

    match cli.command {
        Command::Run => {
            settings.validate()?;
            let (_state, coordinator) = wire(&settings);
            let summary = coordinator.start_run(&settings).await?;
            info!(%summary, "run complete");
        }
        Command::Watch => {
            settings.validate()?;
            let (state, coordinator) = wire(&settings);
            let settings = Arc::new(settings);
            let watcher = watch_service::start_watching(coordinator.clone(), settings.clone())?;
            state.set_watcher(Some(watcher));
            watch_service::restart_auto_run(&state, coordinator, settings.clone());
            info!(
                vault = %settings.vault_dir.display(),
                watch_folder = %settings.watch_folder,
                "watching for new notes"
            );
            tokio::signal::ctrl_c()
                .await
                .context("failed to wait for ctrl-c")?;
            state.stop_auto_run();
            state.set_watcher(None);
            info!("shutting down");
        }
        Command::Verify => {
            let client = GeminiClient::from_settings(&settings);
            if client.verify_credential().await? {
                info!("credential verified");
            } else {
                anyhow::bail!("credential probe returned an unexpected reply");
            }
        }
    }
    Ok(())
}
