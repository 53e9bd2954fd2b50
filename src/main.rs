use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate::{config, routes, state::AppState};
use facegate_vision::OnnxEncoder;
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facegate")]
#[command(version, about = "Face-recognition attendance kiosk backend")]
struct Cli {
    /// Config file path (defaults to the compiled-in location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured bind address
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Open config file in editor, writing defaults first if absent
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            let cfg = config::load_config(cli.config.as_deref())?;
            serve(cfg, bind).await
        }
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

async fn serve(mut cfg: config::Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        cfg.bind = bind;
    }
    if cfg.admin_password == config::Config::default().admin_password {
        warn!("admin password is the built-in default; change it in the config file");
    }

    info!("Loading face models");
    let encoder = OnnxEncoder::load(
        &cfg.detector_model,
        &cfg.recognizer_model,
        cfg.detector_threshold,
    )
    .context("Failed to initialize face encoder")?;

    let state = AppState::new(cfg.clone(), Box::new(encoder))?;
    state.audit.append("=== SYSTEM STARTED ===");

    info!("Face approval system listening on {}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    axum::serve(listener, routes::router(state))
        .await
        .context("server error")?;
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&config::CONFIG_PATH);
    if !path.exists() {
        config::save_config(&config::Config::default(), Some(path))?;
        info!("Wrote default config to {}", path.display());
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    info!("Opening config file: {}", path.display());

    let status = std::process::Command::new(editor)
        .arg(path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
