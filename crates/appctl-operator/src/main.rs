use anyhow::{Context as _, Result};
use appctl_core::App;
use appctl_operator::cli::{Cli, Command};
use appctl_operator::config::loader::{load_config, resolve_config_path};
use appctl_operator::{controller, observability};
use clap::Parser;
use kube::{Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or_default() {
        Command::Run => run(cli.config.as_deref()).await,
        Command::Crd => print_crd(),
        Command::Config => print_config(cli.config.as_deref()),
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(2);
    }
}

async fn run(config_arg: Option<&str>) -> Result<()> {
    observability::init_tracing();

    let (config_path, source) = resolve_config_path(config_arg);
    let cfg = load_config(Some(&config_path)).context("configuration error")?;
    tracing::info!(path = %config_path, source = %source, "Configuration loaded");
    observability::apply_logging_level(&cfg.logging.level);

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(token.clone()));

    controller::run(client, &cfg.controller, token).await;
    tracing::info!("Controller stopped");
    Ok(())
}

async fn cancel_on_shutdown_signal(token: CancellationToken) {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    token.cancel();
}

fn print_crd() -> Result<()> {
    let crd = serde_json::to_string_pretty(&App::crd()).context("failed to render CRD")?;
    println!("{crd}");
    Ok(())
}

fn print_config(config_arg: Option<&str>) -> Result<()> {
    let (config_path, _) = resolve_config_path(config_arg);
    let cfg = load_config(Some(&config_path)).context("configuration error")?;
    print!("{}", toml::to_string(&cfg).context("failed to render configuration")?);
    Ok(())
}
