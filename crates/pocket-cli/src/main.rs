mod cli;
mod commands;
mod repl;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pocket_chat::credentials::login;
use pocket_chat::{ChatError, CredentialContext, HttpBackend, SessionClient};
use pocket_common::{ConfigError, PocketError};
use pocket_config::PocketConfig;

use crate::cli::{Args, Command};

pub(crate) fn chat_err(e: ChatError) -> PocketError {
    PocketError::Chat(e.to_string())
}

fn load_config(args: &Args) -> Result<PocketConfig, ConfigError> {
    match &args.config {
        Some(path) => pocket_config::load_config_from(path),
        None => pocket_config::load_config(),
    }
}

/// `--log-level`, else `RUST_LOG`, else the config file's level.
fn init_logging(args: &Args, config: &PocketConfig) {
    let fallback = config.logging.level.as_directive();
    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(fallback)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args, mut config: PocketConfig) -> Result<(), PocketError> {
    if let Some(url) = args.base_url {
        config.backend.base_url = url;
        pocket_config::validation::validate(&config)?;
    }

    let credentials = CredentialContext::new();
    let backend = HttpBackend::new(&config.backend, credentials.clone()).map_err(chat_err)?;
    let backend = Arc::new(backend);
    tracing::info!(base_url = %config.backend.base_url, "backend configured");

    let command = args.command.unwrap_or(Command::Chat);
    if matches!(command, Command::Health) {
        return commands::health(&backend).await;
    }

    match (args.username.as_deref(), args.password.as_deref()) {
        (Some(username), Some(password)) => {
            login(&*backend, &credentials, username, password, args.role)
                .await
                .map_err(|e| PocketError::Login(e.to_string()))?;
        }
        (Some(_), None) => {
            return Err(PocketError::Login(
                "password required (--password or POCKET_PASSWORD)".into(),
            ))
        }
        _ => tracing::warn!("no credentials given, continuing unauthenticated"),
    }

    match command {
        Command::Chat => {
            let mut client = SessionClient::new(backend.clone(), &config.chat);
            repl::run(&mut client, &credentials).await
        }
        Command::Sessions => commands::sessions(&backend).await,
        Command::Admin { action } => commands::admin(&backend, action).await,
        Command::Health => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let (config, config_error) = match load_config(&args) {
        Ok(config) => (config, None),
        Err(e) => (PocketConfig::default(), Some(e)),
    };
    init_logging(&args, &config);

    tracing::info!("pocket v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    if let Err(e) = run(args, config).await {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
