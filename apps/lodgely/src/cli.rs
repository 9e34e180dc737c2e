//! # CLI
//!
//! `lodgely [OPTIONS] [serve|migrate|purge-tokens]`. Without a subcommand the
//! server starts.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use lodgely_core::{CoreError, Database};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::api::{AppState, router};
use crate::config::Config;
use crate::mailer::{LogMailer, Mailer, ResendMailer};

#[derive(Debug, Parser)]
#[command(name = "lodgely", version, about = "Lodgely rental marketplace API server")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve,
    /// Create the database schema and exit.
    Migrate,
    /// Delete expired session tokens.
    PurgeTokens,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("database error: {0}")]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn open_database(config: &Config) -> Result<Database, CoreError> {
    Database::open(&config.database)
}

/// Resend when an API key is configured, otherwise log messages.
pub fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    match config.resend_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Arc::new(ResendMailer::new(key, config.mail_from.clone())),
        None => {
            info!("no Resend API key configured, emails will be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Open (and so migrate) the database. Returns the tables present.
pub fn cmd_migrate(config: &Config) -> Result<Vec<String>, CliError> {
    let db = open_database(config)?;
    let tables = db.table_names()?;
    info!(database = %config.database.display(), tables = ?tables, "schema ready");
    Ok(tables)
}

/// Remove expired session tokens. Returns how many were deleted.
pub fn cmd_purge_tokens(config: &Config) -> Result<usize, CliError> {
    let db = open_database(config)?;
    let removed = db.delete_expired_tokens()?;
    info!(removed, "expired tokens purged");
    Ok(removed)
}

pub async fn cmd_serve(config: Config) -> Result<(), CliError> {
    let db = open_database(&config)?;
    let mailer = build_mailer(&config);
    let addr = config.addr;
    let state = AppState::new(db, config, mailer);
    let app = router(state);

    info!("Binding to {addr}");
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd_serve(cli.config).await,
        Command::Migrate => cmd_migrate(&cli.config).map(|_| ()),
        Command::PurgeTokens => cmd_purge_tokens(&cli.config).map(|_| ()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
