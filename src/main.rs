use std::path::PathBuf;

use anyhow::Context;
use axum::extract::FromRef;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod controllers;
mod error;
mod ids;
mod models;
mod storage;
mod types;

pub(crate) use error::{ApiResult, StoreResult};

use config::Config;
use storage::AnyStore;

/// Share text that disappears after a while or after a number of views.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Check whether the configured storage is ready, then exit.
    Check,
}

/// State shared by every request. Owns the one store used for the process lifetime.
#[derive(Clone, FromRef)]
pub struct App {
    pub config: Config,
    pub store: AnyStore,
}

#[cfg(test)]
impl App {
    /// An app in test mode around the given store.
    pub(crate) fn for_tests(store: impl Into<AnyStore>) -> Self {
        App {
            config: Config {
                base_url: "http://localhost:3000".to_owned(),
                port: 3000,
                test_mode: true,
                storage: config::Storage {
                    kind: config::StorageKind::Memory,
                    file: Default::default(),
                    remote: None,
                },
                limits: config::Limits {
                    max_upload_size: 65536,
                },
            },
            store: store.into(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let store = AnyStore::from_config(&config.storage).context("failed to set up storage")?;

    let app = App { config, store };

    match args.command {
        Command::Serve => commands::serve::run(app).await,
        Command::Check => commands::check::run(app).await,
    }
}
