//! SpendSight CLI - Adaptive spending insights
//!
//! Usage:
//!   spendsight init                          Initialize database
//!   spendsight users add --name NAME         Create a user
//!   spendsight import --user 1 --file CSV    Import transactions
//!   spendsight analyze --user 1              Generate insights

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use spendsight_core::AIClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UsersAction::List) => commands::cmd_users_list(&db),
                Some(UsersAction::Add { name, email }) => {
                    commands::cmd_users_add(&db, &name, email.as_deref())
                }
            }
        }
        Commands::Import { user, file } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, user, &file)
        }
        Commands::Analyze {
            scope,
            max_chunks,
            chunk_size,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path, chunk_size, max_chunks)?;
            commands::cmd_analyze(db, AIClient::from_env(), config, &scope).await
        }
        Commands::Strategy { scope } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path, None, None)?;
            commands::cmd_strategy(db, config, &scope)
        }
        Commands::Compare { scope } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(config_path, None, None)?;
            commands::cmd_compare(db, config, &scope)
        }
        Commands::Config => {
            let config = commands::load_config(config_path, None, None)?;
            commands::cmd_config(&config, config_path)
        }
    }
}
