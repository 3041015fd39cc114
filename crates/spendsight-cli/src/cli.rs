//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// SpendSight - Adaptive spending insights
#[derive(Parser)]
#[command(name = "spendsight")]
#[command(about = "Spending insights that scale with your transaction history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendsight.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SPENDSIGHT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Analytics config file (defaults to the user override, then built-in values)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// User and date range selection shared by the analysis commands
#[derive(Args, Debug, Clone)]
pub struct Scope {
    /// User id
    #[arg(short, long)]
    pub user: i64,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage users
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Import transactions from CSV (date,description,amount[,type][,category])
    Import {
        /// User the transactions belong to
        #[arg(short, long)]
        user: i64,

        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Generate spending insights with the size-appropriate strategy
    Analyze {
        #[command(flatten)]
        scope: Scope,

        /// Override the number of windows analyzed for large histories
        #[arg(long)]
        max_chunks: Option<usize>,

        /// Override the transactions per window
        #[arg(long)]
        chunk_size: Option<u64>,
    },

    /// Show which strategy would be used, without generating insights
    Strategy {
        #[command(flatten)]
        scope: Scope,
    },

    /// Compare all strategies for a dataset
    Compare {
        #[command(flatten)]
        scope: Scope,
    },

    /// Show the effective engine configuration
    Config,
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List users
    List,

    /// Add a user (returns the existing id if the email is taken)
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },
}
