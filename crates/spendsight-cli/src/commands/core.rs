//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Engine config with command-line overrides
//! - `cmd_init` - Initialize the database
//! - `cmd_config` - Show the effective configuration

use std::path::Path;

use anyhow::{Context, Result};
use spendsight_core::config::default_config_path;
use spendsight_core::db::DB_KEY_ENV;
use spendsight_core::{AnalyticsConfig, Database};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str)
            .with_context(|| format!("Failed to open database (is {} set?)", DB_KEY_ENV))
    }
}

/// Load the engine config, then apply `--chunk-size` / `--max-chunks`
pub fn load_config(
    path: Option<&Path>,
    chunk_size: Option<u64>,
    max_chunks: Option<usize>,
) -> Result<AnalyticsConfig> {
    let mut config = match path {
        Some(path) => AnalyticsConfig::from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AnalyticsConfig::load().context("Failed to load config")?,
    };

    if let Some(size) = chunk_size {
        config = config.with_chunk_size(size)?;
    }
    if let Some(max) = max_chunks {
        config = config.with_max_chunks(max)?;
    }
    Ok(config)
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a user: spendsight users add --name \"Your Name\"");
    println!("  2. Import transactions: spendsight import --user 1 --file statement.csv");
    println!("  3. Get insights: spendsight analyze --user 1");

    Ok(())
}

pub fn cmd_config(config: &AnalyticsConfig, path: Option<&Path>) -> Result<()> {
    println!();
    println!("⚙️  Analytics Configuration");
    println!("   ─────────────────────────────");

    match (path, default_config_path()) {
        (Some(path), _) => println!("   Source: {}", path.display()),
        (None, Some(default)) if default.exists() => {
            println!("   Source: {}", default.display())
        }
        _ => println!("   Source: built-in defaults"),
    }

    println!();
    println!(
        "   Raw data:           fewer than {} transactions",
        config.raw_threshold
    );
    println!(
        "   Summary:            fewer than {} transactions",
        config.summary_threshold
    );
    println!(
        "   Chunked otherwise:  {} per window, at most {} windows",
        config.chunk_size, config.max_chunks
    );
    println!(
        "   Raw token estimate: {} per transaction",
        config.raw_tokens_per_transaction
    );

    Ok(())
}
