//! Import command implementation

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use spendsight_core::{import::parse_csv, Database};

pub fn cmd_import(db: &Database, user_id: i64, file: &Path) -> Result<()> {
    if db.get_user(user_id)?.is_none() {
        bail!(
            "User {} not found. Add one with: spendsight users add --name NAME",
            user_id
        );
    }

    println!("📥 Importing {} for user {}...", file.display(), user_id);

    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let transactions = parse_csv(csv_file, user_id)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    println!("   Found {} transactions", transactions.len());

    let mut imported = 0;
    let mut skipped = 0;

    for tx in &transactions {
        match db.insert_transaction(user_id, tx)? {
            Some(_) => imported += 1,
            None => skipped += 1,
        }
    }

    println!("✅ Import complete!");
    println!("   Imported: {}", imported);
    println!("   Skipped (duplicates): {}", skipped);

    Ok(())
}
