//! User command implementations

use anyhow::Result;
use spendsight_core::Database;

use super::truncate;

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users found. Add one with:");
        println!("  spendsight users add --name \"Your Name\"");
        return Ok(());
    }

    println!();
    println!("👤 Users");
    println!("   ─────────────────────────────────────────────");

    for user in users {
        println!(
            "   {:>4}  {:<24} {}",
            user.id,
            truncate(&user.name, 24),
            user.email.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

pub fn cmd_users_add(db: &Database, name: &str, email: Option<&str>) -> Result<()> {
    let id = db.upsert_user(name, email)?;
    println!("✅ User {} (id {})", name, id);
    Ok(())
}
