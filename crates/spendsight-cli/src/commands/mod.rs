//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Analysis commands (analyze, strategy, compare)
//! - `core` - Core commands (init, config) and shared utilities (open_db, load_config)
//! - `import` - CSV import
//! - `users` - User management commands

pub mod analyze;
pub mod core;
pub mod import;
pub mod users;

// Re-export command functions for main.rs
pub use analyze::*;
pub use core::*;
pub use import::*;
pub use users::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
