//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init command and shared utilities (open_db)
//! - `dashboard` - Spending summary and installment projections
//! - `import` - Receipt parsing through the parser service
//! - `purchases` - Purchase commands (list, add, delete, save)
//! - `serve` - Web server command
//! - `status` - Database status command

pub mod core;
pub mod dashboard;
pub mod import;
pub mod purchases;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use core::*;
pub use dashboard::*;
pub use import::*;
pub use purchases::*;
pub use serve::*;
pub use status::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
