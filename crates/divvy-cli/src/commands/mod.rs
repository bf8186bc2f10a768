//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, seed-demo) and shared utilities (open_db)
//! - `entities` - Month, goal, debt, category, and constraint commands
//! - `plan` - Planning pipeline commands (score, prioritize, allocate, finalize)
//! - `serve` - Web server command
//! - `versions` - Committed plan version listing

pub mod core;
pub mod entities;
pub mod plan;
pub mod serve;
pub mod versions;

// Re-export command functions for main.rs
pub use core::*;
pub use entities::*;
pub use plan::*;
pub use serve::*;
pub use versions::*;

/// Truncate a string to a maximum length in chars, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Format an amount with thousands separators, e.g. 1234567.5 -> "1,234,568"
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{}", out)
    } else {
        out
    }
}
