//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (load_config, load_state)
//! - `model` - Model commands (fit, forecast)
//! - `views` - Dashboard views (history, ars, amounts, summary)
//! - `serve` - Web server command

pub mod core;
pub mod model;
pub mod serve;
pub mod views;

// Re-export command functions for main.rs
pub use core::*;
pub use model::*;
pub use serve::*;
pub use views::*;

/// Format an optional number, or a dash when missing
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}
