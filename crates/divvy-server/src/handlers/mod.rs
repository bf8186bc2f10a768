//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod dss;
pub mod entities;
pub mod health;
pub mod months;

// Re-export all handlers for use in router
pub use audit::*;
pub use dss::*;
pub use entities::*;
pub use health::*;
pub use months::*;
