//! Data Models
//!
//! Contains all data structures used throughout the analyzer.

pub mod analysis;
pub mod output;
pub mod phase;
pub mod request;
pub mod settings;
pub mod strategy;

pub use analysis::*;
pub use output::*;
pub use phase::*;
pub use request::*;
pub use settings::*;
pub use strategy::*;
