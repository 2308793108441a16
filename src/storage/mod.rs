//! Storage Layer
//!
//! File-backed persistence for analyzer settings.

pub mod config;

pub use config::ConfigStore;
