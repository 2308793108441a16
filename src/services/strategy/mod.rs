//! Strategy Selection Service
//!
//! Chooses how many model calls an analysis makes.
//!
//! ## Strategies
//! - **Basic**: one call for everything
//! - **Hybrid**: two concurrent extraction calls plus consolidation
//! - **Advanced**: cascading window passes plus consolidation

pub mod selector;

pub use selector::{StrategyDecision, StrategySelector};
