//! Phase Execution Service
//!
//! The phase task graph, response parsing, the per-call retry state machine,
//! and the bounded-concurrency executor.

pub mod executor;
pub mod parsing;
pub mod plan;
pub mod retry;

pub use executor::{ExecutionOutcome, PhaseExecutor};
pub use parsing::parse_phase_output;
pub use plan::{PhasePlan, PhaseSpec};
pub use retry::{CallOutcome, RetryPolicy};
