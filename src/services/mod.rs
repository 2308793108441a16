//! Services
//!
//! Business logic of the analyzer. The orchestrator composes the rest into one
//! request/response cycle.

pub mod context;
pub mod deployment;
pub mod evaluation;
pub mod linker;
pub mod merge;
pub mod orchestrator;
pub mod phase;
pub mod progress;
pub mod strategy;

pub use context::{ContextAssembler, PhaseDigest};
pub use deployment::DeploymentRouter;
pub use evaluation::SelfEvaluator;
pub use linker::RelationshipLinker;
pub use orchestrator::AnalysisOrchestrator;
pub use phase::{PhaseExecutor, PhasePlan, RetryPolicy};
pub use progress::{PhaseEnd, ProgressReporter};
pub use strategy::{StrategyDecision, StrategySelector};
