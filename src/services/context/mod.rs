//! Context Assembly Service
//!
//! Builds per-phase prompts and the cascade digest.

pub mod assembler;
pub mod digest;

pub use assembler::{AssembledPrompt, ContextAssembler, PartialOutput, PhaseContext};
pub use digest::PhaseDigest;
