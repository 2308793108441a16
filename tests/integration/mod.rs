//! Integration Tests Module
//!
//! End-to-end tests of the analyzer against a scripted model provider.
//! Covers strategy selection, routing, retries and partial failure,
//! self-evaluation, cancellation, and pre-flight checks.

// Scripted provider and fixtures
mod support;

// Strategy, routing, retry and failure paths
mod analysis_test;

// Optional review pass
mod evaluation_test;

// Cancellation and partial results
mod cancellation_test;

// Validation and configuration errors before any model call
mod preflight_test;
