//! Deployment Routing Service

pub mod router;

pub use router::DeploymentRouter;
