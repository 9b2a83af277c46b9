// crates/core/src/jobs/mod.rs
//! Job lifecycle: records, the session-scoped store, the download→separate
//! pipeline, expiry and cleanup.

pub mod orchestrator;
pub mod reclaim;
pub mod runner;
pub mod store;
pub mod sweeper;
pub mod types;

pub use orchestrator::JobOrchestrator;
pub use reclaim::reclaim_job;
pub use runner::{JobRunner, RunnerConfig, DEFAULT_JOB_TTL, DEFAULT_SWEEP_INTERVAL};
pub use store::{JobStore, RemovedJob};
pub use sweeper::{CleanupSweeper, SweepReport};
pub use types::*;
