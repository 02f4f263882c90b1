//! Sandboxed program execution
//!
//! The [`Sandbox`] trait is the isolation capability: one call executes one
//! untrusted program once, inside a resource-capped context with a hard
//! wall-clock deadline, and classifies what happened. Backends are
//! swappable behind the trait; [`DockerSandbox`] is the container-runtime
//! implementation.

pub mod docker;
pub mod languages;
pub mod outcome;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::JudgeResult;
use crate::models::Language;

pub use docker::DockerSandbox;
pub use outcome::{RunOutcome, RunStatus};

/// Capability interface for isolated program execution
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Execute `source_code` once with stdin bound to `input`.
    ///
    /// The time limit is a hard wall-clock bound: on expiry the process is
    /// forcibly terminated, never asked politely. The memory cap is enforced
    /// by the execution context itself. No state survives between calls.
    ///
    /// `Err` means the sandbox backend failed (infrastructure); every
    /// property of the submitted program, including compile failures and
    /// crashes, is reported inside the [`RunOutcome`].
    async fn run(
        &self,
        source_code: &str,
        language: Language,
        input: &str,
        time_limit: Duration,
        memory_limit_mb: u64,
    ) -> JudgeResult<RunOutcome>;
}
