//! Interface boundary to the embedding application
//!
//! The core never performs durable storage of its own: it reads problems,
//! test cases and reference solutions through these traits and emits
//! fully-formed records back through them. The owning application supplies
//! the implementations (SQL, files, in-memory, ...).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::JudgeResult;
use crate::models::{Calibration, Language, Problem, Submission, TestResult, TestCase};

/// Read access to problems and their test cases
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn get_problem(&self, problem_id: Uuid) -> JudgeResult<Problem>;

    /// Test cases in creation order. Judging iterates them in exactly the
    /// order returned here.
    async fn list_test_cases(&self, problem_id: Uuid) -> JudgeResult<Vec<TestCase>>;
}

/// Lookup of known-correct reference solutions, used only for calibration
#[async_trait]
pub trait ReferenceSolutionStore: Send + Sync {
    async fn load_reference_solution(
        &self,
        problem_id: Uuid,
        language: Language,
    ) -> JudgeResult<String>;
}

/// Persistence of calibration records and the per-problem active pointer
#[async_trait]
pub trait CalibrationStore: Send + Sync {
    /// Persist or update a calibration record
    async fn persist_calibration(&self, calibration: &Calibration) -> JudgeResult<()>;

    /// The currently active calibration for a problem, if any
    async fn active_calibration(&self, problem_id: Uuid) -> JudgeResult<Option<Calibration>>;

    /// Replace the active pointer for a problem. Must be atomic: the last
    /// calibrator to finish successfully wins, and readers never observe a
    /// problem with two active calibrations.
    async fn set_active(&self, problem_id: Uuid, calibration_id: Uuid) -> JudgeResult<()>;
}

/// Persistence of judging output
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist or update a submission record
    async fn persist_submission(&self, submission: &Submission) -> JudgeResult<()>;

    /// Persist one test result; called as each result completes
    async fn persist_test_result(&self, result: &TestResult) -> JudgeResult<()>;
}
