//! Shared fakes for unit tests
//!
//! `ScriptedSandbox` replays pre-scripted outcomes so calibration and
//! judging logic can be exercised without a container runtime;
//! `MemoryStore` is an in-memory implementation of all store traits.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{JudgeError, JudgeResult};
use crate::models::{
    Calibration, Language, Problem, Submission, TestCase, TestResult,
};
use crate::sandbox::{RunOutcome, Sandbox};
use crate::store::{CalibrationStore, ProblemStore, ReferenceSolutionStore, ResultSink};

/// Sandbox fake that pops scripted outcomes in call order and records the
/// language and time limit of every call
pub struct ScriptedSandbox {
    script: Mutex<VecDeque<JudgeResult<RunOutcome>>>,
    calls: Arc<Mutex<Vec<(Language, f64)>>>,
}

impl ScriptedSandbox {
    pub fn new(outcomes: Vec<JudgeResult<RunOutcome>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the call log, usable after the sandbox moves into a service
    pub fn call_log(&self) -> Arc<Mutex<Vec<(Language, f64)>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn run(
        &self,
        _source_code: &str,
        language: Language,
        _input: &str,
        time_limit: Duration,
        _memory_limit_mb: u64,
    ) -> JudgeResult<RunOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push((language, time_limit.as_secs_f64()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("sandbox called more times than scripted")
    }
}

/// In-memory store implementing every trait boundary
#[derive(Default)]
pub struct MemoryStore {
    pub problems: Mutex<HashMap<Uuid, Problem>>,
    pub test_cases: Mutex<Vec<TestCase>>,
    pub solutions: Mutex<HashMap<(Uuid, Language), String>>,
    pub calibrations: Mutex<HashMap<Uuid, Calibration>>,
    /// problem id -> active calibration id
    pub active: Mutex<HashMap<Uuid, Uuid>>,
    pub submissions: Mutex<Vec<Submission>>,
    pub test_results: Mutex<Vec<TestResult>>,
}

impl MemoryStore {
    pub fn add_problem(&self, problem: Problem) {
        self.problems.lock().unwrap().insert(problem.id, problem);
    }

    pub fn add_test_case(&self, test_case: TestCase) {
        self.test_cases.lock().unwrap().push(test_case);
    }

    pub fn add_solution(&self, problem_id: Uuid, language: Language, source: &str) {
        self.solutions
            .lock()
            .unwrap()
            .insert((problem_id, language), source.to_string());
    }

    /// Insert a calibration and point the active slot at it
    pub fn add_active_calibration(&self, calibration: Calibration) {
        self.active
            .lock()
            .unwrap()
            .insert(calibration.problem_id, calibration.id);
        self.calibrations
            .lock()
            .unwrap()
            .insert(calibration.id, calibration);
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn get_problem(&self, problem_id: Uuid) -> JudgeResult<Problem> {
        self.problems
            .lock()
            .unwrap()
            .get(&problem_id)
            .cloned()
            .ok_or_else(|| JudgeError::NotFound(format!("problem {problem_id}")))
    }

    async fn list_test_cases(&self, problem_id: Uuid) -> JudgeResult<Vec<TestCase>> {
        Ok(self
            .test_cases
            .lock()
            .unwrap()
            .iter()
            .filter(|tc| tc.problem_id == problem_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReferenceSolutionStore for MemoryStore {
    async fn load_reference_solution(
        &self,
        problem_id: Uuid,
        language: Language,
    ) -> JudgeResult<String> {
        self.solutions
            .lock()
            .unwrap()
            .get(&(problem_id, language))
            .cloned()
            .ok_or_else(|| {
                JudgeError::NotFound(format!("{language} reference solution for {problem_id}"))
            })
    }
}

#[async_trait]
impl CalibrationStore for MemoryStore {
    async fn persist_calibration(&self, calibration: &Calibration) -> JudgeResult<()> {
        self.calibrations
            .lock()
            .unwrap()
            .insert(calibration.id, calibration.clone());
        Ok(())
    }

    async fn active_calibration(&self, problem_id: Uuid) -> JudgeResult<Option<Calibration>> {
        let active = self.active.lock().unwrap();
        let Some(calibration_id) = active.get(&problem_id) else {
            return Ok(None);
        };
        Ok(self.calibrations.lock().unwrap().get(calibration_id).cloned())
    }

    async fn set_active(&self, problem_id: Uuid, calibration_id: Uuid) -> JudgeResult<()> {
        self.active.lock().unwrap().insert(problem_id, calibration_id);
        Ok(())
    }
}

#[async_trait]
impl ResultSink for MemoryStore {
    async fn persist_submission(&self, submission: &Submission) -> JudgeResult<()> {
        let mut submissions = self.submissions.lock().unwrap();
        if let Some(existing) = submissions.iter_mut().find(|s| s.id == submission.id) {
            *existing = submission.clone();
        } else {
            submissions.push(submission.clone());
        }
        Ok(())
    }

    async fn persist_test_result(&self, result: &TestResult) -> JudgeResult<()> {
        self.test_results.lock().unwrap().push(result.clone());
        Ok(())
    }
}

/// Install a test subscriber so `RUST_LOG=debug cargo test` shows traces
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An active problem with the given base time limit in seconds
pub fn make_problem(base_time_limit: f64) -> Problem {
    Problem {
        id: Uuid::new_v4(),
        title: "A + B".to_string(),
        base_time_limit,
        memory_limit_mb: 128,
        max_input_size: 1_000_000,
        is_active: true,
        created_at: Utc::now(),
    }
}

/// A visible test case with the given input, expected output and weight
pub fn make_test_case(problem_id: Uuid, input: &str, expected: &str, weight: f64) -> TestCase {
    TestCase {
        id: Uuid::new_v4(),
        problem_id,
        name: "case".to_string(),
        input: input.to_string(),
        expected_output: expected.to_string(),
        weight,
        is_sample: false,
        is_hidden: true,
        input_size_hint: None,
        created_at: Utc::now(),
    }
}

/// A pending submission with placeholder source
pub fn make_submission(problem_id: Uuid, language: Language) -> Submission {
    Submission::new(problem_id, language, "source".to_string(), None)
}
