//! Case Runner
//!
//! Runs one submission against one test case and classifies the result.
//! Program faults never escape this boundary as errors: sandbox
//! infrastructure failures are captured as an `internal_error` result and
//! judging continues with the next case.

use std::time::Duration;

use crate::constants::{DIFF_MAX_LINES, OUTPUT_TRUNCATE_BYTES};
use crate::models::{ErrorKind, Submission, TestCase, TestResult};
use crate::sandbox::{RunStatus, Sandbox};
use crate::utils::text::{bounded_diff, outputs_match, truncate_utf8};

/// One judged test case, plus whether the pipeline must stop early
#[derive(Debug)]
pub struct CaseOutcome {
    pub result: TestResult,
    /// Set on compilation failure: the failure is a property of the whole
    /// submission, so re-running the remaining cases would be pointless
    pub halt: bool,
}

/// Runs single test cases through a sandbox
pub struct CaseRunner<'a> {
    sandbox: &'a dyn Sandbox,
}

impl<'a> CaseRunner<'a> {
    pub fn new(sandbox: &'a dyn Sandbox) -> Self {
        Self { sandbox }
    }

    /// Execute one test case under the frozen time limit
    pub async fn run_case(
        &self,
        submission: &Submission,
        test_case: &TestCase,
        time_limit_seconds: f64,
        memory_limit_mb: u64,
    ) -> CaseOutcome {
        let mut result = TestResult::new(submission.id, test_case.id);

        let outcome = match self
            .sandbox
            .run(
                &submission.source_code,
                submission.language,
                &test_case.input,
                Duration::from_secs_f64(time_limit_seconds),
                memory_limit_mb,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(test_case = %test_case.id, "sandbox failure: {e}");
                result.error_kind = ErrorKind::InternalError;
                result.error_message = Some(e.to_string());
                return CaseOutcome {
                    result,
                    halt: false,
                };
            }
        };

        result.execution_time = Some(outcome.execution_time);
        result.memory_kb = outcome.memory_kb;
        result.exit_code = outcome.exit_code;
        result.stdout = Some(truncate_utf8(&outcome.stdout, OUTPUT_TRUNCATE_BYTES));
        result.stderr = Some(truncate_utf8(&outcome.stderr, OUTPUT_TRUNCATE_BYTES));

        match outcome.status {
            RunStatus::CompileError => {
                result.error_kind = ErrorKind::CompilationError;
                result.error_message = Some("compilation failed".to_string());
                return CaseOutcome { result, halt: true };
            }
            RunStatus::TimeLimitExceeded => {
                result.error_kind = ErrorKind::TimeLimitExceeded;
                result.error_message =
                    Some(format!("time limit exceeded ({time_limit_seconds}s)"));
            }
            RunStatus::MemoryLimitExceeded => {
                result.error_kind = ErrorKind::MemoryLimitExceeded;
                result.error_message = Some("memory limit exceeded".to_string());
            }
            RunStatus::StackOverflow => {
                result.error_kind = ErrorKind::StackOverflow;
                result.error_message = Some("stack overflow detected".to_string());
            }
            RunStatus::RuntimeError => {
                result.error_kind = ErrorKind::RuntimeError;
                result.error_message = Some(format!(
                    "runtime error (exit code: {})",
                    outcome.exit_code.unwrap_or(-1)
                ));
            }
            RunStatus::Success => {
                if outputs_match(&test_case.expected_output, &outcome.stdout) {
                    result.passed = true;
                    result.error_kind = ErrorKind::None;
                } else {
                    result.error_kind = ErrorKind::WrongAnswer;
                    result.error_message =
                        Some("output does not match expected result".to_string());
                    result.diff = Some(bounded_diff(
                        &test_case.expected_output,
                        &outcome.stdout,
                        DIFF_MAX_LINES,
                    ));
                }
            }
        }

        CaseOutcome {
            result,
            halt: false,
        }
    }
}
