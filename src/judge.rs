//! Judge Pipeline
//!
//! Orchestrates a full submission: resolves and freezes the effective time
//! limit, runs every test case in creation order through the Case Runner,
//! aggregates the weighted score and resolves the overall verdict by error
//! priority. A submission always reaches a terminal state: `completed`
//! with a verdict, or `failed` when the infrastructure itself broke.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{JudgeError, JudgeResult};
use crate::models::{
    ErrorKind, Language, Problem, Submission, SubmissionStatus, TestCase, TestResult, Verdict,
};
use crate::resolve::effective_time_limit;
use crate::runner::CaseRunner;
use crate::sandbox::Sandbox;
use crate::store::{CalibrationStore, ProblemStore, ResultSink};

/// Judges submissions end to end
pub struct JudgeService {
    sandbox: Arc<dyn Sandbox>,
    problems: Arc<dyn ProblemStore>,
    calibrations: Arc<dyn CalibrationStore>,
    results: Arc<dyn ResultSink>,
    config: Config,
}

impl JudgeService {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        problems: Arc<dyn ProblemStore>,
        calibrations: Arc<dyn CalibrationStore>,
        results: Arc<dyn ResultSink>,
        config: Config,
    ) -> Self {
        Self {
            sandbox,
            problems,
            calibrations,
            results,
            config,
        }
    }

    /// Judge source code against every test case of a problem.
    ///
    /// Synchronous from the caller's view: returns once all test cases are
    /// judged. Test cases of one submission run strictly sequentially.
    pub async fn judge(
        &self,
        problem_id: Uuid,
        language: Language,
        source_code: String,
        user_id: Option<String>,
    ) -> JudgeResult<Submission> {
        let problem = self.problems.get_problem(problem_id).await?;
        if !problem.is_active {
            return Err(JudgeError::Validation(format!(
                "problem {problem_id} is not accepting submissions"
            )));
        }
        if source_code.len() > self.config.limits.max_source_code_bytes {
            return Err(JudgeError::Validation(format!(
                "source code too large (max {} bytes)",
                self.config.limits.max_source_code_bytes
            )));
        }
        let test_cases = self.problems.list_test_cases(problem_id).await?;
        if test_cases.is_empty() {
            return Err(JudgeError::Validation(format!(
                "problem {problem_id} has no test cases"
            )));
        }

        let calibration = self.calibrations.active_calibration(problem_id).await?;
        let time_limit = effective_time_limit(&problem, calibration.as_ref(), language);

        let mut submission = Submission::new(problem_id, language, source_code, user_id);
        // Frozen before any test result exists and never changed afterwards
        submission.time_limit_used = Some(time_limit);
        self.results.persist_submission(&submission).await?;

        submission.status = SubmissionStatus::Running;
        self.results.persist_submission(&submission).await?;
        tracing::info!(
            submission = %submission.id,
            %language,
            time_limit,
            "judging submission"
        );

        match self
            .run_all_cases(&mut submission, &problem, &test_cases, time_limit)
            .await
        {
            Ok(()) => {
                submission.status = SubmissionStatus::Completed;
                submission.judged_at = Some(Utc::now());
                self.results.persist_submission(&submission).await?;
                tracing::info!(
                    submission = %submission.id,
                    verdict = %submission.verdict.unwrap_or(Verdict::InternalError),
                    passed = submission.passed_count,
                    total = submission.total_count,
                    "submission judged"
                );
                Ok(submission)
            }
            Err(e) => {
                // Infrastructure failure: record it and surface it to the
                // caller, distinct from a judged internal_error result
                submission.status = SubmissionStatus::Failed;
                submission.error_message = Some(e.to_string());
                if let Err(persist_err) = self.results.persist_submission(&submission).await {
                    tracing::error!(
                        submission = %submission.id,
                        "failed to persist failed submission: {persist_err}"
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_all_cases(
        &self,
        submission: &mut Submission,
        problem: &Problem,
        test_cases: &[TestCase],
        time_limit: f64,
    ) -> JudgeResult<()> {
        let runner = CaseRunner::new(self.sandbox.as_ref());
        let mut results = Vec::with_capacity(test_cases.len());
        let mut halted = false;

        for test_case in test_cases {
            let result = if halted {
                // The sandbox would fail identically; synthesize the result
                // instead of re-running
                let mut result = TestResult::new(submission.id, test_case.id);
                result.error_kind = ErrorKind::InternalError;
                result.error_message =
                    Some("execution terminated early: compilation failed".to_string());
                result
            } else {
                let outcome = runner
                    .run_case(submission, test_case, time_limit, problem.memory_limit_mb)
                    .await;
                if outcome.halt {
                    halted = true;
                    submission.error_message = outcome.result.stderr.clone();
                }
                outcome.result
            };

            // Persisted as each case completes, before the overall verdict
            self.results.persist_test_result(&result).await?;
            results.push(result);
        }

        submission.total_count = results.len() as u32;
        submission.passed_count = results.iter().filter(|r| r.passed).count() as u32;
        submission.execution_time_total =
            Some(results.iter().filter_map(|r| r.execution_time).sum());
        submission.score = Some(weighted_score(&results, test_cases));
        submission.verdict = Some(Verdict::from_results(&results));

        Ok(())
    }
}

/// Weighted score in [0, 1]: passed weight over total weight.
///
/// With zero total weight there is nothing to apportion; all-passed counts
/// as full score.
fn weighted_score(results: &[TestResult], test_cases: &[TestCase]) -> f64 {
    let total: f64 = test_cases.iter().map(|tc| tc.weight).sum();
    if total <= 0.0 {
        return if results.iter().all(|r| r.passed) {
            1.0
        } else {
            0.0
        };
    }

    let passed: f64 = results
        .iter()
        .zip(test_cases)
        .filter(|(result, _)| result.passed)
        .map(|(_, tc)| tc.weight)
        .sum();

    passed / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CalibrationStatus;
    use crate::sandbox::{RunOutcome, RunStatus};
    use crate::test_support::{MemoryStore, ScriptedSandbox, init_tracing, make_problem, make_test_case};

    fn service(sandbox: ScriptedSandbox, store: Arc<MemoryStore>) -> JudgeService {
        init_tracing();
        JudgeService::new(
            Arc::new(sandbox),
            store.clone(),
            store.clone(),
            store,
            Config::default(),
        )
    }

    fn seeded_store(expected: &[(&str, &str, f64)]) -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let problem = make_problem(1.0);
        let problem_id = problem.id;
        store.add_problem(problem);
        for &(input, output, weight) in expected {
            store.add_test_case(make_test_case(problem_id, input, output, weight));
        }
        (store, problem_id)
    }

    #[tokio::test]
    async fn test_accepted_when_every_case_passes() {
        let (store, problem_id) = seeded_store(&[("1 2", "3", 1.0), ("2 3", "5", 1.0)]);
        let sandbox = ScriptedSandbox::new(vec![
            Ok(RunOutcome::success("3\n".to_string(), 0.01)),
            Ok(RunOutcome::success("5\n".to_string(), 0.01)),
        ]);
        let service = service(sandbox, store.clone());

        let submission = service
            .judge(problem_id, Language::Cpp, "src".to_string(), None)
            .await
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Completed);
        assert_eq!(submission.verdict, Some(Verdict::Accepted));
        assert_eq!(submission.score, Some(1.0));
        assert_eq!(submission.passed_count, 2);
        assert_eq!(submission.total_count, 2);
        assert_eq!(store.test_results.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_compile_error_invokes_sandbox_exactly_once() {
        let (store, problem_id) =
            seeded_store(&[("1", "1", 1.0), ("2", "2", 1.0), ("3", "3", 1.0)]);
        let sandbox = ScriptedSandbox::new(vec![Ok(RunOutcome::compile_error(
            1,
            "error: expected ';'".to_string(),
        ))]);
        let calls = sandbox.call_log();
        let service = service(sandbox, store.clone());

        let submission = service
            .judge(problem_id, Language::Cpp, "src".to_string(), None)
            .await
            .unwrap();

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(submission.verdict, Some(Verdict::CompilationError));
        assert_eq!(submission.score, Some(0.0));

        let results = store.test_results.lock().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].error_kind, ErrorKind::CompilationError);
        for synthetic in &results[1..] {
            assert_eq!(synthetic.error_kind, ErrorKind::InternalError);
            assert!(!synthetic.passed);
        }
    }

    #[tokio::test]
    async fn test_verdict_priority_tle_over_wrong_answer() {
        let (store, problem_id) = seeded_store(&[("1", "1", 1.0), ("2", "2", 1.0)]);
        let sandbox = ScriptedSandbox::new(vec![
            Ok(RunOutcome::success("9\n".to_string(), 0.01)),
            Ok(RunOutcome::time_limit(1.2)),
        ]);
        let service = service(sandbox, store);

        let submission = service
            .judge(problem_id, Language::Cpp, "src".to_string(), None)
            .await
            .unwrap();

        assert_eq!(submission.verdict, Some(Verdict::TimeLimitExceeded));
        assert_eq!(submission.passed_count, 0);
    }

    #[tokio::test]
    async fn test_weighted_score() {
        let (store, problem_id) =
            seeded_store(&[("1", "1", 3.0), ("2", "2", 1.0), ("3", "3", 1.0)]);
        let sandbox = ScriptedSandbox::new(vec![
            Ok(RunOutcome::success("1\n".to_string(), 0.01)),
            Ok(RunOutcome::success("9\n".to_string(), 0.01)),
            Ok(RunOutcome::success("3\n".to_string(), 0.01)),
        ]);
        let service = service(sandbox, store);

        let submission = service
            .judge(problem_id, Language::Cpp, "src".to_string(), None)
            .await
            .unwrap();

        assert_eq!(submission.passed_count, 2);
        assert_eq!(submission.score, Some(0.8));
        assert_eq!(submission.verdict, Some(Verdict::WrongAnswer));
    }

    #[tokio::test]
    async fn test_calibrated_time_limit_is_frozen_and_passed_to_sandbox() {
        let (store, problem_id) = seeded_store(&[("1", "1", 1.0)]);

        // Active reliable calibration: python factor 4.0 over a 1.0s base
        let mut calibration = crate::models::Calibration::new(
            problem_id,
            Uuid::new_v4(),
            5,
            Language::Cpp,
            1.0,
            12.0,
        );
        calibration
            .adjustment_factors
            .insert(Language::Python, 4.0);
        calibration.status = CalibrationStatus::Stable;
        calibration.is_reliable = true;
        store.add_active_calibration(calibration);

        // A slow solution at 4.5s exceeds even the adjusted 4.0s limit
        let sandbox = ScriptedSandbox::new(vec![Ok(RunOutcome::time_limit(4.5))]);
        let calls = sandbox.call_log();
        let service = service(sandbox, store);

        let submission = service
            .judge(problem_id, Language::Python, "src".to_string(), None)
            .await
            .unwrap();

        assert_eq!(submission.time_limit_used, Some(4.0));
        assert_eq!(calls.lock().unwrap()[0], (Language::Python, 4.0));
        assert_eq!(submission.verdict, Some(Verdict::TimeLimitExceeded));
    }

    #[tokio::test]
    async fn test_sandbox_infrastructure_failure_is_a_judged_internal_error() {
        let (store, problem_id) = seeded_store(&[("1", "1", 1.0), ("2", "2", 1.0)]);
        let sandbox = ScriptedSandbox::new(vec![
            Err(JudgeError::Docker("daemon unreachable".to_string())),
            Ok(RunOutcome::success("2\n".to_string(), 0.01)),
        ]);
        let service = service(sandbox, store);

        let submission = service
            .judge(problem_id, Language::Cpp, "src".to_string(), None)
            .await
            .unwrap();

        // Judging continued past the broken case and still completed
        assert_eq!(submission.status, SubmissionStatus::Completed);
        assert_eq!(submission.verdict, Some(Verdict::InternalError));
        assert_eq!(submission.passed_count, 1);
    }

    #[tokio::test]
    async fn test_inactive_problem_is_rejected() {
        let store = Arc::new(MemoryStore::default());
        let mut problem = make_problem(1.0);
        problem.is_active = false;
        let problem_id = problem.id;
        store.add_problem(problem);

        let sandbox = ScriptedSandbox::new(vec![]);
        let service = service(sandbox, store);

        let result = service
            .judge(problem_id, Language::Cpp, "src".to_string(), None)
            .await;
        assert!(matches!(result, Err(JudgeError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_source_is_rejected() {
        let (store, problem_id) = seeded_store(&[("1", "1", 1.0)]);
        let sandbox = ScriptedSandbox::new(vec![]);
        let service = service(sandbox, store);

        let huge = "x".repeat(65_000);
        let result = service.judge(problem_id, Language::Cpp, huge, None).await;
        assert!(matches!(result, Err(JudgeError::Validation(_))));
    }

    #[test]
    fn test_weighted_score_zero_total_weight() {
        let problem_id = Uuid::new_v4();
        let submission_id = Uuid::new_v4();
        let cases = vec![
            make_test_case(problem_id, "1", "1", 0.0),
            make_test_case(problem_id, "2", "2", 0.0),
        ];
        let mut passed = TestResult::new(submission_id, cases[0].id);
        passed.passed = true;
        let mut passed_too = TestResult::new(submission_id, cases[1].id);
        passed_too.passed = true;

        assert_eq!(weighted_score(&[passed.clone(), passed_too], &cases), 1.0);

        let mut failed = TestResult::new(submission_id, cases[1].id);
        failed.error_kind = ErrorKind::WrongAnswer;
        assert_eq!(weighted_score(&[passed, failed], &cases), 0.0);
    }
}
