//! Calibrator
//!
//! Measures reference-solution execution times per language on the largest
//! test case, derives a capped per-language time-limit adjustment factor,
//! and activates the calibration only when every language's measurements
//! were stable. Failures never activate anything: the problem simply keeps
//! judging against its base time limit.

pub mod stats;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::Config;
use crate::error::{JudgeError, JudgeResult};
use crate::models::{
    Calibration, CalibrationStatus, Language, LanguageTiming, Problem, TestCase,
};
use crate::sandbox::{RunStatus, Sandbox};
use crate::store::{CalibrationStore, ProblemStore, ReferenceSolutionStore};
use crate::utils::text::outputs_match;

/// Runs timing calibrations for problems
pub struct Calibrator {
    sandbox: Arc<dyn Sandbox>,
    problems: Arc<dyn ProblemStore>,
    solutions: Arc<dyn ReferenceSolutionStore>,
    calibrations: Arc<dyn CalibrationStore>,
    config: Config,
}

impl Calibrator {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        problems: Arc<dyn ProblemStore>,
        solutions: Arc<dyn ReferenceSolutionStore>,
        calibrations: Arc<dyn CalibrationStore>,
        config: Config,
    ) -> Self {
        Self {
            sandbox,
            problems,
            solutions,
            calibrations,
            config,
        }
    }

    /// Calibrate a problem, returning the record in its terminal state.
    ///
    /// The record is persisted through its lifecycle and returned even when
    /// calibration failed; only a reliable calibration replaces the
    /// problem's active pointer. Concurrent calibration of the same problem
    /// is not supported — callers serialize per problem.
    pub async fn calibrate(
        &self,
        problem_id: Uuid,
        repetitions: Option<u32>,
    ) -> JudgeResult<Calibration> {
        let repetitions = repetitions.unwrap_or(self.config.calibration.repetitions);

        let problem = self.problems.get_problem(problem_id).await?;
        let test_cases = self.problems.list_test_cases(problem_id).await?;
        let reference_case = select_reference_case(&test_cases).ok_or_else(|| {
            JudgeError::Calibration(format!("problem {problem_id} has no test cases"))
        })?;

        tracing::info!(
            problem = %problem_id,
            test_case = %reference_case.id,
            repetitions,
            "starting calibration"
        );

        let mut calibration = Calibration::new(
            problem_id,
            reference_case.id,
            repetitions,
            self.config.calibration.reference_language,
            self.config.calibration.factor_floor,
            self.config.calibration.factor_cap,
        );
        for &language in Language::ALL {
            calibration
                .images
                .insert(language, self.config.docker.image_for(language).to_string());
        }
        self.calibrations.persist_calibration(&calibration).await?;

        calibration.status = CalibrationStatus::Running;
        self.calibrations.persist_calibration(&calibration).await?;

        match self.execute(&mut calibration, &problem, reference_case).await {
            Ok(()) => {
                if calibration.is_reliable {
                    self.calibrations
                        .set_active(problem_id, calibration.id)
                        .await?;
                    tracing::info!(calibration = %calibration.id, "calibration activated");
                } else {
                    tracing::warn!(
                        calibration = %calibration.id,
                        status = %calibration.status,
                        "calibration finished unreliable; base time limit stays in effect"
                    );
                }
            }
            Err(e) => {
                // Failures are silent to submitters but must reach operators
                tracing::error!(calibration = %calibration.id, "calibration failed: {e}");
                calibration.status = CalibrationStatus::Failed;
                calibration.is_reliable = false;
                calibration.error_message = Some(e.to_string());
            }
        }

        self.calibrations.persist_calibration(&calibration).await?;
        Ok(calibration)
    }

    async fn execute(
        &self,
        calibration: &mut Calibration,
        problem: &Problem,
        reference_case: &TestCase,
    ) -> JudgeResult<()> {
        // Load and validate every reference solution before spending time
        // on measurement: a wrong reference invalidates the whole run
        let mut sources = BTreeMap::new();
        for &language in Language::ALL {
            let source = self
                .solutions
                .load_reference_solution(problem.id, language)
                .await?;
            self.validate_reference(&source, language, reference_case, problem)
                .await?;
            sources.insert(language, source);
        }

        for (&language, source) in &sources {
            let times = self
                .measure(source, language, reference_case, problem, calibration.repetitions)
                .await?;
            let timing = build_timing(times, self.config.calibration.threshold_for(language));
            tracing::info!(
                %language,
                median = timing.median,
                iqr = timing.iqr,
                status = %timing.status,
                "reference solution measured"
            );
            calibration.timings.insert(language, timing);
        }

        self.derive_factors(calibration)
    }

    /// Single correctness run under the generous validation timeout
    async fn validate_reference(
        &self,
        source: &str,
        language: Language,
        test_case: &TestCase,
        problem: &Problem,
    ) -> JudgeResult<()> {
        let timeout = Duration::from_secs_f64(self.config.calibration.validation_timeout_seconds);
        let outcome = self
            .sandbox
            .run(source, language, &test_case.input, timeout, problem.memory_limit_mb)
            .await?;

        if outcome.status != RunStatus::Success {
            return Err(JudgeError::Calibration(format!(
                "{language} reference solution failed on the reference test case: {}",
                outcome.status
            )));
        }
        if !outputs_match(&test_case.expected_output, &outcome.stdout) {
            return Err(JudgeError::Calibration(format!(
                "{language} reference solution produces incorrect output"
            )));
        }

        Ok(())
    }

    /// Timing runs, strictly sequential: overlapping measurements would
    /// contend for CPU and corrupt the statistics
    async fn measure(
        &self,
        source: &str,
        language: Language,
        test_case: &TestCase,
        problem: &Problem,
        repetitions: u32,
    ) -> JudgeResult<Vec<f64>> {
        let timeout = Duration::from_secs_f64(self.config.calibration.measurement_timeout_seconds);
        let mut times = Vec::with_capacity(repetitions as usize);

        for run in 0..repetitions {
            match self
                .sandbox
                .run(source, language, &test_case.input, timeout, problem.memory_limit_mb)
                .await
            {
                Ok(outcome) if outcome.status == RunStatus::Success => {
                    tracing::debug!(%language, run, time = outcome.execution_time, "timing run");
                    times.push(outcome.execution_time);
                }
                Ok(outcome) => {
                    tracing::warn!(%language, run, status = %outcome.status, "timing run discarded");
                }
                Err(e) => {
                    tracing::warn!(%language, run, "timing run failed: {e}");
                }
            }
        }

        if times.len() < (repetitions / 2) as usize {
            return Err(JudgeError::Calibration(format!(
                "too many failed runs for {language} ({}/{repetitions} succeeded)",
                times.len()
            )));
        }

        Ok(times)
    }

    /// Derive clamped adjustment factors and settle the overall status
    fn derive_factors(&self, calibration: &mut Calibration) -> JudgeResult<()> {
        let reference = calibration.reference_language;
        let reference_median = calibration
            .timings
            .get(&reference)
            .map(|timing| timing.median)
            .ok_or_else(|| {
                JudgeError::Calibration(format!("no timing for reference language {reference}"))
            })?;
        if reference_median <= 0.0 {
            return Err(JudgeError::Calibration(
                "reference language median is zero".to_string(),
            ));
        }

        for (&language, timing) in &calibration.timings {
            if language == reference || timing.median <= 0.0 {
                continue;
            }
            let raw = timing.median / reference_median;
            let factor = raw.clamp(calibration.factor_floor, calibration.factor_cap);
            tracing::info!(%language, raw_factor = raw, adjustment_factor = factor, "derived adjustment factor");
            calibration.adjustment_factors.insert(language, factor);
        }

        let all_stable = calibration
            .timings
            .values()
            .all(|timing| timing.status == CalibrationStatus::Stable);
        let all_measured = calibration.timings.values().all(|timing| {
            matches!(
                timing.status,
                CalibrationStatus::Stable | CalibrationStatus::Unstable
            )
        });
        let factors_complete =
            calibration.adjustment_factors.len() == calibration.timings.len() - 1;

        if all_stable && factors_complete {
            calibration.status = CalibrationStatus::Stable;
            calibration.is_reliable = true;
        } else if all_measured && factors_complete {
            calibration.status = CalibrationStatus::Unstable;
            calibration.is_reliable = false;
        } else {
            return Err(JudgeError::Calibration(
                "calibration produced no usable statistics".to_string(),
            ));
        }

        Ok(())
    }
}

/// Compute per-language timing statistics and classify their stability
fn build_timing(times: Vec<f64>, threshold: f64) -> LanguageTiming {
    let median = stats::median(&times);
    let iqr = stats::iqr(&times);
    let status = if median <= 0.0 {
        CalibrationStatus::Failed
    } else if iqr / median <= threshold {
        CalibrationStatus::Stable
    } else {
        CalibrationStatus::Unstable
    };

    LanguageTiming {
        times,
        median,
        iqr,
        status,
    }
}

/// Largest input wins; ties broken by the longer raw input text
pub(crate) fn select_reference_case(test_cases: &[TestCase]) -> Option<&TestCase> {
    test_cases
        .iter()
        .max_by_key(|tc| (tc.input_size(), tc.input.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;
    use crate::sandbox::RunOutcome;
    use crate::test_support::{MemoryStore, ScriptedSandbox, init_tracing, make_problem, make_test_case};

    fn calibrator(sandbox: ScriptedSandbox, store: Arc<MemoryStore>) -> Calibrator {
        init_tracing();
        Calibrator::new(
            Arc::new(sandbox),
            store.clone(),
            store.clone(),
            store,
            Config::default(),
        )
    }

    /// Script for a full calibration: one validation run per language, then
    /// `repetitions` timing runs per language, cpp before python.
    fn script(
        cpp_times: &[f64],
        python_times: &[f64],
    ) -> Vec<JudgeResult<RunOutcome>> {
        let mut runs = vec![
            Ok(RunOutcome::success("42\n".to_string(), 0.05)),
            Ok(RunOutcome::success("42\n".to_string(), 0.2)),
        ];
        for &time in cpp_times {
            runs.push(Ok(RunOutcome::success("42\n".to_string(), time)));
        }
        for &time in python_times {
            runs.push(Ok(RunOutcome::success("42\n".to_string(), time)));
        }
        runs
    }

    fn seeded_store() -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let problem = make_problem(1.0);
        let problem_id = problem.id;
        store.add_problem(problem);
        store.add_test_case(make_test_case(problem_id, "small", "42", 1.0));
        let mut largest = make_test_case(problem_id, "1 2 3 4 5 6 7 8 9 10", "42", 1.0);
        largest.name = "large".to_string();
        store.add_test_case(largest);
        store.add_solution(problem_id, Language::Cpp, "int main() {}");
        store.add_solution(problem_id, Language::Python, "print(42)");
        (store, problem_id)
    }

    #[tokio::test]
    async fn test_stable_calibration_computes_factor_and_activates() {
        let (store, problem_id) = seeded_store();
        let sandbox = ScriptedSandbox::new(script(
            &[0.05, 0.05, 0.05, 0.05, 0.05],
            &[0.2, 0.2, 0.2, 0.2, 0.2],
        ));
        let calibrator = calibrator(sandbox, store.clone());

        let calibration = calibrator.calibrate(problem_id, None).await.unwrap();

        assert_eq!(calibration.status, CalibrationStatus::Stable);
        assert!(calibration.is_reliable);
        assert_eq!(calibration.adjustment_factor(Language::Python), Some(4.0));
        assert_eq!(calibration.adjustment_factor(Language::Cpp), Some(1.0));
        // Reliable calibrations replace the active pointer
        let active = store.active_calibration(problem_id).await.unwrap().unwrap();
        assert_eq!(active.id, calibration.id);
    }

    #[tokio::test]
    async fn test_reference_case_is_largest_input() {
        let (store, problem_id) = seeded_store();
        let sandbox = ScriptedSandbox::new(script(
            &[0.05, 0.05, 0.05, 0.05, 0.05],
            &[0.2, 0.2, 0.2, 0.2, 0.2],
        ));
        let calibrator = calibrator(sandbox, store.clone());

        let calibration = calibrator.calibrate(problem_id, None).await.unwrap();

        let cases = store.list_test_cases(problem_id).await.unwrap();
        let largest = cases.iter().find(|tc| tc.name == "large").unwrap();
        assert_eq!(calibration.reference_test_case_id, largest.id);
    }

    #[tokio::test]
    async fn test_factor_is_capped() {
        let (store, problem_id) = seeded_store();
        let sandbox = ScriptedSandbox::new(script(
            &[0.1, 0.1, 0.1, 0.1, 0.1],
            &[2.0, 2.0, 2.0, 2.0, 2.0],
        ));
        let calibrator = calibrator(sandbox, store);

        let calibration = calibrator.calibrate(problem_id, None).await.unwrap();

        // Raw factor 20.0 exceeds the cap
        assert_eq!(calibration.adjustment_factor(Language::Python), Some(12.0));
        assert!(calibration.is_reliable);
    }

    #[tokio::test]
    async fn test_factor_never_tightens_below_parity() {
        let (store, problem_id) = seeded_store();
        let sandbox = ScriptedSandbox::new(script(
            &[0.1, 0.1, 0.1, 0.1, 0.1],
            &[0.05, 0.05, 0.05, 0.05, 0.05],
        ));
        let calibrator = calibrator(sandbox, store);

        let calibration = calibrator.calibrate(problem_id, None).await.unwrap();

        // Raw factor 0.5 is floored to parity
        assert_eq!(calibration.adjustment_factor(Language::Python), Some(1.0));
    }

    #[tokio::test]
    async fn test_noisy_language_marks_calibration_unreliable() {
        let (store, problem_id) = seeded_store();
        // Python relative IQR is 0.25/1.0 = 25%, over the 20% threshold
        let python_times = [0.8, 0.85, 0.875, 0.9, 0.95, 1.05, 1.1, 1.125, 1.15, 1.2];
        let cpp_times = [0.05; 10];
        let sandbox = ScriptedSandbox::new(script(&cpp_times, &python_times));
        let calibrator = calibrator(sandbox, store.clone());

        let calibration = calibrator.calibrate(problem_id, Some(10)).await.unwrap();

        assert_eq!(
            calibration.timings[&Language::Cpp].status,
            CalibrationStatus::Stable
        );
        assert_eq!(
            calibration.timings[&Language::Python].status,
            CalibrationStatus::Unstable
        );
        assert_eq!(calibration.status, CalibrationStatus::Unstable);
        assert!(!calibration.is_reliable);
        // Unreliable calibrations are never activated
        assert!(store.active_calibration(problem_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validation_mismatch_aborts_before_measurement() {
        let (store, problem_id) = seeded_store();
        let sandbox = ScriptedSandbox::new(vec![Ok(RunOutcome::success(
            "wrong\n".to_string(),
            0.05,
        ))]);
        let calibrator = calibrator(sandbox, store.clone());

        let calibration = calibrator.calibrate(problem_id, None).await.unwrap();

        assert_eq!(calibration.status, CalibrationStatus::Failed);
        assert!(!calibration.is_reliable);
        assert!(
            calibration
                .error_message
                .unwrap()
                .contains("incorrect output")
        );
        assert!(store.active_calibration(problem_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insufficient_successful_runs_fails() {
        let (store, problem_id) = seeded_store();
        let mut runs: Vec<JudgeResult<RunOutcome>> = vec![
            Ok(RunOutcome::success("42\n".to_string(), 0.05)),
            Ok(RunOutcome::success("42\n".to_string(), 0.2)),
            Ok(RunOutcome::success("42\n".to_string(), 0.05)),
        ];
        // Four of five cpp timing runs crash: only 1 success < 5/2
        for _ in 0..4 {
            let mut failed = RunOutcome::success(String::new(), 0.01);
            failed.status = RunStatus::RuntimeError;
            failed.exit_code = Some(1);
            runs.push(Ok(failed));
        }
        let sandbox = ScriptedSandbox::new(runs);
        let calibrator = calibrator(sandbox, store);

        let calibration = calibrator.calibrate(problem_id, None).await.unwrap();

        assert_eq!(calibration.status, CalibrationStatus::Failed);
        assert!(calibration.error_message.unwrap().contains("too many failed runs"));
    }

    #[tokio::test]
    async fn test_repetitions_are_sequential_and_counted() {
        let (store, problem_id) = seeded_store();
        let sandbox = ScriptedSandbox::new(script(
            &[0.05, 0.05, 0.05, 0.05, 0.05],
            &[0.2, 0.2, 0.2, 0.2, 0.2],
        ));
        let calls = sandbox.call_log();
        let calibrator = calibrator(sandbox, store);

        calibrator.calibrate(problem_id, None).await.unwrap();

        // 2 validations + 5 cpp + 5 python timing runs, in order
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 12);
        assert_eq!(calls[0].0, Language::Cpp);
        assert_eq!(calls[1].0, Language::Python);
        assert!(calls[2..7].iter().all(|(lang, _)| *lang == Language::Cpp));
        assert!(calls[7..].iter().all(|(lang, _)| *lang == Language::Python));
    }
}
