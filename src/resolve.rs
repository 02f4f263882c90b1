//! Time-limit resolution
//!
//! Turns a problem's base time limit into the effective, language-fair
//! limit using the active calibration. Resolved once per submission and
//! frozen into `time_limit_used` so the judged outcome stays reproducible.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::JudgeResult;
use crate::models::{Calibration, Language, Problem};
use crate::store::{CalibrationStore, ProblemStore};

/// Effective time limit in seconds for (problem, language).
///
/// Pure and side-effect-free. With an active reliable calibration the
/// reference language keeps the problem's base limit unchanged and every
/// other language gets `base × adjustment_factor`; without one (or for a
/// language the calibration does not cover) the base limit applies.
pub fn effective_time_limit(
    problem: &Problem,
    calibration: Option<&Calibration>,
    language: Language,
) -> f64 {
    let Some(calibration) = calibration else {
        return problem.base_time_limit;
    };
    if !calibration.is_reliable {
        return problem.base_time_limit;
    }
    if language == calibration.reference_language {
        return problem.base_time_limit;
    }

    match calibration.adjustment_factors.get(&language) {
        Some(factor) => problem.base_time_limit * factor,
        None => problem.base_time_limit,
    }
}

/// Store-consulting wrapper around [`effective_time_limit`]
pub struct TimeLimitResolver {
    problems: Arc<dyn ProblemStore>,
    calibrations: Arc<dyn CalibrationStore>,
}

impl TimeLimitResolver {
    pub fn new(problems: Arc<dyn ProblemStore>, calibrations: Arc<dyn CalibrationStore>) -> Self {
        Self {
            problems,
            calibrations,
        }
    }

    /// Resolve the effective time limit for a problem and language
    pub async fn resolve(&self, problem_id: Uuid, language: Language) -> JudgeResult<f64> {
        let problem = self.problems.get_problem(problem_id).await?;
        let calibration = self.calibrations.active_calibration(problem_id).await?;
        Ok(effective_time_limit(&problem, calibration.as_ref(), language))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use uuid::Uuid;

    use super::*;
    use crate::models::{CalibrationStatus, LanguageTiming};
    use crate::test_support::make_problem;

    fn reliable_calibration(problem_id: Uuid, python_factor: f64) -> Calibration {
        let mut calibration =
            Calibration::new(problem_id, Uuid::new_v4(), 5, Language::Cpp, 1.0, 12.0);
        let mut timings = BTreeMap::new();
        timings.insert(
            Language::Cpp,
            LanguageTiming {
                times: vec![0.05; 5],
                median: 0.05,
                iqr: 0.0,
                status: CalibrationStatus::Stable,
            },
        );
        timings.insert(
            Language::Python,
            LanguageTiming {
                times: vec![0.2; 5],
                median: 0.2,
                iqr: 0.0,
                status: CalibrationStatus::Stable,
            },
        );
        calibration.timings = timings;
        calibration
            .adjustment_factors
            .insert(Language::Python, python_factor);
        calibration.status = CalibrationStatus::Stable;
        calibration.is_reliable = true;
        calibration
    }

    #[test]
    fn test_adjusted_limit_for_non_reference_language() {
        let problem = make_problem(1.0);
        let calibration = reliable_calibration(problem.id, 4.0);

        assert_eq!(
            effective_time_limit(&problem, Some(&calibration), Language::Python),
            4.0
        );
    }

    #[test]
    fn test_reference_language_keeps_base_limit() {
        let problem = make_problem(1.0);
        let calibration = reliable_calibration(problem.id, 4.0);

        assert_eq!(
            effective_time_limit(&problem, Some(&calibration), Language::Cpp),
            1.0
        );
    }

    #[test]
    fn test_no_calibration_falls_back_to_base_limit() {
        let problem = make_problem(2.5);

        assert_eq!(effective_time_limit(&problem, None, Language::Python), 2.5);
    }

    #[test]
    fn test_unreliable_calibration_is_ignored() {
        let problem = make_problem(1.0);
        let mut calibration = reliable_calibration(problem.id, 4.0);
        calibration.is_reliable = false;
        calibration.status = CalibrationStatus::Unstable;

        assert_eq!(
            effective_time_limit(&problem, Some(&calibration), Language::Python),
            1.0
        );
    }

    #[test]
    fn test_missing_factor_falls_back_to_base_limit() {
        let problem = make_problem(1.0);
        let mut calibration = reliable_calibration(problem.id, 4.0);
        calibration.adjustment_factors.clear();

        assert_eq!(
            effective_time_limit(&problem, Some(&calibration), Language::Python),
            1.0
        );
    }
}
