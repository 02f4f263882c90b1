//! Calibration model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::submission::Language;

/// Status of a calibration, overall and per language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationStatus {
    Pending,
    Running,
    Stable,
    Unstable,
    Failed,
}

impl CalibrationStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stable => "stable",
            Self::Unstable => "unstable",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timing statistics measured for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageTiming {
    /// Raw samples in run order, kept for auditability
    pub times: Vec<f64>,
    /// Median execution time in seconds
    pub median: f64,
    /// Interquartile range (Q3 - Q1) in seconds
    pub iqr: f64,
    pub status: CalibrationStatus,
}

impl LanguageTiming {
    /// IQR relative to the median, the stability measure
    pub fn relative_iqr(&self) -> f64 {
        if self.median > 0.0 {
            self.iqr / self.median
        } else {
            f64::INFINITY
        }
    }
}

/// Per-problem timing calibration record
///
/// At most one calibration is *active* per problem, tracked by the store's
/// active pointer. Only reliable calibrations are ever activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calibration {
    pub id: Uuid,
    pub problem_id: Uuid,
    /// Largest test case by input size; the largest workload maximizes
    /// timing signal over fixed per-run overhead
    pub reference_test_case_id: Uuid,
    pub repetitions: u32,
    /// Baseline language the adjustment factors are relative to
    pub reference_language: Language,
    pub timings: BTreeMap<Language, LanguageTiming>,
    /// Clamped multiplier per non-reference language
    pub adjustment_factors: BTreeMap<Language, f64>,
    pub factor_floor: f64,
    pub factor_cap: f64,
    pub status: CalibrationStatus,
    pub is_reliable: bool,
    pub error_message: Option<String>,
    /// Container images the measurements ran on
    pub images: BTreeMap<Language, String>,
    pub created_at: DateTime<Utc>,
}

impl Calibration {
    /// Create a new pending calibration
    pub fn new(
        problem_id: Uuid,
        reference_test_case_id: Uuid,
        repetitions: u32,
        reference_language: Language,
        factor_floor: f64,
        factor_cap: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            reference_test_case_id,
            repetitions,
            reference_language,
            timings: BTreeMap::new(),
            adjustment_factors: BTreeMap::new(),
            factor_floor,
            factor_cap,
            status: CalibrationStatus::Pending,
            is_reliable: false,
            error_message: None,
            images: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Adjustment factor for a language; the reference language is parity
    pub fn adjustment_factor(&self, language: Language) -> Option<f64> {
        if language == self.reference_language {
            Some(1.0)
        } else {
            self.adjustment_factors.get(&language).copied()
        }
    }

    /// Measured median for a language, if calibrated
    pub fn median(&self, language: Language) -> Option<f64> {
        self.timings.get(&language).map(|timing| timing.median)
    }
}
