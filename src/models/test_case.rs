//! Test case model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Test case record
///
/// Created by problem authoring; never mutated by judging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub name: String,
    pub input: String,
    pub expected_output: String,
    /// Scoring weight, >= 0
    pub weight: f64,
    pub is_sample: bool,
    pub is_hidden: bool,
    /// Authoring-supplied size hint; falls back to the raw input length
    pub input_size_hint: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    /// Effective input size, used to pick the calibration reference case
    pub fn input_size(&self) -> usize {
        self.input_size_hint
            .map(|hint| hint as usize)
            .unwrap_or_else(|| self.input.len())
    }
}
