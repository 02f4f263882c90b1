//! Problem model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Problem record
///
/// Immutable during judging; mutated only through administrative updates in
/// the owning application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    /// Baseline time limit in seconds, fair to the reference language
    pub base_time_limit: f64,
    /// Memory cap in megabytes, enforced by the sandbox
    pub memory_limit_mb: u64,
    /// Largest accepted test-case input in bytes
    pub max_input_size: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
