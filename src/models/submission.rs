//! Submission and test result models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::verdict::{ErrorKind, Verdict};

/// Supported programming languages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Python,
}

impl Language {
    /// All supported languages
    pub const ALL: &'static [Language] = &[Language::Cpp, Language::Python];

    /// Get language as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpp => "cpp",
            Self::Python => "python",
        }
    }

    /// Parse language from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Some(Self::Cpp),
            "python" | "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// Compiled languages get the tighter calibration stability threshold
    pub fn is_compiled(&self) -> bool {
        matches!(self, Self::Cpp)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Submission lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SubmissionStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Submission record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub problem_id: Uuid,
    /// External user identity, passed through untouched
    pub user_id: Option<String>,
    pub language: Language,
    #[serde(skip_serializing)]
    pub source_code: String,
    pub status: SubmissionStatus,
    pub verdict: Option<Verdict>,
    /// Effective time limit in seconds, resolved once at judge time and
    /// frozen so the outcome stays reproducible
    pub time_limit_used: Option<f64>,
    /// Weighted score in [0, 1]
    pub score: Option<f64>,
    pub passed_count: u32,
    pub total_count: u32,
    /// Sum of per-test execution times in seconds
    pub execution_time_total: Option<f64>,
    /// Compilation or infrastructure detail, when any
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Create a new pending submission
    pub fn new(
        problem_id: Uuid,
        language: Language,
        source_code: String,
        user_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            user_id,
            language,
            source_code,
            status: SubmissionStatus::Pending,
            verdict: None,
            time_limit_used: None,
            score: None,
            passed_count: 0,
            total_count: 0,
            execution_time_total: None,
            error_message: None,
            created_at: Utc::now(),
            judged_at: None,
        }
    }
}

/// Result of executing a submission against one test case
///
/// Created once per (submission, test case) pair; immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub test_case_id: Uuid,
    pub passed: bool,
    /// Wall-clock execution time in seconds
    pub execution_time: Option<f64>,
    /// Peak resident set size in kilobytes
    pub memory_kb: Option<i64>,
    pub error_kind: ErrorKind,
    pub error_message: Option<String>,
    pub exit_code: Option<i32>,
    /// Captured stdout, truncated
    pub stdout: Option<String>,
    /// Captured stderr, truncated
    pub stderr: Option<String>,
    /// Bounded unified diff for wrong answers
    pub diff: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TestResult {
    /// Create an empty, not-yet-judged result
    pub fn new(submission_id: Uuid, test_case_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            submission_id,
            test_case_id,
            passed: false,
            execution_time: None,
            memory_kb: None,
            error_kind: ErrorKind::None,
            error_message: None,
            exit_code: None,
            stdout: None,
            stderr: None,
            diff: None,
            created_at: Utc::now(),
        }
    }
}
