//! Verdicts and per-test error classification
//!
//! The error taxonomy is shared by judging and calibration. Verdict
//! resolution uses an explicit total-order priority table and exhaustive
//! matches so that a newly added error kind cannot be silently
//! mis-prioritized.

use serde::{Deserialize, Serialize};

use super::submission::TestResult;

/// Classification of a single test-case failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    None,
    CompilationError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    StackOverflow,
    RuntimeError,
    WrongAnswer,
    /// Reserved for whitespace-only mismatches; no code path emits it yet
    PresentationError,
    /// Sandbox/runtime-infrastructure failure, never the fault of the
    /// submitted code
    InternalError,
}

impl ErrorKind {
    /// Position in the verdict priority order; lower is more severe
    pub fn priority(&self) -> u8 {
        match self {
            Self::CompilationError => 0,
            Self::TimeLimitExceeded => 1,
            Self::MemoryLimitExceeded => 2,
            Self::StackOverflow => 3,
            Self::RuntimeError => 4,
            Self::WrongAnswer => 5,
            Self::PresentationError => 6,
            Self::InternalError => 7,
            Self::None => 8,
        }
    }

    /// Get error kind as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::CompilationError => "compilation_error",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::MemoryLimitExceeded => "memory_limit_exceeded",
            Self::StackOverflow => "stack_overflow",
            Self::RuntimeError => "runtime_error",
            Self::WrongAnswer => "wrong_answer",
            Self::PresentationError => "presentation_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall classification of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    CompilationError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    StackOverflow,
    RuntimeError,
    WrongAnswer,
    PresentationError,
    InternalError,
}

impl Verdict {
    /// Resolve the overall verdict from all test results.
    ///
    /// A compilation error dominates everything; otherwise the submission is
    /// accepted iff every result passed, and the most severe recorded error
    /// kind decides the rest.
    pub fn from_results(results: &[TestResult]) -> Verdict {
        if results.is_empty() {
            return Verdict::InternalError;
        }

        if results
            .iter()
            .any(|r| r.error_kind == ErrorKind::CompilationError)
        {
            return Verdict::CompilationError;
        }

        if results.iter().all(|r| r.passed) {
            return Verdict::Accepted;
        }

        results
            .iter()
            .map(|r| r.error_kind)
            .filter(|kind| *kind != ErrorKind::None)
            .min_by_key(ErrorKind::priority)
            .map(Verdict::from_error_kind)
            // A failing result without a recorded kind is a wrong answer
            .unwrap_or(Verdict::WrongAnswer)
    }

    fn from_error_kind(kind: ErrorKind) -> Verdict {
        match kind {
            ErrorKind::CompilationError => Verdict::CompilationError,
            ErrorKind::TimeLimitExceeded => Verdict::TimeLimitExceeded,
            ErrorKind::MemoryLimitExceeded => Verdict::MemoryLimitExceeded,
            ErrorKind::StackOverflow => Verdict::StackOverflow,
            ErrorKind::RuntimeError => Verdict::RuntimeError,
            ErrorKind::WrongAnswer => Verdict::WrongAnswer,
            ErrorKind::PresentationError => Verdict::PresentationError,
            ErrorKind::InternalError => Verdict::InternalError,
            ErrorKind::None => Verdict::WrongAnswer,
        }
    }

    /// Get verdict as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::CompilationError => "compilation_error",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::MemoryLimitExceeded => "memory_limit_exceeded",
            Self::StackOverflow => "stack_overflow",
            Self::RuntimeError => "runtime_error",
            Self::WrongAnswer => "wrong_answer",
            Self::PresentationError => "presentation_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Check if this verdict means the solution was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
