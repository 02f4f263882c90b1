//! Structured outcome of a sandboxed run
//!
//! Classification is signal-first: the exit code and the container's OOM
//! flag decide the outcome, and stderr signature matching is only the
//! last-resort fallback (it is language- and locale-dependent).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// SIGKILL, delivered by the kernel OOM killer among others
const SIGKILL: i32 = 9;
/// SIGSEGV, the usual signature of a blown stack
const SIGSEGV: i32 = 11;

static STACK_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)stack overflow|segmentation fault|stack smashing|RecursionError")
        .expect("invalid stack signature pattern")
});

static MEMORY_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)out of memory|MemoryError|bad_alloc|cannot allocate memory")
        .expect("invalid memory signature pattern")
});

/// Classification of a single sandboxed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    CompileError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    StackOverflow,
    RuntimeError,
}

impl RunStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::CompileError => "compile_error",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::MemoryLimitExceeded => "memory_limit_exceeded",
            Self::StackOverflow => "stack_overflow",
            Self::RuntimeError => "runtime_error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything observed about one sandboxed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    /// Terminating signal decoded from the exit code, if any
    pub signal: Option<i32>,
    /// Whether the execution context reported an OOM kill
    pub oom_killed: bool,
    /// Wall-clock execution time in seconds
    pub execution_time: f64,
    pub stdout: String,
    pub stderr: String,
    /// Peak resident set size in kilobytes, when measurable
    pub memory_kb: Option<i64>,
}

impl RunOutcome {
    /// Successful run with captured stdout
    pub fn success(stdout: String, execution_time: f64) -> Self {
        Self {
            status: RunStatus::Success,
            exit_code: Some(0),
            signal: None,
            oom_killed: false,
            execution_time,
            stdout,
            stderr: String::new(),
            memory_kb: None,
        }
    }

    /// Compilation failure; execution was skipped entirely
    pub fn compile_error(exit_code: i32, stderr: String) -> Self {
        Self {
            status: RunStatus::CompileError,
            exit_code: Some(exit_code),
            signal: None,
            oom_killed: false,
            execution_time: 0.0,
            stdout: String::new(),
            stderr,
            memory_kb: None,
        }
    }

    /// Deadline expired and the process was forcibly terminated
    pub fn time_limit(execution_time: f64) -> Self {
        Self {
            status: RunStatus::TimeLimitExceeded,
            exit_code: None,
            signal: Some(SIGKILL),
            oom_killed: false,
            execution_time,
            stdout: String::new(),
            stderr: String::new(),
            memory_kb: None,
        }
    }
}

/// Decode the terminating signal from a shell-style exit code
pub fn signal_of(exit_code: i32) -> Option<i32> {
    (exit_code > 128).then(|| exit_code - 128)
}

/// Classify a completed (non-timeout) run from its exit state
pub fn classify_exit(exit_code: i32, oom_killed: bool, stderr: &str) -> RunStatus {
    if exit_code == 0 {
        return RunStatus::Success;
    }

    match signal_of(exit_code) {
        Some(SIGSEGV) => return RunStatus::StackOverflow,
        Some(SIGKILL) if oom_killed => return RunStatus::MemoryLimitExceeded,
        _ => {}
    }

    if STACK_SIGNATURE.is_match(stderr) {
        RunStatus::StackOverflow
    } else if MEMORY_SIGNATURE.is_match(stderr) {
        RunStatus::MemoryLimitExceeded
    } else {
        RunStatus::RuntimeError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success() {
        assert_eq!(classify_exit(0, false, ""), RunStatus::Success);
    }

    #[test]
    fn test_classify_by_signal() {
        assert_eq!(classify_exit(139, false, ""), RunStatus::StackOverflow);
        assert_eq!(classify_exit(137, true, ""), RunStatus::MemoryLimitExceeded);
        // SIGKILL without an OOM report stays a runtime error
        assert_eq!(classify_exit(137, false, ""), RunStatus::RuntimeError);
    }

    #[test]
    fn test_classify_by_stderr_fallback() {
        assert_eq!(
            classify_exit(1, false, "Fatal: stack overflow detected"),
            RunStatus::StackOverflow
        );
        assert_eq!(
            classify_exit(1, false, "RecursionError: maximum recursion depth exceeded"),
            RunStatus::StackOverflow
        );
        assert_eq!(
            classify_exit(1, false, "MemoryError"),
            RunStatus::MemoryLimitExceeded
        );
        assert_eq!(
            classify_exit(1, false, "terminate called after throwing an instance of 'std::bad_alloc'"),
            RunStatus::MemoryLimitExceeded
        );
        assert_eq!(classify_exit(2, false, "ValueError: boom"), RunStatus::RuntimeError);
    }

    #[test]
    fn test_signal_of() {
        assert_eq!(signal_of(0), None);
        assert_eq!(signal_of(1), None);
        assert_eq!(signal_of(139), Some(11));
        assert_eq!(signal_of(137), Some(9));
    }
}
