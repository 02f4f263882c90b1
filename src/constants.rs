//! Application-wide constants
//!
//! This module contains all constant values used throughout the crate.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// EXECUTION DEFAULTS
// =============================================================================

/// Default per-problem base time limit in seconds
pub const DEFAULT_TIME_LIMIT_SECONDS: f64 = 1.0;

/// Default memory limit in megabytes
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 128;

/// Compilation timeout in seconds, independent of the judging time limit
pub const COMPILE_TIMEOUT_SECONDS: u64 = 30;

/// Maximum source code size in bytes
pub const MAX_SOURCE_CODE_SIZE: usize = 64_000;

// =============================================================================
// CALIBRATION DEFAULTS
// =============================================================================

/// Default number of timing repetitions per language
pub const DEFAULT_CALIBRATION_REPETITIONS: u32 = 5;

/// Lower bound for the per-language adjustment factor; a factor below
/// parity would tighten a limit past the baseline
pub const DEFAULT_FACTOR_FLOOR: f64 = 1.0;

/// Upper bound for the per-language adjustment factor
pub const DEFAULT_FACTOR_CAP: f64 = 12.0;

/// Relative-IQR stability threshold for compiled languages
pub const STABILITY_THRESHOLD_COMPILED: f64 = 0.15;

/// Relative-IQR stability threshold for interpreted languages; VM startup
/// and GC jitter make these measurements inherently noisier
pub const STABILITY_THRESHOLD_INTERPRETED: f64 = 0.20;

/// Timeout in seconds for the correctness-validation run of a reference solution
pub const VALIDATION_TIMEOUT_SECONDS: f64 = 30.0;

/// Timeout in seconds for each timing measurement run
pub const MEASUREMENT_TIMEOUT_SECONDS: f64 = 60.0;

// =============================================================================
// SANDBOX SETTINGS
// =============================================================================

/// Working directory inside execution containers
pub const WORKSPACE_DIR: &str = "/workspace";

/// Maximum number of processes a container may spawn
pub const CONTAINER_PIDS_LIMIT: i64 = 64;

/// Container images for each language
pub mod container_images {
    pub const CPP: &str = "adaptivejudge-cpp:latest";
    pub const PYTHON: &str = "adaptivejudge-python:latest";
}

// =============================================================================
// RESULT CAPTURE
// =============================================================================

/// Captured stdout/stderr are truncated to this many bytes per test result
pub const OUTPUT_TRUNCATE_BYTES: usize = 16_384;

/// Maximum number of lines recorded in a wrong-answer diff
pub const DIFF_MAX_LINES: usize = 50;
