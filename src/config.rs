//! Application configuration management
//!
//! This module handles loading and validating configuration from environment
//! variables. Configuration is loaded once by the embedding application and
//! passed by reference to the components that need it.

use std::env;

use crate::constants::{
    COMPILE_TIMEOUT_SECONDS, DEFAULT_CALIBRATION_REPETITIONS, DEFAULT_FACTOR_CAP,
    DEFAULT_FACTOR_FLOOR, DEFAULT_MEMORY_LIMIT_MB, DEFAULT_TIME_LIMIT_SECONDS,
    MAX_SOURCE_CODE_SIZE, MEASUREMENT_TIMEOUT_SECONDS, STABILITY_THRESHOLD_COMPILED,
    STABILITY_THRESHOLD_INTERPRETED, VALIDATION_TIMEOUT_SECONDS, container_images,
};
use crate::models::Language;

/// Main crate configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub docker: DockerConfig,
    pub limits: LimitsConfig,
    pub calibration: CalibrationConfig,
}

/// Docker configuration for execution containers
#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub socket_path: String,
    pub cpp_image: String,
    pub python_image: String,
}

/// Execution limit configuration
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Fallback time limit in seconds when a problem specifies none
    pub default_time_limit_seconds: f64,
    /// Fallback memory limit in megabytes
    pub default_memory_limit_mb: u64,
    /// Maximum accepted source code size in bytes
    pub max_source_code_bytes: usize,
    /// Compilation timeout in seconds, independent of the judging limit
    pub compile_timeout_seconds: u64,
}

/// Calibration configuration
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Number of timing repetitions per language
    pub repetitions: u32,
    /// Baseline language the adjustment factors are computed against
    pub reference_language: Language,
    pub factor_floor: f64,
    pub factor_cap: f64,
    pub stability_threshold_compiled: f64,
    pub stability_threshold_interpreted: f64,
    pub validation_timeout_seconds: f64,
    pub measurement_timeout_seconds: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            docker: DockerConfig::from_env()?,
            limits: LimitsConfig::from_env()?,
            calibration: CalibrationConfig::from_env()?,
        })
    }
}

impl Default for Config {
    /// Built-in defaults, without consulting the environment
    fn default() -> Self {
        Self {
            docker: DockerConfig::default(),
            limits: LimitsConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl DockerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            socket_path: env::var("DOCKER_SOCKET")
                .unwrap_or_else(|_| "/var/run/docker.sock".to_string()),
            cpp_image: env::var("DOCKER_CPP_IMAGE")
                .unwrap_or_else(|_| container_images::CPP.to_string()),
            python_image: env::var("DOCKER_PYTHON_IMAGE")
                .unwrap_or_else(|_| container_images::PYTHON.to_string()),
        })
    }

    /// Get the container image for a language
    pub fn image_for(&self, language: Language) -> &str {
        match language {
            Language::Cpp => &self.cpp_image,
            Language::Python => &self.python_image,
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket_path: "/var/run/docker.sock".to_string(),
            cpp_image: container_images::CPP.to_string(),
            python_image: container_images::PYTHON.to_string(),
        }
    }
}

impl LimitsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            default_time_limit_seconds: parse_env(
                "DEFAULT_TIME_LIMIT_SECONDS",
                DEFAULT_TIME_LIMIT_SECONDS,
            )?,
            default_memory_limit_mb: parse_env("DEFAULT_MEMORY_LIMIT_MB", DEFAULT_MEMORY_LIMIT_MB)?,
            max_source_code_bytes: parse_env("MAX_SOURCE_CODE_SIZE", MAX_SOURCE_CODE_SIZE)?,
            compile_timeout_seconds: parse_env("COMPILE_TIMEOUT_SECONDS", COMPILE_TIMEOUT_SECONDS)?,
        })
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
            default_memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            max_source_code_bytes: MAX_SOURCE_CODE_SIZE,
            compile_timeout_seconds: COMPILE_TIMEOUT_SECONDS,
        }
    }
}

impl CalibrationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let reference_language = match env::var("CALIBRATION_REFERENCE_LANGUAGE") {
            Ok(value) => Language::parse(&value)
                .ok_or_else(|| ConfigError::InvalidValue("CALIBRATION_REFERENCE_LANGUAGE".to_string()))?,
            Err(_) => Language::Cpp,
        };

        Ok(Self {
            repetitions: parse_env("CALIBRATION_REPETITIONS", DEFAULT_CALIBRATION_REPETITIONS)?,
            reference_language,
            factor_floor: parse_env("CALIBRATION_FACTOR_FLOOR", DEFAULT_FACTOR_FLOOR)?,
            factor_cap: parse_env("CALIBRATION_FACTOR_CAP", DEFAULT_FACTOR_CAP)?,
            stability_threshold_compiled: parse_env(
                "STABILITY_THRESHOLD_COMPILED",
                STABILITY_THRESHOLD_COMPILED,
            )?,
            stability_threshold_interpreted: parse_env(
                "STABILITY_THRESHOLD_INTERPRETED",
                STABILITY_THRESHOLD_INTERPRETED,
            )?,
            validation_timeout_seconds: parse_env(
                "CALIBRATION_VALIDATION_TIMEOUT",
                VALIDATION_TIMEOUT_SECONDS,
            )?,
            measurement_timeout_seconds: parse_env(
                "CALIBRATION_MEASUREMENT_TIMEOUT",
                MEASUREMENT_TIMEOUT_SECONDS,
            )?,
        })
    }

    /// Get the stability threshold for a language
    pub fn threshold_for(&self, language: Language) -> f64 {
        if language.is_compiled() {
            self.stability_threshold_compiled
        } else {
            self.stability_threshold_interpreted
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            repetitions: DEFAULT_CALIBRATION_REPETITIONS,
            reference_language: Language::Cpp,
            factor_floor: DEFAULT_FACTOR_FLOOR,
            factor_cap: DEFAULT_FACTOR_CAP,
            stability_threshold_compiled: STABILITY_THRESHOLD_COMPILED,
            stability_threshold_interpreted: STABILITY_THRESHOLD_INTERPRETED,
            validation_timeout_seconds: VALIDATION_TIMEOUT_SECONDS,
            measurement_timeout_seconds: MEASUREMENT_TIMEOUT_SECONDS,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.calibration.repetitions, 5);
        assert_eq!(config.calibration.factor_cap, 12.0);
        assert_eq!(config.calibration.factor_floor, 1.0);
        assert_eq!(config.calibration.reference_language, Language::Cpp);
        assert_eq!(config.limits.default_time_limit_seconds, 1.0);
    }

    #[test]
    fn test_threshold_selection() {
        let config = CalibrationConfig::default();
        assert_eq!(config.threshold_for(Language::Cpp), 0.15);
        assert_eq!(config.threshold_for(Language::Python), 0.20);
    }
}
