//! Domain models
//!
//! Plain serde records emitted and consumed by the core. Durable storage
//! belongs to the embedding application (see [`crate::store`]).

pub mod calibration;
pub mod problem;
pub mod submission;
pub mod test_case;
pub mod verdict;

pub use calibration::{Calibration, CalibrationStatus, LanguageTiming};
pub use problem::Problem;
pub use submission::{Language, Submission, SubmissionStatus, TestResult};
pub use test_case::TestCase;
pub use verdict::{ErrorKind, Verdict};
