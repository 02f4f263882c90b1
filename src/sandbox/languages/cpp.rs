//! C++ language profile

use crate::models::Language;

use super::LanguageProfile;

/// Get profile for C++
pub fn profile() -> LanguageProfile {
    LanguageProfile {
        language: Language::Cpp,
        source_file: "solution.cpp",
        compile_command: Some("g++ -O2 -o /workspace/solution /workspace/solution.cpp"),
        run_command: "/workspace/solution",
    }
}
