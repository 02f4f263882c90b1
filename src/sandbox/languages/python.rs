//! Python language profile

use crate::models::Language;

use super::LanguageProfile;

/// Get profile for Python
pub fn profile() -> LanguageProfile {
    LanguageProfile {
        language: Language::Python,
        source_file: "solution.py",
        compile_command: None,
        run_command: "python3 /workspace/solution.py",
    }
}
