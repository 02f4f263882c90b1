//! Language-specific compile and run profiles

pub mod cpp;
pub mod python;

use crate::models::Language;

/// How to compile and run one language inside the sandbox workspace
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub language: Language,
    /// Source file name inside the workspace
    pub source_file: &'static str,
    /// Compile command, when the language requires compilation
    pub compile_command: Option<&'static str>,
    /// Run command reading the program's stdin
    pub run_command: &'static str,
}

impl LanguageProfile {
    /// Get the profile for a language
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Cpp => cpp::profile(),
            Language::Python => python::profile(),
        }
    }
}
