//! Prompt templates, loaded once at startup.
//!
//! Templates are plain text files in the configured prompts directory.
//! The base template may contain `{context}` and `{history}` markers;
//! the companion function template may additionally contain `{question}`.

use std::path::Path;

use cr_domain::error::{Error, Result};

/// File name of the default system prompt template.
const BASE_TEMPLATE: &str = "prompt_template.txt";
/// System prompt used instead of the base one when companion mode is on.
const COMPANION_TEMPLATE: &str = "prompt_template_companion.txt";
/// Secondary "function" prompt sent alongside the companion template.
const COMPANION_FUNCTION_TEMPLATE: &str = "prompt_template_companion_function.txt";

/// The set of prompt templates the pipeline draws from.
#[derive(Debug)]
pub struct PromptCatalog {
    system: String,
    companion_function: Option<String>,
}

impl PromptCatalog {
    /// Read templates from `dir`. When `companion_enabled` is set, the
    /// companion pair replaces the base template and both files must
    /// exist; otherwise only the base template is read.
    pub fn load(dir: impl AsRef<Path>, companion_enabled: bool) -> Result<Self> {
        let dir = dir.as_ref();

        if companion_enabled {
            Ok(Self {
                system: read_template(dir, COMPANION_TEMPLATE)?,
                companion_function: Some(read_template(dir, COMPANION_FUNCTION_TEMPLATE)?),
            })
        } else {
            Ok(Self {
                system: read_template(dir, BASE_TEMPLATE)?,
                companion_function: None,
            })
        }
    }

    /// Build a catalog from in-memory strings.
    pub fn from_templates(system: impl Into<String>, companion_function: Option<String>) -> Self {
        Self {
            system: system.into(),
            companion_function,
        }
    }

    /// The system prompt template, before marker substitution.
    pub fn system_message(&self) -> &str {
        &self.system
    }

    /// The companion function template, present only when companion mode
    /// was enabled at load time.
    pub fn companion_function_message(&self) -> Option<&str> {
        self.companion_function.as_deref()
    }
}

fn read_template(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("cannot read prompt template {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_base_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(BASE_TEMPLATE), "You are helpful.\n{history}").unwrap();

        let catalog = PromptCatalog::load(dir.path(), false).unwrap();
        assert_eq!(catalog.system_message(), "You are helpful.\n{history}");
        assert!(catalog.companion_function_message().is_none());
    }

    #[test]
    fn loads_companion_pair_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(COMPANION_TEMPLATE), "companion system").unwrap();
        fs::write(
            dir.path().join(COMPANION_FUNCTION_TEMPLATE),
            "{history}\nQ: {question}",
        )
        .unwrap();

        let catalog = PromptCatalog::load(dir.path(), true).unwrap();
        assert_eq!(catalog.system_message(), "companion system");
        assert_eq!(
            catalog.companion_function_message(),
            Some("{history}\nQ: {question}")
        );
    }

    #[test]
    fn missing_base_template_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptCatalog::load(dir.path(), false).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn missing_companion_function_template_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(COMPANION_TEMPLATE), "companion system").unwrap();
        assert!(PromptCatalog::load(dir.path(), true).is_err());
    }
}
