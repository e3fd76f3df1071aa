use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerdinError};

/// Top-level Verdin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Personalization: when true, the `MEMORIES` variable always resolves
    /// to the empty string and the memory tool is withheld from the model.
    #[serde(default)]
    pub disable_memory: bool,

    #[serde(default)]
    pub model: ModelSettings,

    /// Optional path to a persisted workflow definition (JSON).
    #[serde(default)]
    pub workflow: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disable_memory: false,
            model: ModelSettings::default(),
            workflow: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: None,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VerdinError::ConfigNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| VerdinError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.disable_memory);
        assert_eq!(settings.model.model, "gpt-4o");
        assert_eq!(settings.model.max_tokens, 4096);
        assert!(settings.model.temperature.is_none());
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verdin.toml");
        std::fs::write(
            &path,
            r#"
disable_memory = true

[model]
model = "gpt-4o-mini"
temperature = 0.2
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.disable_memory);
        assert_eq!(settings.model.model, "gpt-4o-mini");
        assert_eq!(settings.model.temperature, Some(0.2));
        // Unset fields keep their defaults
        assert_eq!(settings.model.max_tokens, 4096);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/verdin.toml")).unwrap_err();
        assert!(matches!(err, VerdinError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verdin.toml");
        std::fs::write(&path, "disable_memory = \"not a bool\"").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, VerdinError::Config(_)));
    }
}
