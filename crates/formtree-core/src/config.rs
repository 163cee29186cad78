//! Configuration for the form renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading renderer configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderConfig {
    /// Definition validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Annotation box configuration
    #[serde(default)]
    pub annotations: AnnotationConfig,

    /// Base URL forwarded to file nodes for document links
    #[serde(default)]
    pub docs_url: Option<String>,

    /// Determinism configuration
    #[serde(default)]
    pub determinism: DeterminismConfig,
}

impl RenderConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

fn default_true() -> bool {
    true
}

/// Definition validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Reject unknown field `type` values at load time.
    ///
    /// When false, unknown kinds load as `FieldKind::Unknown` and render
    /// nothing.
    #[serde(default = "default_true")]
    pub strict_field_types: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_field_types: true,
        }
    }
}

/// Annotation box configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Display label of the assessor box. Box names are fixed.
    #[serde(default = "default_assessor_label")]
    pub assessor_label: String,
}

fn default_assessor_label() -> String {
    "Assessor".to_string()
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            assessor_label: default_assessor_label(),
        }
    }
}

/// Determinism configuration for reproducible render outcomes.
///
/// When `rendered_at` is None (default), the current system time is stamped
/// on each outcome:
///
/// ```yaml
/// determinism:
///   rendered_at: "2025-12-20T10:00:00Z"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeterminismConfig {
    #[serde(default)]
    pub rendered_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert!(config.validation.strict_field_types);
        assert_eq!(config.annotations.assessor_label, "Assessor");
        assert!(config.docs_url.is_none());
        assert!(config.determinism.rendered_at.is_none());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = RenderConfig::from_yaml("{}").unwrap();
        assert!(config.validation.strict_field_types);
        assert_eq!(config.annotations.assessor_label, "Assessor");
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
validation:
  strict_field_types: false
docs_url: "https://licensing.example.org/media/"
determinism:
  rendered_at: "2025-12-20T10:00:00Z"
"#;
        let config = RenderConfig::from_yaml(yaml).unwrap();
        assert!(!config.validation.strict_field_types);
        assert_eq!(config.annotations.assessor_label, "Assessor");
        assert_eq!(
            config.docs_url.as_deref(),
            Some("https://licensing.example.org/media/")
        );

        use chrono::TimeZone;
        assert_eq!(
            config.determinism.rendered_at,
            Some(Utc.with_ymd_and_hms(2025, 12, 20, 10, 0, 0).unwrap())
        );
    }
}
