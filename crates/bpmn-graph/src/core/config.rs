//! Designer configuration
//!
//! Loaded from JSON by the CLI; every field has a default so partial files
//! are accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ModelError, Result};

/// Shape kinds a designer supports out of the box
pub const DEFAULT_BPMNS: &[&str] = &[
    "StartEvent",
    "UserTask",
    "ServiceTask",
    "ReceiveTask",
    "CallActivity",
    "ExclusiveGateway",
    "InclusiveGateway",
    "ParallelGateway",
    "ComplexGateway",
    "EndEvent",
    "TerminateEndEvent",
];

/// Options controlling a [`Designer`](crate::designer::Designer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DesignerConfig {
    /// Canvas scale applied to geometry on export
    pub scale: f64,
    /// Reject property updates when set
    pub readonly: bool,
    /// Shape kinds that may be created
    pub bpmns: Vec<String>,
    /// Shape kinds hidden from the palette even when supported
    pub filter: Vec<String>,
    /// Prefix for generated element ids
    pub id_prefix: String,
    /// Milliseconds an import waits for the readiness gate; `None` waits forever
    pub ready_timeout_ms: Option<u64>,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            readonly: false,
            bpmns: DEFAULT_BPMNS.iter().map(|s| s.to_string()).collect(),
            filter: Vec::new(),
            id_prefix: "obj".to_string(),
            ready_timeout_ms: Some(10_000),
        }
    }
}

impl DesignerConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelError::store(format!("failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(ModelError::invalid_attribute(
                "scale",
                format!("must be a finite nonzero number, got {}", self.scale),
            ));
        }
        Ok(())
    }

    /// Whether a shape kind may be created under this configuration
    pub fn is_supported(&self, bpmn_name: &str) -> bool {
        is_supported_bpmn(&self.bpmns, &self.filter, bpmn_name)
    }
}

/// A kind is supported when it is listed and not filtered out
pub fn is_supported_bpmn(bpmns: &[String], filter: &[String], bpmn_name: &str) -> bool {
    bpmns.iter().any(|b| b == bpmn_name) && !filter.iter().any(|f| f == bpmn_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DesignerConfig::default();
        assert_eq!(config.scale, 1.0);
        assert!(!config.readonly);
        assert_eq!(config.bpmns.len(), DEFAULT_BPMNS.len());
        assert!(config.is_supported("UserTask"));
        assert!(!config.is_supported("SubProcess"));
    }

    #[test]
    fn test_partial_json() {
        let config = DesignerConfig::from_json(r#"{"scale": 2, "filter": ["UserTask"]}"#).unwrap();
        assert_eq!(config.scale, 2.0);
        assert!(!config.is_supported("UserTask"));
        assert!(config.is_supported("ServiceTask"));
        assert_eq!(config.id_prefix, "obj");
    }

    #[test]
    fn test_zero_scale_rejected() {
        assert!(DesignerConfig::from_json(r#"{"scale": 0}"#).is_err());
    }

    #[test]
    fn test_unknown_file() {
        let result = DesignerConfig::load("/definitely/not/here.json");
        assert!(matches!(result, Err(ModelError::Store { .. })));
    }
}
