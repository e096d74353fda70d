//! Optimizer configuration
//!
//! Rules are disabled by their stable names; unknown names are logged
//! and ignored when the pass starts. The check-cast remover runs after
//! the peephole pass unless switched off here (or disabled by name).

use serde::Deserialize;

/// Configuration for the optimizer passes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Rule names that must not run
    pub disabled: Vec<String>,
    /// Rule names to run even though they are off by default
    pub enabled: Vec<String>,
    /// Whether the redundant check-cast remover runs after the pass
    pub run_redundant_cast_remover: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            enabled: Vec::new(),
            run_redundant_cast_remover: true,
        }
    }
}

impl OptimizerConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Add a rule name to the disabled set
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.disabled.push(name.into());
        self
    }

    /// Add a rule name to the enabled set
    pub fn enable(mut self, name: impl Into<String>) -> Self {
        self.enabled.push(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert!(config.disabled.is_empty());
        assert!(config.enabled.is_empty());
        assert!(config.run_redundant_cast_remover);
    }

    #[test]
    fn test_from_json() {
        let config = OptimizerConfig::from_json(
            r#"{
                "disabled": ["Arith_AddLit_0"],
                "run_redundant_cast_remover": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.disabled, vec!["Arith_AddLit_0"]);
        assert!(config.enabled.is_empty());
        assert!(!config.run_redundant_cast_remover);
    }

    #[test]
    fn test_from_json_empty_object() {
        let config = OptimizerConfig::from_json("{}").unwrap();
        assert!(config.run_redundant_cast_remover);
    }
}
