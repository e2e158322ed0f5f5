//! Configuration for the governance engine.

use serde::{Deserialize, Serialize};

/// Error types for configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not parse YAML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Could not read the file
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// A value is out of range or inconsistent
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a governance engine instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Weight table bounds
    pub weights: WeightConfig,
    /// Analytics firewall settings
    pub analytics: AnalyticsConfig,
    /// Routing settings
    pub routing: RoutingConfig,
    /// Ethics rule-set source
    pub ethics: EthicsConfig,
    /// Persistence settings
    pub persistence: PersistenceConfig,
    /// General settings
    pub general: GeneralConfig,
}

impl GovernanceConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a YAML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check bounds and thresholds for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        if !(w.min.is_finite() && w.max.is_finite() && w.default_score.is_finite()) {
            return Err(ConfigError::Invalid("weight bounds must be finite".to_string()));
        }
        if w.min >= w.max {
            return Err(ConfigError::Invalid(format!(
                "weights.min ({}) must be below weights.max ({})",
                w.min, w.max
            )));
        }
        if w.default_score < w.min || w.default_score > w.max {
            return Err(ConfigError::Invalid(format!(
                "weights.default_score ({}) outside [{}, {}]",
                w.default_score, w.min, w.max
            )));
        }
        if !(0.0..=1.0).contains(&w.decay_factor) {
            return Err(ConfigError::Invalid(format!(
                "weights.decay_factor ({}) outside [0, 1]",
                w.decay_factor
            )));
        }

        let a = &self.analytics;
        if !(0.0..=1.0).contains(&a.completion_baseline) {
            return Err(ConfigError::Invalid(
                "analytics.completion_baseline outside [0, 1]".to_string(),
            ));
        }
        if !a.reinforcement_scale.is_finite() || a.reinforcement_scale < 0.0 {
            return Err(ConfigError::Invalid(
                "analytics.reinforcement_scale must be finite and non-negative".to_string(),
            ));
        }
        if !a.max_delta_per_signal.is_finite() || a.max_delta_per_signal < 0.0 {
            return Err(ConfigError::Invalid(
                "analytics.max_delta_per_signal must be finite and non-negative".to_string(),
            ));
        }

        if self.routing.max_results == 0 {
            return Err(ConfigError::Invalid("routing.max_results must be at least 1".to_string()));
        }
        if self.routing.fallback_tool.id.trim().is_empty() {
            return Err(ConfigError::Invalid("routing.fallback_tool.id is required".to_string()));
        }

        Ok(())
    }
}

/// Weight table bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    /// Lowest possible score
    pub min: f64,
    /// Highest possible score
    pub max: f64,
    /// Score for a pair seen for the first time
    pub default_score: f64,
    /// Factor applied by the decay schedule
    pub decay_factor: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            default_score: 50.0,
            decay_factor: 0.98,
        }
    }
}

/// Analytics firewall settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Minimum views before an aggregate may be used
    pub min_cohort_size: u64,
    /// Completion rate that maps to a zero delta
    pub completion_baseline: f64,
    /// Delta per unit of completion rate above/below baseline
    pub reinforcement_scale: f64,
    /// Cap on the magnitude of a single signal's delta
    pub max_delta_per_signal: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_cohort_size: 5,
            completion_baseline: 0.5,
            reinforcement_scale: 10.0,
            max_delta_per_signal: 5.0,
        }
    }
}

/// Tool shown when routing has nothing else to offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackTool {
    /// Tool identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Page slug
    pub slug: String,
}

impl Default for FallbackTool {
    fn default() -> Self {
        Self {
            id: "breathing-reset".to_string(),
            title: "Two-Minute Breathing Reset".to_string(),
            slug: "/tools/breathing-reset".to_string(),
        }
    }
}

/// Routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Region whose compliance reports gate eligibility
    pub active_region: String,
    /// Maximum tools returned per pain point
    pub max_results: usize,
    /// Designated fallback tool
    pub fallback_tool: FallbackTool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            active_region: "US".to_string(),
            max_results: 3,
            fallback_tool: FallbackTool::default(),
        }
    }
}

/// Ethics rule-set source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EthicsConfig {
    /// YAML rule set replacing the built-in one
    pub rule_set_path: Option<String>,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Append-only JSON-lines audit file
    pub audit_path: Option<String>,
    /// Weight snapshot file
    pub weights_path: Option<String>,
    /// Retries per audit append
    pub retry_count: usize,
    /// Delay between retries (ms)
    pub retry_delay_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            audit_path: None,
            weights_path: None,
            retry_count: 3,
            retry_delay_ms: 200,
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GovernanceConfig::default();
        assert_eq!(config.weights.max, 100.0);
        assert_eq!(config.routing.max_results, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = GovernanceConfig::default();
        config.routing.active_region = "EU".to_string();
        let yaml = config.to_yaml().unwrap();
        let parsed = GovernanceConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.routing.active_region, "EU");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = GovernanceConfig::from_yaml("routing:\n  max_results: 5\n").unwrap();
        assert_eq!(config.routing.max_results, 5);
        assert_eq!(config.routing.active_region, "US");
        assert_eq!(config.weights.default_score, 50.0);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let err = GovernanceConfig::from_yaml("weights:\n  min: 10\n  max: 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GovernanceConfig::from_yaml("weights:\n  default_score: 150\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
