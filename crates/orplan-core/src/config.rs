//! Planner configuration, loadable from JSON.

use std::path::Path;
use std::time::Duration;

use orplan_solver::BranchAndBound;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::formulate::Coverage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Coverage rule for the two covering models
    pub coverage: Coverage,
    /// Distance from 0/1 still accepted as binary
    pub tolerance: f64,
    /// Branch-and-bound node budget
    pub max_nodes: usize,
    /// Wall-clock budget per solve, in seconds; `null` for none
    pub time_limit_secs: Option<f64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            coverage: Coverage::AtLeastOnce,
            tolerance: 1e-6,
            max_nodes: 100_000,
            time_limit_secs: Some(60.0),
        }
    }
}

impl PlannerConfig {
    pub fn from_json(source: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(source).map_err(|e| PlanError::malformed("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| PlanError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance < 0.5) {
            return Err(PlanError::malformed(
                "config",
                format!("tolerance must be in (0, 0.5), got {}", self.tolerance),
            ));
        }
        if let Some(secs) = self.time_limit_secs {
            if secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                return Err(PlanError::malformed(
                    "config",
                    format!("time_limit_secs must be a positive representable duration, got {}", secs),
                ));
            }
        }
        Ok(())
    }

    /// The wall-clock budget. Unrepresentable values, which `validate`
    /// rejects, mean no limit.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// The bundled solver configured with this budget
    pub fn solver(&self) -> BranchAndBound {
        BranchAndBound::new()
            .with_max_nodes(self.max_nodes)
            .with_time_limit(self.time_limit())
            .with_tolerance(self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlannerConfig::from_json(r#"{ "coverage": "exactly", "time_limit_secs": 2.5 }"#).unwrap();

        assert_eq!(config.coverage, Coverage::Exactly);
        assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
        assert_eq!(config.max_nodes, PlannerConfig::default().max_nodes);

        let unlimited = PlannerConfig::from_json(r#"{ "time_limit_secs": null }"#).unwrap();
        assert_eq!(unlimited.time_limit(), None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(PlannerConfig::from_json(r#"{ "tolerance": 0.7 }"#).is_err());
        assert!(PlannerConfig::from_json(r#"{ "time_limit_secs": -1 }"#).is_err());
        assert!(PlannerConfig::from_json(r#"{ "coverage": "sometimes" }"#).is_err());
    }

    #[test]
    fn test_huge_time_limit_is_rejected_not_panicking() {
        let err = PlannerConfig::from_json(r#"{ "time_limit_secs": 1e300 }"#).unwrap_err();
        assert!(matches!(err, PlanError::MalformedInput { ref entity, .. } if entity == "config"));

        // Set directly, as a CLI override would
        let config = PlannerConfig {
            time_limit_secs: Some(1e300),
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.time_limit(), None);
        let _ = config.solver();
    }
}
