//! dvr-config
//!
//! Engine configuration: numeric tolerances, priority thresholds, and the
//! benchmark-source endpoint. Defaults ARE the canonical values the engine
//! is specified with; a YAML file only overrides what it names.
//!
//! No layering, no env interpolation: one file, explicit keys.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Dual-tolerance closeness parameters for monetary / rate fields.
///
/// Two present values are "close" when `|a - b| <= absolute` OR the relative
/// difference `|a - b| / |b|` is within `relative`. An absent value on
/// either side is never close.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub absolute: f64,
    pub relative: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            absolute: 0.01,
            relative: 1e-4,
        }
    }
}

/// Monetary thresholds driving the priority engine, in report currency.
///
/// `systemic_*` apply to FX / tax breaks (earlier escalation); `cash_*`
/// apply to any break by cash impact alone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityThresholds {
    pub systemic_critical: f64,
    pub systemic_high: f64,
    pub cash_critical: f64,
    pub cash_high: f64,
    pub cash_medium: f64,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            systemic_critical: 50_000.0,
            systemic_high: 5_000.0,
            cash_critical: 100_000.0,
            cash_high: 10_000.0,
            cash_medium: 1_000.0,
        }
    }
}

/// Benchmark rate-source settings (Norges Bank EXR by default).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data.norges-bank.no".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Full engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tolerances: ToleranceConfig,
    pub priority: PriorityThresholds,
    pub benchmark: BenchmarkConfig,
}

impl EngineConfig {
    /// Load a YAML config file. Unknown keys are ignored; missing keys fall
    /// back to defaults.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let cfg: EngineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parse config yaml {}", path.display()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_carry_canonical_thresholds() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.tolerances.absolute, 0.01);
        assert_eq!(cfg.tolerances.relative, 1e-4);
        assert_eq!(cfg.priority.systemic_critical, 50_000.0);
        assert_eq!(cfg.priority.cash_medium, 1_000.0);
        assert_eq!(cfg.benchmark.timeout_secs, 10);
    }

    #[test]
    fn partial_yaml_overrides_only_named_keys() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "priority:\n  cash_high: 25000").unwrap();
        let cfg = EngineConfig::load_yaml(f.path()).unwrap();
        assert_eq!(cfg.priority.cash_high, 25_000.0);
        // untouched keys keep defaults
        assert_eq!(cfg.priority.cash_critical, 100_000.0);
        assert_eq!(cfg.tolerances.absolute, 0.01);
    }

    #[test]
    fn missing_file_is_a_context_error() {
        let err = EngineConfig::load_yaml("/nonexistent/dvr.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("read config file"));
    }
}
