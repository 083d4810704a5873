use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::calibration::WeightGrid;
use crate::error::{Error, Result};
use crate::scoring::SchemeSpec;
use crate::target::TargetPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Top-quantile cut; 0.8 labels the top 20%.
    pub quantile: f64,
    /// Minimum share of rows with a follower rate before falling back.
    pub min_coverage: f64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            quantile: 0.8,
            min_coverage: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub rate_per_hour: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self { rate_per_hour: 0.1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub likes_weight: f64,
    pub target: TargetPolicy,
    pub parallel: bool,
    pub grid: WeightGrid,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            likes_weight: 1.0,
            target: TargetPolicy::Engagements,
            parallel: false,
            grid: WeightGrid::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub scheme_prefix: String,
    /// Columns starting with any of these are left out of the ranking.
    pub exclude_prefixes: Vec<String>,
    pub baseline: String,
    pub legacy: String,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            scheme_prefix: "Scheme_".to_string(),
            exclude_prefixes: vec!["Scheme_C_".to_string()],
            baseline: "Scheme_Baseline".to_string(),
            legacy: "Scheme_C".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub target: TargetConfig,
    pub decay: DecayConfig,
    pub search: SearchConfig,
    pub comparison: ComparisonConfig,
    pub schemes: Vec<SchemeSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            decay: DecayConfig::default(),
            search: SearchConfig::default(),
            comparison: ComparisonConfig::default(),
            schemes: SchemeSpec::catalogue(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            } else {
                AnalysisConfig::default()
            }
        } else {
            AnalysisConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let payload = toml::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    /// Inserts `scheme`, replacing any scheme with the same name.
    pub fn upsert_scheme(&mut self, scheme: SchemeSpec) {
        match self.schemes.iter_mut().find(|existing| existing.name == scheme.name) {
            Some(existing) => *existing = scheme,
            None => self.schemes.push(scheme),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.target.quantile) {
            return Err(Error::Config(format!(
                "target quantile must be within [0, 1], got {}",
                self.target.quantile
            )));
        }
        if !(0.0..=1.0).contains(&self.target.min_coverage) {
            return Err(Error::Config(format!(
                "min_coverage must be within [0, 1], got {}",
                self.target.min_coverage
            )));
        }
        if self.decay.rate_per_hour < 0.0 || !self.decay.rate_per_hour.is_finite() {
            return Err(Error::Config(format!(
                "decay rate must be a non-negative number, got {}",
                self.decay.rate_per_hour
            )));
        }
        self.search.grid.validate()?;
        crate::scoring::validate_schemes(&self.schemes)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(quantile) = env::var("TARGET_QUANTILE") {
            if let Ok(value) = quantile.parse::<f64>() {
                self.target.quantile = value;
            }
        }
        if let Ok(rate) = env::var("DECAY_RATE_PER_HOUR") {
            if let Ok(value) = rate.parse::<f64>() {
                self.decay.rate_per_hour = value;
            }
        }
        if let Ok(parallel) = env::var("SEARCH_PARALLEL") {
            if let Ok(value) = parallel.parse::<bool>() {
                self.search.parallel = value;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("ANALYSIS_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/analysis.toml")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.target.quantile, 0.8);
        assert_eq!(config.target.min_coverage, 0.1);
        assert_eq!(config.decay.rate_per_hour, 0.1);
        assert_eq!(config.search.likes_weight, 1.0);
        assert_eq!(config.search.grid.values(), (0..=200).step_by(5).collect::<Vec<u32>>());
        assert_eq!(config.search.target, TargetPolicy::Engagements);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            [target]
            quantile = 0.9

            [search.grid]
            stop = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.target.quantile, 0.9);
        assert_eq!(config.target.min_coverage, 0.1);
        assert_eq!(config.search.grid.stop, 50);
        assert_eq!(config.search.grid.step, 5);
        assert!(!config.schemes.is_empty());
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("analysis.toml");

        let mut config = AnalysisConfig::default();
        config.upsert_scheme(SchemeSpec::new("Scheme_Optimized", 1.0, 20.0, 5.0));
        config.write(&path).unwrap();

        let (loaded, loaded_path) = AnalysisConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded_path, Some(path));
        let optimized = loaded
            .schemes
            .iter()
            .find(|scheme| scheme.name == "Scheme_Optimized")
            .unwrap();
        assert_eq!(optimized.weights.comments, 20.0);
        assert_eq!(
            loaded.schemes.iter().filter(|s| s.name == "Scheme_Optimized").count(),
            1
        );
    }

    #[test]
    fn invalid_quantile_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.target.quantile = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
