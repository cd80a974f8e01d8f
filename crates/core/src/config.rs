use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },
    #[error("similarity_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("min_combination_size ({min}) must not exceed max_combination_size ({max})")]
    CombinationBounds { min: usize, max: usize },
    #[error("max_search_legs ({legs}) must be at least min_combination_size ({min})")]
    SearchLegsBelowMinimum { legs: usize, min: usize },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// Tolerances and search bounds for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// A group is balanced when `|net| <= balance_tolerance`.
    pub balance_tolerance: Decimal,
    /// Minimum description ratio (exclusive) to join a similarity cluster.
    pub similarity_threshold: f64,
    /// Largest credit/debit gap accepted inside a similarity cluster.
    pub cluster_tolerance: Decimal,
    /// Largest gap between a combination sum and the target total.
    pub match_tolerance: Decimal,
    pub min_combination_size: usize,
    pub max_combination_size: usize,
    /// Legs entering the combination search per side; the largest values
    /// win when a side has more.
    pub max_search_legs: usize,
    /// Combinations evaluated per group before the search gives up.
    pub max_evaluations_per_group: u64,
    /// Search the smaller side against the dominant total when the dominant
    /// side has too few legs to form a combination.
    pub search_target_side_when_dominant_short: bool,
    /// Emit each leg at most once per group across similarity clusters.
    pub deduplicate_cluster_legs: bool,
    /// Leave groups explained by a partial match out of the unresolved set.
    pub exclude_resolved_groups: bool,
    pub worker_threads: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: Decimal::ONE,
            similarity_threshold: 0.85,
            cluster_tolerance: Decimal::from(50),
            match_tolerance: Decimal::from(50),
            min_combination_size: 2,
            max_combination_size: 5,
            max_search_legs: 24,
            max_evaluations_per_group: 2_000_000,
            search_target_side_when_dominant_short: true,
            deduplicate_cluster_legs: false,
            exclude_resolved_groups: false,
            worker_threads: 1,
        }
    }
}

impl ReconcileConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: ReconcileConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("balance_tolerance", self.balance_tolerance),
            ("cluster_tolerance", self.cluster_tolerance),
            ("match_tolerance", self.match_tolerance),
        ] {
            if value < Decimal::ZERO {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.similarity_threshold));
        }

        if self.min_combination_size == 0 {
            return Err(ConfigError::Zero("min_combination_size"));
        }
        if self.min_combination_size > self.max_combination_size {
            return Err(ConfigError::CombinationBounds {
                min: self.min_combination_size,
                max: self.max_combination_size,
            });
        }
        if self.max_search_legs < self.min_combination_size {
            return Err(ConfigError::SearchLegsBelowMinimum {
                legs: self.max_search_legs,
                min: self.min_combination_size,
            });
        }
        if self.max_evaluations_per_group == 0 {
            return Err(ConfigError::Zero("max_evaluations_per_group"));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Zero("worker_threads"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReconcileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.balance_tolerance, Decimal::ONE);
        assert_eq!(config.min_combination_size, 2);
        assert_eq!(config.max_combination_size, 5);
    }

    #[test]
    fn parse_partial_toml_keeps_defaults() {
        let config = ReconcileConfig::from_toml(
            r#"
match_tolerance = 10
similarity_threshold = 0.9
worker_threads = 4
"#,
        )
        .unwrap();
        assert_eq!(config.match_tolerance, Decimal::from(10));
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.cluster_tolerance, Decimal::from(50));
        assert!(!config.deduplicate_cluster_legs);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ReconcileConfig::from_toml("").unwrap(), ReconcileConfig::default());
    }

    #[test]
    fn reject_negative_tolerance() {
        let err = ReconcileConfig::from_toml("cluster_tolerance = -1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Negative { field: "cluster_tolerance", .. }));
    }

    #[test]
    fn reject_inverted_combination_bounds() {
        let config = ReconcileConfig {
            min_combination_size: 4,
            max_combination_size: 3,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::CombinationBounds { min: 4, max: 3 })
        );
    }

    #[test]
    fn reject_search_legs_below_minimum_size() {
        let err = ReconcileConfig::from_toml("min_combination_size = 3\nmax_search_legs = 2").unwrap_err();
        assert_eq!(err, ConfigError::SearchLegsBelowMinimum { legs: 2, min: 3 });
        let config = ReconcileConfig {
            max_search_legs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let config = ReconcileConfig {
            similarity_threshold: 1.2,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("[0, 1]"));
    }

    #[test]
    fn reject_zero_workers() {
        let err = ReconcileConfig::from_toml("worker_threads = 0").unwrap_err();
        assert_eq!(err, ConfigError::Zero("worker_threads"));
    }

    #[test]
    fn reject_unknown_key() {
        assert!(matches!(
            ReconcileConfig::from_toml("match_tolerence = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
