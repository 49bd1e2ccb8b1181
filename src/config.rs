// ⚙️ Configuration - Table names, observation year, threshold and policy
//
// Loaded from JSON; every key has a default so a partial file is fine.

use crate::recommend::{RecommendationPolicy, DEFAULT_FITNESS_THRESHOLD};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    /// Component source (one census)
    pub component: String,

    /// Master identity registry
    pub master: String,

    /// Given-name alias frequencies
    pub aliases: String,

    /// Matching results, one row per processed record
    pub results: String,
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            component: "tbl458catasto".to_string(),
            master: "tblMaster_040315".to_string(),
            aliases: "NS3".to_string(),
            results: "matching_results_458".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchRange {
    pub start: i64,
    pub stop: i64,
}

impl Default for BatchRange {
    fn default() -> Self {
        BatchRange {
            start: 1,
            stop: 5167,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub tables: TableNames,

    /// Year of the census every component record comes from
    pub observation_year: i32,

    pub fitness_threshold: f64,

    pub policy: RecommendationPolicy,

    pub batch: BatchRange,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            tables: TableNames::default(),
            observation_year: 1458,
            fitness_threshold: DEFAULT_FITNESS_THRESHOLD,
            policy: RecommendationPolicy::default(),
            batch: BatchRange::default(),
        }
    }
}

impl MatcherConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatcherConfig::default();
        assert_eq!(config.observation_year, 1458);
        assert_eq!(config.fitness_threshold, 0.5);
        assert_eq!(config.policy, RecommendationPolicy::StrictBest);
        assert_eq!(config.batch, BatchRange { start: 1, stop: 5167 });
        assert_eq!(config.tables.master, "tblMaster_040315");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MatcherConfig::from_json(
            r#"{ "policy": "ranked_list", "tables": { "results": "results_v2" } }"#,
        )
        .unwrap();

        assert_eq!(config.policy, RecommendationPolicy::RankedList);
        assert_eq!(config.tables.results, "results_v2");
        assert_eq!(config.tables.component, "tbl458catasto");
        assert_eq!(config.observation_year, 1458);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(MatcherConfig::from_json(r#"{ "policy": "best_guess" }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matcher.json");
        fs::write(&path, r#"{ "observation_year": 1480, "batch": { "stop": 10 } }"#).unwrap();

        let config = MatcherConfig::from_file(&path).unwrap();
        assert_eq!(config.observation_year, 1480);
        assert_eq!(config.batch, BatchRange { start: 1, stop: 10 });

        assert!(MatcherConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
