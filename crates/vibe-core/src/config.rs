//! Engine policy constants with layered resolution.
//!
//! Resolution order (highest priority first):
//! 1. Caller overrides (CLI flags), applied by the caller after `load`
//! 2. Environment variables (`VIBE_*`)
//! 3. Config file (explicit path, else `<config_dir>/vibeprint/config.yaml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Confidence;

/// Score cut-offs for the low/medium/high tri-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelBands {
    /// Scores below this are `low`. Default: 35.
    pub low_below: u8,
    /// Scores below this (and not low) are `medium`. Default: 65.
    pub medium_below: u8,
}

impl Default for LevelBands {
    fn default() -> Self {
        Self {
            low_below: 35,
            medium_below: 65,
        }
    }
}

/// Signal-volume cut-offs for AI metric confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfidenceBands {
    /// Fewer AI-assisted commits than this is `low`. Default: 3.
    pub low_below: u64,
    /// Fewer than this (and not low) is `medium`. Default: 10.
    pub medium_below: u64,
}

impl Default for AiConfidenceBands {
    fn default() -> Self {
        Self {
            low_below: 3,
            medium_below: 10,
        }
    }
}

impl AiConfidenceBands {
    pub fn confidence_for(&self, signals: u64) -> Confidence {
        if signals < self.low_below {
            Confidence::Low
        } else if signals < self.medium_below {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Idle gap that closes an episode for axis scoring. Default: 4h.
    pub episode_gap_hours: f64,
    /// Idle gap that closes a work session for streak/peak-day stats. Default: 8h.
    pub streak_gap_hours: f64,
    pub level_bands: LevelBands,
    pub ai_confidence: AiConfidenceBands,
    /// Minimum cohort size before community stats are published. Default: 10.
    pub community_threshold: usize,
    /// Upper bound on fallback vectors kept by the coverage probe. Default: 25.
    pub coverage_sample_limit: usize,
    /// Grid step used when the caller does not pick one. Default: 20.
    pub coverage_step: u8,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            episode_gap_hours: 4.0,
            streak_gap_hours: 8.0,
            level_bands: LevelBands::default(),
            ai_confidence: AiConfidenceBands::default(),
            community_threshold: 10,
            coverage_sample_limit: 25,
            coverage_step: 20,
        }
    }
}

impl AnalysisConfig {
    /// Load with file and environment layers applied, then validate.
    ///
    /// An explicit `path` must exist. Without one, the user config is read
    /// only if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::user_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/vibeprint/config.yaml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vibeprint").join("config.yaml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse YAML (or JSON, which YAML accepts).
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `VIBE_*` overrides through `lookup`. Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("VIBE_EPISODE_GAP_HOURS").and_then(|v| v.parse().ok()) {
            self.episode_gap_hours = v;
        }
        if let Some(v) = lookup("VIBE_STREAK_GAP_HOURS").and_then(|v| v.parse().ok()) {
            self.streak_gap_hours = v;
        }
        if let Some(v) = lookup("VIBE_COMMUNITY_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.community_threshold = v;
        }
        if let Some(v) = lookup("VIBE_COVERAGE_STEP").and_then(|v| v.parse().ok()) {
            self.coverage_step = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, hours) in [
            ("episode_gap_hours", self.episode_gap_hours),
            ("streak_gap_hours", self.streak_gap_hours),
        ] {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(invalid(field, "must be a positive number of hours"));
            }
            if hours > MAX_GAP_HOURS {
                return Err(invalid(field, "must be at most one year (8760 hours)"));
            }
        }
        if self.episode_gap_hours > self.streak_gap_hours {
            tracing::warn!(
                episode = self.episode_gap_hours,
                streak = self.streak_gap_hours,
                "episode gap is coarser than streak gap"
            );
        }
        let bands = &self.level_bands;
        if bands.low_below >= bands.medium_below || bands.medium_below > 100 {
            return Err(invalid(
                "level_bands",
                "need low_below < medium_below <= 100",
            ));
        }
        if self.ai_confidence.low_below >= self.ai_confidence.medium_below {
            return Err(invalid("ai_confidence", "need low_below < medium_below"));
        }
        if self.community_threshold == 0 {
            return Err(invalid("community_threshold", "must be at least 1"));
        }
        if self.coverage_step == 0 || self.coverage_step > 100 {
            return Err(invalid("coverage_step", "must be between 1 and 100"));
        }
        Ok(())
    }

    pub fn episode_gap(&self) -> time::Duration {
        hours_to_duration(self.episode_gap_hours)
    }

    pub fn streak_gap(&self) -> time::Duration {
        hours_to_duration(self.streak_gap_hours)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Upper bound for either idle gap.
pub const MAX_GAP_HOURS: f64 = 24.0 * 365.0;

/// Out-of-range input saturates to the nearest valid gap.
fn hours_to_duration(hours: f64) -> time::Duration {
    let hours = if hours.is_nan() { 0.0 } else { hours.clamp(0.0, MAX_GAP_HOURS) };
    time::Duration::seconds_f64(hours * 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.episode_gap_hours, 4.0);
        assert_eq!(config.streak_gap_hours, 8.0);
        assert_eq!(config.community_threshold, 10);
        assert_eq!(config.episode_gap(), time::Duration::hours(4));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AnalysisConfig::from_yaml_str("episode_gap_hours: 3\nlevel_bands:\n  low_below: 30\n")
            .unwrap();
        assert_eq!(config.episode_gap_hours, 3.0);
        assert_eq!(config.level_bands.low_below, 30);
        assert_eq!(config.level_bands.medium_below, 65);
        assert_eq!(config.streak_gap_hours, 8.0);
    }

    #[test]
    fn json_is_accepted() {
        let config = AnalysisConfig::from_yaml_str(r#"{"community_threshold": 25}"#).unwrap();
        assert_eq!(config.community_threshold, 25);
    }

    #[test]
    fn empty_file_is_default() {
        let config = AnalysisConfig::from_yaml_str("  \n").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = AnalysisConfig::from_yaml_str("episode_gap_hours: [oops").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("VIBE_EPISODE_GAP_HOURS", "2.5"),
            ("VIBE_COMMUNITY_THRESHOLD", "20"),
            ("VIBE_COVERAGE_STEP", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let mut config = AnalysisConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.episode_gap_hours, 2.5);
        assert_eq!(config.community_threshold, 20);
        assert_eq!(config.coverage_step, 20);
    }

    #[test]
    fn inverted_bands_rejected() {
        let mut config = AnalysisConfig::default();
        config.level_bands = LevelBands {
            low_below: 70,
            medium_below: 60,
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "level_bands"));
    }

    #[test]
    fn zero_threshold_and_step_rejected() {
        let mut config = AnalysisConfig::default();
        config.community_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.coverage_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_gap_rejected() {
        let mut config = AnalysisConfig::default();
        config.streak_gap_hours = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_gap_rejected_and_durations_saturate() {
        let mut config = AnalysisConfig::default();
        config.apply_env_overrides(|key| {
            (key == "VIBE_STREAK_GAP_HOURS").then(|| "1e20".to_string())
        });
        assert_eq!(config.streak_gap_hours, 1e20);
        assert!(config.validate().is_err());
        assert_eq!(config.streak_gap(), time::Duration::hours(24 * 365));

        config.streak_gap_hours = MAX_GAP_HOURS;
        config.validate().unwrap();
    }

    #[test]
    fn load_reads_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vibe.yaml");
        std::fs::write(&path, "streak_gap_hours: 12\n").unwrap();
        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.streak_gap_hours, 12.0);
    }

    #[test]
    fn load_missing_explicit_file_is_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = AnalysisConfig::from_file(&tmp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn ai_confidence_bands() {
        let bands = AiConfidenceBands::default();
        assert_eq!(bands.confidence_for(0), Confidence::Low);
        assert_eq!(bands.confidence_for(2), Confidence::Low);
        assert_eq!(bands.confidence_for(3), Confidence::Medium);
        assert_eq!(bands.confidence_for(9), Confidence::Medium);
        assert_eq!(bands.confidence_for(10), Confidence::High);
    }
}
