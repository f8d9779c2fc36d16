//! Population rollup with k-anonymity suppression.
//!
//! Input rows are already filtered to opted-in, eligible profiles. Below the
//! threshold only the count is published.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vibe_core::hash::record_digest;
use vibe_core::stats::{percent, percentile, round_to};
use vibe_core::{AxisKey, AxisVector, Confidence};

/// One anonymized profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySnapshot {
    pub total_commits: u64,
    pub total_repos: u64,
    pub persona_id: String,
    pub persona_confidence: Confidence,
    pub axes: AxisVector,
    #[serde(default)]
    pub ai_collaboration_rate: f64,
    #[serde(default)]
    pub ai_tool_diversity: u32,
}

/// AI adoption band by collaboration rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdoptionBand {
    /// rate == 0
    None,
    /// < 10%
    Light,
    /// < 30%
    Moderate,
    /// < 60%
    Heavy,
    AiNative,
}

impl AdoptionBand {
    pub const ALL: [AdoptionBand; 5] = [
        AdoptionBand::None,
        AdoptionBand::Light,
        AdoptionBand::Moderate,
        AdoptionBand::Heavy,
        AdoptionBand::AiNative,
    ];

    pub fn for_rate(rate: f64) -> Self {
        if rate <= 0.0 || rate.is_nan() {
            AdoptionBand::None
        } else if rate < 0.1 {
            AdoptionBand::Light
        } else if rate < 0.3 {
            AdoptionBand::Moderate
        } else if rate < 0.6 {
            AdoptionBand::Heavy
        } else {
            AdoptionBand::AiNative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionBand::None => "none",
            AdoptionBand::Light => "light",
            AdoptionBand::Moderate => "moderate",
            AdoptionBand::Heavy => "heavy",
            AdoptionBand::AiNative => "ai-native",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisQuartiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketShare {
    pub bucket: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityStats {
    pub eligible_profiles: usize,
    pub total_commits: u64,
    pub total_repos: u64,
    /// Percent of profiles per persona id, one decimal.
    pub persona_distribution: BTreeMap<String, f64>,
    pub axes: BTreeMap<AxisKey, AxisQuartiles>,
    /// Fixed band order: none, light, moderate, heavy, ai-native.
    pub ai_adoption: Vec<BucketShare>,
    /// `1`, `2`, `3+` over profiles that use at least one tool.
    pub tool_diversity: Vec<BucketShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommunityStatsPayload {
    Suppressed {
        reason: String,
        eligible_profiles: usize,
        threshold: usize,
    },
    Full(CommunityStats),
}

impl CommunityStatsPayload {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, CommunityStatsPayload::Suppressed { .. })
    }

    /// SHA-256 of the canonical JSON form, for comparing rollup runs.
    pub fn digest(&self) -> String {
        record_digest(self).expect("community payload serialization should not fail")
    }
}

/// Roll up `snapshots`, or suppress when fewer than `threshold` exist.
/// The result does not depend on input order.
pub fn build_community_stats(
    snapshots: &[CommunitySnapshot],
    threshold: usize,
) -> CommunityStatsPayload {
    let n = snapshots.len();
    if n < threshold {
        tracing::debug!(eligible = n, threshold, "community stats suppressed");
        return CommunityStatsPayload::Suppressed {
            reason: format!(
                "fewer than {threshold} eligible profiles; aggregates withheld to prevent re-identification"
            ),
            eligible_profiles: n,
            threshold,
        };
    }

    let mut personas: BTreeMap<&str, u64> = BTreeMap::new();
    for s in snapshots {
        *personas.entry(s.persona_id.as_str()).or_insert(0) += 1;
    }
    let persona_distribution = personas
        .into_iter()
        .map(|(id, count)| (id.to_string(), percent(count, n as u64)))
        .collect();

    let axes = AxisKey::ALL
        .iter()
        .map(|&key| {
            let values: Vec<f64> = snapshots.iter().map(|s| f64::from(s.axes.get(key))).collect();
            let q = |p: f64| round_to(percentile(&values, p).unwrap_or(0.0), 1);
            (
                key,
                AxisQuartiles {
                    p25: q(25.0),
                    p50: q(50.0),
                    p75: q(75.0),
                },
            )
        })
        .collect();

    let mut adoption = [0u64; 5];
    for s in snapshots {
        let band = AdoptionBand::for_rate(s.ai_collaboration_rate);
        if let Some(i) = AdoptionBand::ALL.iter().position(|b| *b == band) {
            adoption[i] += 1;
        }
    }
    let ai_adoption = AdoptionBand::ALL
        .iter()
        .zip(adoption)
        .map(|(band, count)| BucketShare {
            bucket: band.as_str().to_string(),
            count,
            percentage: percent(count, n as u64),
        })
        .collect();

    let mut diversity = [0u64; 3];
    for s in snapshots {
        match s.ai_tool_diversity {
            0 => {}
            1 => diversity[0] += 1,
            2 => diversity[1] += 1,
            _ => diversity[2] += 1,
        }
    }
    let tool_users: u64 = diversity.iter().sum();
    let tool_diversity = ["1", "2", "3+"]
        .iter()
        .zip(diversity)
        .map(|(label, count)| BucketShare {
            bucket: label.to_string(),
            count,
            percentage: percent(count, tool_users),
        })
        .collect();

    CommunityStatsPayload::Full(CommunityStats {
        eligible_profiles: n,
        total_commits: snapshots.iter().map(|s| s.total_commits).sum(),
        total_repos: snapshots.iter().map(|s| s.total_repos).sum(),
        persona_distribution,
        axes,
        ai_adoption,
        tool_diversity,
    })
}
