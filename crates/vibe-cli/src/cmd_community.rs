use std::path::Path;

use vibe_aggregate::{build_community_stats, CommunitySnapshot};
use vibe_core::AnalysisConfig;

use crate::input;

/// `vibe community <snapshots.json>`
pub fn execute(
    path: &Path,
    threshold: Option<usize>,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    let threshold = threshold.unwrap_or(config.community_threshold);
    if threshold == 0 {
        anyhow::bail!("--threshold must be at least 1");
    }
    let snapshots: Vec<CommunitySnapshot> = input::read_json(path)?;
    let payload = build_community_stats(&snapshots, threshold);
    tracing::info!(digest = %payload.digest(), "community payload");
    input::print_json(&payload)
}
