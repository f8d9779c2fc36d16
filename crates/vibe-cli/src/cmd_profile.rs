use std::path::Path;

use vibe_aggregate::{build_unified_profile, RepoInsightSummary};
use vibe_core::AnalysisConfig;
use vibe_persona::RuleTable;

use crate::input;

/// `vibe profile <summaries.json>`
pub fn execute(path: &Path, config: &AnalysisConfig, table: &RuleTable) -> anyhow::Result<()> {
    let summaries: Vec<RepoInsightSummary> = input::read_json(path)?;
    let profile = build_unified_profile(&summaries, table, &config.level_bands)?;
    input::print_json(&profile)
}
