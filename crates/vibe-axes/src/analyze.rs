//! End-to-end analysis of one repository's commits.

use serde::{Deserialize, Serialize};
use vibe_core::{AiToolMetrics, AnalysisConfig, CommitEvent, Confidence, Persona, VibeAxes};
use vibe_persona::{PersonaEngine, RuleTable};
use vibe_signals::{
    classify_commit, compute_ai_tool_metrics, timing_stats, CommitClassification, TimingStats,
};

use crate::metrics::RepoMetrics;
use crate::scoring::score_axes;

/// Below this many commits the persona is provisional.
pub const SPARSE_COMMIT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoAnalysis {
    pub repo_name: String,
    pub commit_count: u64,
    pub axes: VibeAxes,
    pub persona: Persona,
    pub ai_tools: AiToolMetrics,
    pub timing: TimingStats,
    pub metrics: RepoMetrics,
    pub rule_table_version: String,
    pub rule_table_digest: String,
}

/// Analyze with the built-in rule table.
pub fn analyze_repo(repo_name: &str, commits: &[CommitEvent], config: &AnalysisConfig) -> RepoAnalysis {
    analyze_repo_with(repo_name, commits, config, RuleTable::builtin())
}

pub fn analyze_repo_with(
    repo_name: &str,
    commits: &[CommitEvent],
    config: &AnalysisConfig,
    table: &RuleTable,
) -> RepoAnalysis {
    let classifications: Vec<CommitClassification> = commits.iter().map(classify_commit).collect();
    let timing = timing_stats(commits, config.episode_gap(), config.streak_gap());
    let ai_tools = compute_ai_tool_metrics(commits, commits.len() as u64, &config.ai_confidence);
    let metrics = RepoMetrics::compute(
        commits,
        &classifications,
        &timing,
        &ai_tools,
        config.episode_gap(),
    );

    let axes = if commits.is_empty() {
        VibeAxes::neutral("no commits to analyze (0 commits)")
    } else {
        if !metrics.has_size_data() {
            tracing::warn!(
                repo = repo_name,
                commits = commits.len(),
                "no diff stats; change surface scored from paths only"
            );
        }
        score_axes(&metrics, &config.level_bands)
    };

    let engine = PersonaEngine::new(table).with_bands(config.level_bands);
    let mut persona = engine.evaluate(&axes.vector());
    if commits.len() < SPARSE_COMMIT_THRESHOLD {
        persona.confidence = Confidence::Low;
        persona.caveats.push(format!(
            "Only {} commits analyzed; at least {} are needed for a stable persona.",
            commits.len(),
            SPARSE_COMMIT_THRESHOLD
        ));
    }

    tracing::debug!(
        repo = repo_name,
        commits = commits.len(),
        episodes = timing.episode_count,
        persona = %persona.id,
        "repository analyzed"
    );

    RepoAnalysis {
        repo_name: repo_name.to_string(),
        commit_count: commits.len() as u64,
        axes,
        persona,
        ai_tools,
        timing,
        metrics,
        rule_table_version: table.version.clone(),
        rule_table_digest: table.digest(),
    }
}
