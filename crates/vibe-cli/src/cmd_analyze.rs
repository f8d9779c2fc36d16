use std::path::Path;

use anyhow::Context;
use time::OffsetDateTime;
use vibe_aggregate::RepoInsightSummary;
use vibe_axes::analyze_repo_with;
use vibe_core::hash::sha256_hex;
use vibe_core::normalize::{normalize_commits, RawCommit};
use vibe_core::AnalysisConfig;
use vibe_persona::RuleTable;

use crate::input;

pub struct AnalyzeParams<'a> {
    pub input: &'a Path,
    pub repo: Option<&'a str>,
    pub episode_gap_hours: Option<f64>,
    pub summary: bool,
    pub job_id: Option<&'a str>,
}

/// `vibe analyze <commits.json>`
pub fn execute(
    params: &AnalyzeParams<'_>,
    config: &AnalysisConfig,
    table: &RuleTable,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(hours) = params.episode_gap_hours {
        config.episode_gap_hours = hours;
        config.validate().context("--episode-gap-hours")?;
    }

    let content = input::read_input(params.input)?;
    let raws: Vec<RawCommit> = input::parse_json(&content, params.input)?;
    let commits = normalize_commits(&raws)
        .with_context(|| format!("normalizing commits from {}", params.input.display()))?;

    let repo_name = params
        .repo
        .map(str::to_string)
        .unwrap_or_else(|| default_repo_name(params.input));
    let analysis = analyze_repo_with(&repo_name, &commits, &config, table);

    if params.summary {
        let job_id = params
            .job_id
            .map(str::to_string)
            .unwrap_or_else(|| default_job_id(&content));
        let summary = RepoInsightSummary::from_axes(
            job_id,
            analysis.repo_name.clone(),
            analysis.commit_count,
            &analysis.axes,
            Some(analysis.persona.clone()),
            OffsetDateTime::now_utc(),
        );
        return input::print_json(&summary);
    }
    input::print_json(&analysis)
}

fn default_repo_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| *s != "-")
        .unwrap_or("repository")
        .to_string()
}

/// Same input, same id.
fn default_job_id(content: &str) -> String {
    let digest = sha256_hex(content.as_bytes());
    format!("job-{}", &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_name_from_file_stem() {
        assert_eq!(default_repo_name(Path::new("exports/api-server.json")), "api-server");
        assert_eq!(default_repo_name(Path::new("-")), "repository");
    }

    #[test]
    fn job_id_is_stable_per_input() {
        let a = default_job_id("[]");
        assert_eq!(a, default_job_id("[]"));
        assert_ne!(a, default_job_id("[ ]"));
        assert!(a.starts_with("job-"));
        assert_eq!(a.len(), 16);
    }
}
