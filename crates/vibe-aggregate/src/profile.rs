//! Fan-in of per-repository summaries into one unified profile.
//!
//! Axes are commit-weighted means; the persona is re-derived from the
//! aggregate axes, never voted from per-repo personas.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use vibe_core::stats::percent;
use vibe_core::{
    clamp_score, AggregateError, AxisKey, AxisScore, LevelBands, Persona, VibeAxes,
};
use vibe_persona::{PersonaEngine, RuleTable};

/// One stored axis value as found in history. Older rows carry only a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredAxis {
    Full(AxisScore),
    ScoreOnly { score: u8 },
    Bare(u8),
}

/// One completed repository analysis. Immutable history: several may exist
/// per repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInsightSummary {
    pub job_id: String,
    pub repo_name: String,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default)]
    pub axes: Option<BTreeMap<AxisKey, StoredAxis>>,
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(with = "time::serde::rfc3339")]
    pub analyzed_at: OffsetDateTime,
}

impl RepoInsightSummary {
    pub fn from_axes(
        job_id: impl Into<String>,
        repo_name: impl Into<String>,
        commit_count: u64,
        axes: &VibeAxes,
        persona: Option<Persona>,
        analyzed_at: OffsetDateTime,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            repo_name: repo_name.into(),
            commit_count,
            axes: Some(
                axes.iter()
                    .map(|(k, s)| (k, StoredAxis::Full(s.clone())))
                    .collect(),
            ),
            persona,
            analyzed_at,
        }
    }
}

/// Axes for one repository, with degraded data made explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisRecord {
    Full(VibeAxes),
    /// Some or all axes were missing or score-only; `degraded` names them.
    Placeholder {
        axes: VibeAxes,
        degraded: Vec<AxisKey>,
    },
}

impl AxisRecord {
    pub fn from_summary(summary: &RepoInsightSummary, bands: &LevelBands) -> Self {
        let mut degraded = Vec::new();
        let axes = VibeAxes::from_fn(|key| {
            match summary.axes.as_ref().and_then(|m| m.get(&key)) {
                Some(StoredAxis::Full(score)) if score.score <= 100 => score.clone(),
                Some(StoredAxis::Full(score)) => {
                    degraded.push(key);
                    let mut why = score.why.clone();
                    why.push(format!(
                        "record {} stored {key} = {}; clamped to 100",
                        summary.job_id, score.score
                    ));
                    AxisScore::from_raw(f64::from(score.score), why, bands)
                }
                Some(StoredAxis::ScoreOnly { score }) | Some(StoredAxis::Bare(score)) => {
                    degraded.push(key);
                    AxisScore::from_raw(
                        f64::from(*score),
                        vec![format!(
                            "legacy record {} stored only a score ({score}) for {key}",
                            summary.job_id
                        )],
                        bands,
                    )
                }
                None => {
                    degraded.push(key);
                    AxisScore::placeholder(format!(
                        "no {key} data in record {}; neutral 50 used",
                        summary.job_id
                    ))
                }
            }
        });
        if degraded.is_empty() {
            AxisRecord::Full(axes)
        } else {
            AxisRecord::Placeholder { axes, degraded }
        }
    }

    pub fn axes(&self) -> &VibeAxes {
        match self {
            AxisRecord::Full(axes) | AxisRecord::Placeholder { axes, .. } => axes,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AxisRecord::Placeholder { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoContribution {
    pub repo_name: String,
    pub job_id: String,
    pub commit_count: u64,
    /// Share of total commits, one decimal.
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedProfile {
    pub axes: VibeAxes,
    pub persona: Persona,
    pub repo_breakdown: Vec<RepoContribution>,
    pub total_commits: u64,
    pub total_repos: u64,
    #[serde(default)]
    pub degraded_repos: Vec<String>,
    pub rule_table_version: String,
}

/// Keep the most recent summary per repository (`analyzedAt`, then `jobId`).
fn latest_per_repo(summaries: &[RepoInsightSummary]) -> Vec<&RepoInsightSummary> {
    let mut latest: HashMap<&str, &RepoInsightSummary> = HashMap::new();
    for s in summaries {
        latest
            .entry(s.repo_name.as_str())
            .and_modify(|cur| {
                if (s.analyzed_at, &s.job_id) > (cur.analyzed_at, &cur.job_id) {
                    *cur = s;
                }
            })
            .or_insert(s);
    }
    let mut out: Vec<&RepoInsightSummary> = latest.into_values().collect();
    out.sort_by(|a, b| a.repo_name.cmp(&b.repo_name));
    out
}

/// Build a unified profile from a user's summaries.
///
/// Each axis is the commit-weighted mean across repositories; when every
/// repository reports zero commits the weights are equal. Missing axis data
/// is filled with a neutral placeholder and the repository is listed in
/// `degraded_repos`.
pub fn build_unified_profile(
    summaries: &[RepoInsightSummary],
    table: &RuleTable,
    bands: &LevelBands,
) -> Result<UnifiedProfile, AggregateError> {
    let repos = latest_per_repo(summaries);
    if repos.is_empty() {
        return Err(AggregateError::NoRepositories);
    }

    let records: Vec<AxisRecord> = repos
        .iter()
        .map(|s| AxisRecord::from_summary(s, bands))
        .collect();
    let total_commits: u64 = repos.iter().map(|s| s.commit_count).sum();
    let weights: Vec<f64> = if total_commits == 0 {
        vec![1.0; repos.len()]
    } else {
        repos.iter().map(|s| s.commit_count as f64).collect()
    };
    let weight_sum: f64 = weights.iter().sum();

    let axes = VibeAxes::from_fn(|key| {
        let weighted: f64 = records
            .iter()
            .zip(&weights)
            .map(|(r, w)| f64::from(r.axes().get(key).score) * w)
            .sum();
        let score = clamp_score(weighted / weight_sum);
        let mut why = vec![format!(
            "commit-weighted mean of {} across {} repositories ({} commits)",
            score,
            repos.len(),
            total_commits
        )];
        for (s, r) in repos.iter().zip(&records) {
            why.push(format!("{}: {}", s.repo_name, r.axes().get(key).score));
        }
        AxisScore::from_raw(f64::from(score), why, bands)
    });

    let persona = PersonaEngine::new(table)
        .with_bands(*bands)
        .evaluate(&axes.vector());

    let repo_breakdown = repos
        .iter()
        .map(|s| RepoContribution {
            repo_name: s.repo_name.clone(),
            job_id: s.job_id.clone(),
            commit_count: s.commit_count,
            percentage: if total_commits == 0 {
                percent(1, repos.len() as u64)
            } else {
                percent(s.commit_count, total_commits)
            },
            persona_id: s.persona.as_ref().map(|p| p.id.clone()),
        })
        .collect();

    let degraded_repos: Vec<String> = repos
        .iter()
        .zip(&records)
        .filter(|(_, r)| r.is_degraded())
        .map(|(s, _)| s.repo_name.clone())
        .collect();
    if !degraded_repos.is_empty() {
        tracing::warn!(
            repos = ?degraded_repos,
            "aggregating repositories with placeholder axes"
        );
    }

    Ok(UnifiedProfile {
        axes,
        persona,
        repo_breakdown,
        total_commits,
        total_repos: repos.len() as u64,
        degraded_repos,
        rule_table_version: table.version.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;
    use vibe_core::AxisVector;

    fn axes_from(values: [u8; 6]) -> VibeAxes {
        let bands = LevelBands::default();
        VibeAxes::from_fn(|k| {
            AxisScore::from_raw(
                f64::from(values[k.index()]),
                vec![format!("{k} = {}", values[k.index()])],
                &bands,
            )
        })
    }

    fn summary(job: &str, repo: &str, commits: u64, values: [u8; 6], at: OffsetDateTime) -> RepoInsightSummary {
        RepoInsightSummary::from_axes(job, repo, commits, &axes_from(values), None, at)
    }

    fn build(summaries: &[RepoInsightSummary]) -> UnifiedProfile {
        build_unified_profile(summaries, RuleTable::builtin(), &LevelBands::default()).unwrap()
    }

    #[test]
    fn single_repo_reproduces_its_scores() {
        let values = [73, 41, 66, 12, 58, 90];
        let p = build(&[summary("j1", "alpha", 37, values, datetime!(2024-05-01 0:00 UTC))]);
        assert_eq!(p.axes.vector(), AxisVector::from_array(values));
        assert_eq!(p.total_commits, 37);
        assert_eq!(p.total_repos, 1);
        assert_eq!(p.repo_breakdown[0].percentage, 100.0);
        assert!(p.degraded_repos.is_empty());
    }

    #[test]
    fn weights_follow_commit_counts() {
        let at = datetime!(2024-05-01 0:00 UTC);
        let p = build(&[
            summary("j1", "big", 90, [80; 6], at),
            summary("j2", "small", 10, [20; 6], at),
        ]);
        // (80*90 + 20*10) / 100
        assert_eq!(p.axes.automation_intensity.score, 74);
        assert_eq!(p.repo_breakdown[0].repo_name, "big");
        assert_eq!(p.repo_breakdown[0].percentage, 90.0);
        assert_eq!(p.repo_breakdown[1].percentage, 10.0);
    }

    #[test]
    fn zero_commit_repos_weigh_equally() {
        let at = datetime!(2024-05-01 0:00 UTC);
        let p = build(&[
            summary("j1", "a", 0, [80; 6], at),
            summary("j2", "b", 0, [40; 6], at),
        ]);
        assert_eq!(p.axes.shipping_rhythm.score, 60);
        assert_eq!(p.repo_breakdown[0].percentage, 50.0);
    }

    #[test]
    fn persona_is_rederived_from_aggregate() {
        let at = datetime!(2024-05-01 0:00 UTC);
        let mut a = summary("j1", "a", 50, [90, 10, 90, 40, 50, 50], at);
        a.persona = Some(detect("prompt-sprinter"));
        let b = summary("j2", "b", 50, [10, 90, 10, 40, 50, 50], at);
        let p = build(&[a, b]);
        // Aggregate is uniform-ish 50s: no rule matches.
        assert!(p.persona.is_fallback());
        assert_eq!(p.repo_breakdown[0].persona_id.as_deref(), Some("prompt-sprinter"));
    }

    fn detect(id: &str) -> Persona {
        let table = RuleTable::builtin();
        let rule = table.rule(id).unwrap();
        Persona {
            id: rule.id.clone(),
            name: rule.name.clone(),
            tagline: rule.tagline.clone(),
            confidence: vibe_core::Confidence::High,
            score: 90,
            matched_rules: vec![rule.id.clone()],
            why: vec![],
            caveats: vec![],
            diagnostics: None,
        }
    }

    #[test]
    fn only_latest_summary_per_repo_counts() {
        let p = build(&[
            summary("j1", "alpha", 10, [10; 6], datetime!(2024-01-01 0:00 UTC)),
            summary("j3", "alpha", 12, [70; 6], datetime!(2024-03-01 0:00 UTC)),
            summary("j2", "alpha", 11, [40; 6], datetime!(2024-02-01 0:00 UTC)),
        ]);
        assert_eq!(p.total_repos, 1);
        assert_eq!(p.total_commits, 12);
        assert_eq!(p.repo_breakdown[0].job_id, "j3");
        assert_eq!(p.axes.planning_signal.score, 70);
    }

    #[test]
    fn job_id_breaks_timestamp_ties() {
        let at = datetime!(2024-01-01 0:00 UTC);
        let p = build(&[
            summary("job-b", "alpha", 5, [60; 6], at),
            summary("job-a", "alpha", 5, [30; 6], at),
        ]);
        assert_eq!(p.repo_breakdown[0].job_id, "job-b");
    }

    #[test]
    fn legacy_records_use_placeholders() {
        let legacy: RepoInsightSummary = serde_json::from_value(json!({
            "jobId": "old-1",
            "repoName": "legacy",
            "commitCount": 20,
            "axes": {
                "automation_intensity": 80,
                "guardrail_strength": {"score": 30}
            },
            "analyzedAt": "2023-06-01T00:00:00Z"
        }))
        .unwrap();
        let record = AxisRecord::from_summary(&legacy, &LevelBands::default());
        match &record {
            AxisRecord::Placeholder { axes, degraded } => {
                assert_eq!(degraded.len(), 6);
                assert_eq!(axes.automation_intensity.score, 80);
                assert_eq!(axes.guardrail_strength.score, 30);
                assert_eq!(axes.planning_signal.score, 50);
                assert!(axes.planning_signal.why[0].contains("old-1"));
            }
            AxisRecord::Full(_) => panic!("expected placeholder"),
        }

        let p = build(&[legacy]);
        assert_eq!(p.degraded_repos, vec!["legacy".to_string()]);
        assert_eq!(p.axes.shipping_rhythm.score, 50);
    }

    #[test]
    fn out_of_range_stored_score_is_clamped() {
        let mut s = summary("j1", "alpha", 10, [80; 6], datetime!(2024-05-01 0:00 UTC));
        if let Some(axes) = s.axes.as_mut() {
            axes.insert(
                AxisKey::AutomationIntensity,
                StoredAxis::Full(AxisScore {
                    score: 150,
                    level: vibe_core::AxisLevel::High,
                    why: vec!["imported".to_string()],
                }),
            );
        }
        let record = AxisRecord::from_summary(&s, &LevelBands::default());
        assert!(record.is_degraded());
        assert_eq!(record.axes().automation_intensity.score, 100);

        let p = build(&[s]);
        assert_eq!(p.axes.automation_intensity.score, 100);
        assert_eq!(p.degraded_repos, vec!["alpha".to_string()]);
    }

    #[test]
    fn summary_without_axes_is_still_aggregated() {
        let bare: RepoInsightSummary = serde_json::from_value(json!({
            "jobId": "j0",
            "repoName": "no-axes",
            "commitCount": 3,
            "analyzedAt": "2023-06-01T00:00:00Z"
        }))
        .unwrap();
        let p = build(&[bare]);
        assert_eq!(p.axes.vector(), AxisVector::uniform(50));
        assert!(p.persona.is_fallback());
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = build_unified_profile(&[], RuleTable::builtin(), &LevelBands::default())
            .unwrap_err();
        assert_eq!(err, AggregateError::NoRepositories);
    }

    #[test]
    fn rebuild_is_idempotent_and_order_free() {
        let at = datetime!(2024-05-01 0:00 UTC);
        let a = summary("j1", "a", 30, [81, 22, 47, 63, 19, 70], at);
        let b = summary("j2", "b", 7, [12, 95, 33, 41, 88, 5], at);
        let one = build(&[a.clone(), b.clone()]);
        let two = build(&[b, a]);
        assert_eq!(one, two);
    }

    #[test]
    fn profile_serializes_camel_case() {
        let p = build(&[summary("j1", "alpha", 3, [50; 6], datetime!(2024-05-01 0:00 UTC))]);
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("repoBreakdown").is_some());
        assert!(v.get("totalCommits").is_some());
        assert!(v.get("degradedRepos").is_some());
    }
}
