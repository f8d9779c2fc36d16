//! Repository-level metrics: the numbers every axis score and its evidence
//! strings are built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Duration;
use vibe_core::stats::{mean, percentile, ratio, round_to};
use vibe_core::{AiToolMetrics, CommitEvent};
use vibe_signals::{CommitCategory, CommitClassification, Subsystem, TimingStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMetrics {
    pub commit_count: u64,
    /// Denominator for every per-commit ratio below.
    pub non_merge_commits: u64,
    /// Commits carrying diff stats.
    pub sized_commits: u64,
    pub lines_p50: Option<f64>,
    pub lines_p90: Option<f64>,
    pub avg_files_per_commit: Option<f64>,
    pub multi_subsystem_ratio: f64,
    pub fix_ratio: f64,
    pub feature_commits: u64,
    /// Feature commits followed by a fix inside the same episode.
    pub fixup_after_feature: u64,
    pub conventional_ratio: f64,
    pub body_ratio: f64,
    pub test_touch_ratio: f64,
    pub docs_touch_ratio: f64,
    pub ci_infra_commits: u64,
    pub ai_config_commits: u64,
    pub ai_collaboration_rate: f64,
    pub ai_tool_diversity: u32,
    pub burstiness: f64,
    pub commits_per_active_day: f64,
    pub longest_streak_days: u32,
    pub active_day_ratio: f64,
    pub category_counts: BTreeMap<CommitCategory, u64>,
}

impl RepoMetrics {
    /// `classifications[i]` must describe `commits[i]`.
    pub fn compute(
        commits: &[CommitEvent],
        classifications: &[CommitClassification],
        timing: &TimingStats,
        ai: &AiToolMetrics,
        episode_gap: Duration,
    ) -> Self {
        let pairs: Vec<(&CommitEvent, &CommitClassification)> =
            commits.iter().zip(classifications).collect();
        let work: Vec<&(&CommitEvent, &CommitClassification)> = pairs
            .iter()
            .filter(|(_, c)| c.category != CommitCategory::Merge)
            .collect();
        let denom = work.len() as u64;
        let count = |pred: fn(&CommitEvent, &CommitClassification) -> bool| -> u64 {
            work.iter().filter(|pair| pred(pair.0, pair.1)).count() as u64
        };

        let sized: Vec<&CommitEvent> = commits.iter().filter(|c| c.has_size_data()).collect();
        let lines: Vec<f64> = sized
            .iter()
            .filter(|c| c.lines_changed() > 0)
            .map(|c| c.lines_changed() as f64)
            .collect();
        let files: Vec<f64> = sized
            .iter()
            .map(|c| c.files_changed as f64)
            .collect();

        let mut category_counts: BTreeMap<CommitCategory, u64> = BTreeMap::new();
        for (_, c) in &pairs {
            *category_counts.entry(c.category).or_insert(0) += 1;
        }

        let feature_commits = category_counts
            .get(&CommitCategory::Feature)
            .copied()
            .unwrap_or(0);

        Self {
            commit_count: commits.len() as u64,
            non_merge_commits: denom,
            sized_commits: sized.len() as u64,
            lines_p50: percentile(&lines, 50.0).map(|v| round_to(v, 1)),
            lines_p90: percentile(&lines, 90.0).map(|v| round_to(v, 1)),
            avg_files_per_commit: mean(&files).map(|v| round_to(v, 2)),
            multi_subsystem_ratio: round_to(
                ratio(count(|_, c| c.subsystems.len() > 1), denom),
                4,
            ),
            fix_ratio: round_to(
                ratio(count(|_, c| c.category == CommitCategory::Fix), denom),
                4,
            ),
            feature_commits,
            fixup_after_feature: fixups_after_features(&pairs, episode_gap),
            conventional_ratio: round_to(ratio(count(|_, c| c.conventional), denom), 4),
            body_ratio: round_to(ratio(count(|e, _| e.has_body()), denom), 4),
            test_touch_ratio: round_to(
                ratio(
                    count(|_, c| {
                        c.touches(Subsystem::Test) || c.category == CommitCategory::Test
                    }),
                    denom,
                ),
                4,
            ),
            docs_touch_ratio: round_to(
                ratio(
                    count(|_, c| {
                        c.touches(Subsystem::Docs) || c.category == CommitCategory::Docs
                    }),
                    denom,
                ),
                4,
            ),
            ci_infra_commits: count(|_, c| {
                c.touches(Subsystem::Ci)
                    || c.touches(Subsystem::Infra)
                    || matches!(c.category, CommitCategory::Ci | CommitCategory::Build)
            }),
            ai_config_commits: count(|_, c| c.touches(Subsystem::AiConfig)),
            ai_collaboration_rate: ai.ai_collaboration_rate,
            ai_tool_diversity: ai.tool_diversity,
            burstiness: timing.burstiness,
            commits_per_active_day: if timing.active_days == 0 {
                0.0
            } else {
                round_to(commits.len() as f64 / timing.active_days as f64, 2)
            },
            longest_streak_days: timing.longest_streak.as_ref().map_or(0, |s| s.days),
            active_day_ratio: if timing.calendar_span_days <= 0 {
                0.0
            } else {
                round_to(
                    timing.active_days as f64 / timing.calendar_span_days as f64,
                    4,
                )
            },
            category_counts,
        }
    }

    pub fn has_size_data(&self) -> bool {
        self.sized_commits > 0
    }
}

/// Count feature commits followed by a fix in the same episode, in committer
/// order. An idle gap above `episode_gap` closes the episode. Each feature is
/// counted at most once.
fn fixups_after_features(
    pairs: &[(&CommitEvent, &CommitClassification)],
    episode_gap: Duration,
) -> u64 {
    let mut ordered: Vec<&(&CommitEvent, &CommitClassification)> = pairs.iter().collect();
    ordered.sort_by_key(|(e, _)| e.committer_date);

    let mut previous = None;
    let mut open_feature = false;
    let mut count = 0;
    for (event, class) in ordered {
        if let Some(prev) = previous {
            if event.committer_date - prev > episode_gap {
                open_feature = false;
            }
        }
        previous = Some(event.committer_date);
        match class.category {
            CommitCategory::Feature => open_feature = true,
            CommitCategory::Fix if open_feature => {
                open_feature = false;
                count += 1;
            }
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::OffsetDateTime;
    use vibe_core::AiConfidenceBands;
    use vibe_signals::{classify_commit, compute_ai_tool_metrics, timing_stats};

    fn commit(sha: &str, at: OffsetDateTime, message: &str, paths: &[&str], lines: u64) -> CommitEvent {
        CommitEvent {
            sha: sha.to_string(),
            message: message.to_string(),
            author_date: at,
            committer_date: at,
            author_email: "dev@example.com".to_string(),
            additions: lines,
            deletions: 0,
            files_changed: paths.len() as u64,
            parents: vec!["p".to_string()],
            file_paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn metrics_for(commits: &[CommitEvent]) -> RepoMetrics {
        let classes: Vec<CommitClassification> = commits.iter().map(classify_commit).collect();
        let timing = timing_stats(commits, Duration::hours(4), Duration::hours(8));
        let ai = compute_ai_tool_metrics(commits, commits.len() as u64, &AiConfidenceBands::default());
        RepoMetrics::compute(commits, &classes, &timing, &ai, Duration::hours(4))
    }

    #[test]
    fn ratios_and_counts() {
        let commits = vec![
            commit("a", datetime!(2024-03-04 09:00 UTC), "feat: add search\n\nIndexes titles.", &["src/search.rs", "tests/search.rs"], 40),
            commit("b", datetime!(2024-03-04 10:00 UTC), "fix: empty query", &["src/search.rs"], 4),
            commit("c", datetime!(2024-03-05 09:00 UTC), "docs: usage", &["README.md"], 10),
            commit("d", datetime!(2024-03-05 11:00 UTC), "update ci", &[".github/workflows/ci.yml", "CLAUDE.md"], 6),
        ];
        let m = metrics_for(&commits);
        assert_eq!(m.commit_count, 4);
        assert_eq!(m.non_merge_commits, 4);
        assert_eq!(m.fix_ratio, 0.25);
        assert_eq!(m.feature_commits, 1);
        assert_eq!(m.fixup_after_feature, 1);
        assert_eq!(m.conventional_ratio, 0.75);
        assert_eq!(m.body_ratio, 0.25);
        assert_eq!(m.test_touch_ratio, 0.25);
        assert_eq!(m.docs_touch_ratio, 0.25);
        assert_eq!(m.ci_infra_commits, 1);
        assert_eq!(m.ai_config_commits, 1);
        assert_eq!(m.multi_subsystem_ratio, 0.5);
        assert_eq!(m.avg_files_per_commit, Some(1.5));
        assert_eq!(m.commits_per_active_day, 2.0);
        assert_eq!(m.longest_streak_days, 2);
        assert_eq!(m.active_day_ratio, 1.0);
    }

    #[test]
    fn fix_outside_episode_is_not_a_fixup() {
        let commits = vec![
            commit("a", datetime!(2024-03-04 09:00 UTC), "feat: add search", &[], 0),
            commit("b", datetime!(2024-03-04 18:00 UTC), "fix: empty query", &[], 0),
        ];
        assert_eq!(metrics_for(&commits).fixup_after_feature, 0);
    }

    #[test]
    fn fix_late_in_a_long_episode_is_a_fixup() {
        // Steady commits keep one episode open for nine hours.
        let commits = vec![
            commit("a", datetime!(2024-03-04 09:00 UTC), "feat: add search", &[], 0),
            commit("b", datetime!(2024-03-04 12:00 UTC), "chore: bump deps", &[], 0),
            commit("c", datetime!(2024-03-04 15:00 UTC), "chore: bump deps", &[], 0),
            commit("d", datetime!(2024-03-04 18:00 UTC), "fix: empty query", &[], 0),
        ];
        assert_eq!(metrics_for(&commits).fixup_after_feature, 1);
    }

    #[test]
    fn merges_are_excluded_from_ratios() {
        let mut merge = commit("m", datetime!(2024-03-04 12:00 UTC), "Merge pull request #4 from x/y", &[], 0);
        merge.parents.push("q".to_string());
        let commits = vec![
            commit("a", datetime!(2024-03-04 09:00 UTC), "fix: thing", &[], 0),
            merge,
        ];
        let m = metrics_for(&commits);
        assert_eq!(m.non_merge_commits, 1);
        assert_eq!(m.fix_ratio, 1.0);
        assert_eq!(m.category_counts.get(&CommitCategory::Merge), Some(&1));
    }

    #[test]
    fn missing_size_data_is_tolerated() {
        let commits = vec![
            commit("a", datetime!(2024-03-04 09:00 UTC), "feat: x", &[], 0),
            commit("b", datetime!(2024-03-04 10:00 UTC), "feat: y", &[], 0),
        ];
        let m = metrics_for(&commits);
        assert!(!m.has_size_data());
        assert_eq!(m.lines_p90, None);
        assert_eq!(m.avg_files_per_commit, None);
    }
}
