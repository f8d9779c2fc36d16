//! The six axis formulas. Each is a pure function of `RepoMetrics` and every
//! `why` entry quotes the number it is built from.

use vibe_core::{AxisKey, AxisScore, LevelBands, VibeAxes};

use crate::metrics::RepoMetrics;

fn pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn capped(value: f64, cap: f64) -> f64 {
    if cap <= 0.0 {
        return 0.0;
    }
    (value / cap).clamp(0.0, 1.0)
}

pub fn score_axes(m: &RepoMetrics, bands: &LevelBands) -> VibeAxes {
    VibeAxes::from_fn(|key| {
        let (raw, why) = match key {
            AxisKey::AutomationIntensity => automation(m),
            AxisKey::GuardrailStrength => guardrail(m),
            AxisKey::IterationLoopIntensity => iteration(m),
            AxisKey::PlanningSignal => planning(m),
            AxisKey::ChangeSurfaceArea => surface(m),
            AxisKey::ShippingRhythm => rhythm(m),
        };
        AxisScore::from_raw(raw, why, bands)
    })
}

fn automation(m: &RepoMetrics) -> (f64, Vec<String>) {
    let diversity = f64::from(m.ai_tool_diversity.min(3));
    let config = m.ai_config_commits.min(3) as f64;
    let raw = m.ai_collaboration_rate * 70.0 + diversity * 6.0 + config * 4.0;
    let why = vec![
        format!(
            "AI collaboration rate is {} of commits",
            pct(m.ai_collaboration_rate)
        ),
        format!("{} distinct AI tools credited in trailers", m.ai_tool_diversity),
        format!("{} commits touched AI tool configuration", m.ai_config_commits),
    ];
    (raw, why)
}

fn guardrail(m: &RepoMetrics) -> (f64, Vec<String>) {
    let ci = m.ci_infra_commits.min(5) as f64;
    let raw = m.test_touch_ratio * 60.0 + ci * 4.0 + m.conventional_ratio * 20.0;
    let why = vec![
        format!("{} of commits touch tests", pct(m.test_touch_ratio)),
        format!("{} commits change CI or build configuration", m.ci_infra_commits),
        format!(
            "{} of messages follow conventional commits",
            pct(m.conventional_ratio)
        ),
    ];
    (raw, why)
}

fn iteration(m: &RepoMetrics) -> (f64, Vec<String>) {
    let fixup_rate = if m.feature_commits == 0 {
        0.0
    } else {
        capped(m.fixup_after_feature as f64, m.feature_commits as f64)
    };
    let raw = m.fix_ratio * 60.0 + fixup_rate * 25.0 + m.burstiness.max(0.0) * 15.0;
    let why = vec![
        format!("{} of commits are fixes", pct(m.fix_ratio)),
        format!(
            "{} of {} feature commits were followed by a fix in the same session",
            m.fixup_after_feature, m.feature_commits
        ),
        format!("burstiness is {:.2}", m.burstiness),
    ];
    (raw, why)
}

fn planning(m: &RepoMetrics) -> (f64, Vec<String>) {
    let raw = m.conventional_ratio * 40.0 + m.docs_touch_ratio * 30.0 + m.body_ratio * 30.0;
    let why = vec![
        format!(
            "{} of messages follow conventional commits",
            pct(m.conventional_ratio)
        ),
        format!("{} of commits touch documentation", pct(m.docs_touch_ratio)),
        format!("{} of messages carry a body", pct(m.body_ratio)),
    ];
    (raw, why)
}

fn surface(m: &RepoMetrics) -> (f64, Vec<String>) {
    let mut why = Vec::new();
    let files_part = match m.avg_files_per_commit {
        Some(avg) => {
            why.push(format!("{avg:.1} files changed per commit on average"));
            capped(avg, 10.0) * 50.0
        }
        None => 25.0,
    };
    let lines_part = match m.lines_p90 {
        Some(p90) => {
            why.push(format!("p90 commit size is {p90:.0} lines"));
            capped(p90, 500.0) * 35.0
        }
        None => 17.5,
    };
    if !m.has_size_data() {
        why.push(format!(
            "no diff stats for any of {} commits; size components held at midpoint",
            m.commit_count
        ));
    }
    why.push(format!(
        "{} of commits span more than one subsystem",
        pct(m.multi_subsystem_ratio)
    ));
    let raw = files_part + lines_part + m.multi_subsystem_ratio * 15.0;
    (raw, why)
}

fn rhythm(m: &RepoMetrics) -> (f64, Vec<String>) {
    let raw = capped(m.commits_per_active_day, 5.0) * 35.0
        + capped(f64::from(m.longest_streak_days), 14.0) * 30.0
        + m.active_day_ratio.clamp(0.0, 1.0) * 35.0;
    let why = vec![
        format!("{:.1} commits per active day", m.commits_per_active_day),
        format!("longest streak is {} days", m.longest_streak_days),
        format!(
            "active on {} of days in the commit window",
            pct(m.active_day_ratio)
        ),
    ];
    (raw, why)
}
