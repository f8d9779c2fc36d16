//! AI-tool attribution from commit trailers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use vibe_core::stats::{percent, ratio, round_to};
use vibe_core::{AiConfidenceBands, AiToolMetrics, CommitEvent, ToolUsage};

use crate::trailers::attribution_values;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiTool {
    Claude,
    Copilot,
    Cursor,
    Aider,
    Cline,
    Roo,
    Windsurf,
    Devin,
    Gemini,
    SweAgent,
}

impl AiTool {
    pub fn id(&self) -> &'static str {
        match self {
            AiTool::Claude => "claude",
            AiTool::Copilot => "copilot",
            AiTool::Cursor => "cursor",
            AiTool::Aider => "aider",
            AiTool::Cline => "cline",
            AiTool::Roo => "roo",
            AiTool::Windsurf => "windsurf",
            AiTool::Devin => "devin",
            AiTool::Gemini => "gemini",
            AiTool::SweAgent => "swe-agent",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AiTool::Claude => "Claude",
            AiTool::Copilot => "GitHub Copilot",
            AiTool::Cursor => "Cursor",
            AiTool::Aider => "Aider",
            AiTool::Cline => "Cline",
            AiTool::Roo => "Roo Code",
            AiTool::Windsurf => "Windsurf",
            AiTool::Devin => "Devin",
            AiTool::Gemini => "Gemini",
            AiTool::SweAgent => "SWE-agent",
        }
    }
}

/// Fingerprints checked in order; the first hit identifies the tool.
/// Claude matches as a plain substring and goes first, so agent wrappers
/// naming the model still credit Claude.
static FINGERPRINTS: LazyLock<Vec<(AiTool, Regex)>> = LazyLock::new(|| {
    vec![
        (AiTool::Claude, Regex::new(r"(?i)claude|anthropic").unwrap()),
        (AiTool::SweAgent, Regex::new(r"(?i)\bswe-?agent\b").unwrap()),
        (AiTool::Copilot, Regex::new(r"(?i)\bcopilot\b").unwrap()),
        (
            AiTool::Cursor,
            Regex::new(r"(?i)\bcursor(?:agent)?\b|cursor\.(?:sh|com)").unwrap(),
        ),
        (AiTool::Aider, Regex::new(r"(?i)\baider\b").unwrap()),
        (AiTool::Cline, Regex::new(r"(?i)\bcline\b").unwrap()),
        (
            AiTool::Roo,
            Regex::new(r"(?i)\broo(?:[- ]?code)?\b|\broocode\b").unwrap(),
        ),
        (
            AiTool::Windsurf,
            Regex::new(r"(?i)\bcodeium\b|\bwindsurf\b").unwrap(),
        ),
        (AiTool::Devin, Regex::new(r"(?i)\bdevin\b|\bcognition\b").unwrap()),
        (
            AiTool::Gemini,
            Regex::new(r"(?i)\bgemini\b|\bgoogle[- ]?(?:ai|gemini|labs)\b").unwrap(),
        ),
    ]
});

/// Match one attribution value against the fingerprint table.
/// Human co-authors return `None`.
pub fn identify_tool(value: &str) -> Option<AiTool> {
    FINGERPRINTS
        .iter()
        .find(|(_, re)| re.is_match(value))
        .map(|(tool, _)| *tool)
}

/// Distinct tools credited by one commit message, in trailer order.
pub fn detect_commit_tools(message: &str) -> Vec<AiTool> {
    let mut tools: Vec<AiTool> = Vec::new();
    for value in attribution_values(message) {
        if let Some(tool) = identify_tool(&value) {
            if !tools.contains(&tool) {
                tools.push(tool);
            }
        }
    }
    tools
}

/// Aggregate AI metrics over `commits`.
///
/// `total_commits` is the caller's denominator for the collaboration rate;
/// it may be larger than `commits.len()` when only a subset was inspected.
/// Per-tool percentages are shares of AI-assisted commits, sorted by
/// commit count descending with first-seen order breaking ties.
pub fn compute_ai_tool_metrics(
    commits: &[CommitEvent],
    total_commits: u64,
    bands: &AiConfidenceBands,
) -> AiToolMetrics {
    let mut assisted: u64 = 0;
    let mut counts: Vec<(AiTool, u64)> = Vec::new();

    for commit in commits {
        let tools = detect_commit_tools(&commit.message);
        if tools.is_empty() {
            continue;
        }
        assisted += 1;
        for tool in tools {
            match counts.iter_mut().find(|(t, _)| *t == tool) {
                Some((_, n)) => *n += 1,
                None => counts.push((tool, 1)),
            }
        }
    }

    if assisted == 0 {
        return AiToolMetrics::none();
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let tools: Vec<ToolUsage> = counts
        .iter()
        .map(|(tool, n)| ToolUsage {
            tool_id: tool.id().to_string(),
            name: tool.name().to_string(),
            commit_count: *n,
            percentage: percent(*n, assisted),
        })
        .collect();

    if total_commits < assisted {
        tracing::warn!(
            total_commits,
            assisted,
            "total commit count below assisted count; using assisted count as denominator"
        );
    }
    let denominator = total_commits.max(assisted);
    AiToolMetrics {
        detected: true,
        ai_assisted_commits: assisted,
        ai_collaboration_rate: round_to(ratio(assisted, denominator), 4),
        tool_diversity: tools.len() as u32,
        primary_tool: tools.first().cloned(),
        tools,
        confidence: bands.confidence_for(assisted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use vibe_core::Confidence;

    fn commit(sha: &str, message: &str) -> CommitEvent {
        let at = datetime!(2024-06-01 12:00 UTC);
        CommitEvent {
            sha: sha.to_string(),
            message: message.to_string(),
            author_date: at,
            committer_date: at,
            author_email: String::new(),
            additions: 0,
            deletions: 0,
            files_changed: 0,
            parents: vec![],
            file_paths: vec![],
        }
    }

    #[test]
    fn claude_values_identify_claude() {
        for v in [
            "Claude <noreply@anthropic.com>",
            "claude-code",
            "Some Bot <bot@ANTHROPIC.COM>",
            "CLAUDE Opus",
            "ClaudeBot <bot@example.com>",
            "claudecode <x@example.com>",
            "SWE-agent (claude) <s@example.com>",
        ] {
            assert_eq!(identify_tool(v), Some(AiTool::Claude), "{v}");
        }
    }

    #[test]
    fn human_values_identify_nothing() {
        for v in [
            "Alice <alice@example.com>",
            "Bob Smith <bob@corp.io>",
            "Rooney <rooney@example.com>",
            "Eclinerator <x@example.com>",
        ] {
            assert_eq!(identify_tool(v), None, "{v}");
        }
    }

    #[test]
    fn table_covers_each_tool() {
        let cases = [
            ("Copilot <175728472+Copilot@users.noreply.github.com>", AiTool::Copilot),
            ("Cursor Agent <cursoragent@cursor.com>", AiTool::Cursor),
            ("aider (gpt-4o) <noreply@aider.chat>", AiTool::Aider),
            ("Cline <cline@example.com>", AiTool::Cline),
            ("Roo Code <roo@example.com>", AiTool::Roo),
            ("Codeium <bot@codeium.com>", AiTool::Windsurf),
            ("devin-ai-integration[bot] <bot@cognition.ai>", AiTool::Devin),
            ("gemini-code-assist[bot]", AiTool::Gemini),
            ("SWE-agent <sweagent@example.com>", AiTool::SweAgent),
        ];
        for (value, tool) in cases {
            assert_eq!(identify_tool(value), Some(tool), "{value}");
        }
    }

    #[test]
    fn commit_can_credit_multiple_tools() {
        let msg = "feat: x\n\nCo-authored-by: Claude <noreply@anthropic.com>\nCo-authored-by: Copilot <copilot@github.com>\nCo-authored-by: Claude <noreply@anthropic.com>";
        assert_eq!(detect_commit_tools(msg), vec![AiTool::Claude, AiTool::Copilot]);
    }

    #[test]
    fn non_attribution_trailers_are_ignored() {
        let msg = "feat: x\n\nReviewed-by: Claude <noreply@anthropic.com>";
        assert!(detect_commit_tools(msg).is_empty());
    }

    #[test]
    fn three_of_four_claude_commits() {
        let trailer = "feat: x\n\nCo-authored-by: Claude <noreply@anthropic.com>";
        let commits = vec![
            commit("a", trailer),
            commit("b", trailer),
            commit("c", trailer),
            commit("d", "fix: manual change"),
        ];
        let m = compute_ai_tool_metrics(&commits, 4, &AiConfidenceBands::default());
        assert!(m.detected);
        assert_eq!(m.ai_assisted_commits, 3);
        assert_eq!(m.ai_collaboration_rate, 0.75);
        assert_eq!(m.tool_diversity, 1);
        assert_eq!(m.primary_tool.as_ref().unwrap().tool_id, "claude");
        assert_eq!(m.tools[0].percentage, 100.0);
        assert_eq!(m.confidence, Confidence::Medium);
    }

    #[test]
    fn caller_denominator_may_exceed_subset() {
        let trailer = "feat: x\n\nGenerated-by: aider";
        let commits = vec![commit("a", trailer), commit("b", trailer)];
        let m = compute_ai_tool_metrics(&commits, 8, &AiConfidenceBands::default());
        assert_eq!(m.ai_collaboration_rate, 0.25);
        assert_eq!(m.confidence, Confidence::Low);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let commits = vec![
            commit("a", "x\n\nCo-authored-by: Cursor <cursoragent@cursor.com>"),
            commit("b", "x\n\nCo-authored-by: Claude <noreply@anthropic.com>"),
            commit("c", "x\n\nCo-authored-by: Claude <noreply@anthropic.com>"),
            commit("d", "x\n\nCo-authored-by: Cursor <cursoragent@cursor.com>"),
            commit("e", "x\n\nCo-authored-by: Aider"),
        ];
        let m = compute_ai_tool_metrics(&commits, 5, &AiConfidenceBands::default());
        let ids: Vec<&str> = m.tools.iter().map(|t| t.tool_id.as_str()).collect();
        assert_eq!(ids, vec!["cursor", "claude", "aider"]);
        assert_eq!(m.tools[0].percentage, 40.0);
        assert_eq!(m.tool_diversity, 3);
    }

    #[test]
    fn no_attribution_yields_empty_metrics() {
        let commits = vec![commit("a", "fix: thing")];
        let m = compute_ai_tool_metrics(&commits, 1, &AiConfidenceBands::default());
        assert!(!m.detected);
        assert!(m.primary_tool.is_none());
        assert_eq!(m.ai_collaboration_rate, 0.0);
    }

    #[test]
    fn zero_denominator_is_safe() {
        let m = compute_ai_tool_metrics(&[], 0, &AiConfidenceBands::default());
        assert_eq!(m, AiToolMetrics::none());
    }
}
