use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::config::LevelBands;

/// Persona confidence and AI-metric confidence share one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

// ── Commits ──

/// A single normalized commit. Produced once by `normalize` and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub sha: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub author_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub committer_date: OffsetDateTime,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub files_changed: u64,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

impl CommitEvent {
    /// First line of the message, trimmed.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    /// True when the message has at least one non-empty line after the subject.
    pub fn has_body(&self) -> bool {
        self.message.lines().skip(1).any(|l| !l.trim().is_empty())
    }

    pub fn lines_changed(&self) -> u64 {
        self.additions + self.deletions
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Hosts without diff stats leave every size field at zero.
    pub fn has_size_data(&self) -> bool {
        self.additions > 0 || self.deletions > 0 || self.files_changed > 0
    }
}

// ── Axes ──

/// The six behavioral axes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKey {
    AutomationIntensity,
    GuardrailStrength,
    IterationLoopIntensity,
    PlanningSignal,
    ChangeSurfaceArea,
    ShippingRhythm,
}

impl AxisKey {
    pub const ALL: [AxisKey; 6] = [
        AxisKey::AutomationIntensity,
        AxisKey::GuardrailStrength,
        AxisKey::IterationLoopIntensity,
        AxisKey::PlanningSignal,
        AxisKey::ChangeSurfaceArea,
        AxisKey::ShippingRhythm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisKey::AutomationIntensity => "automation_intensity",
            AxisKey::GuardrailStrength => "guardrail_strength",
            AxisKey::IterationLoopIntensity => "iteration_loop_intensity",
            AxisKey::PlanningSignal => "planning_signal",
            AxisKey::ChangeSurfaceArea => "change_surface_area",
            AxisKey::ShippingRhythm => "shipping_rhythm",
        }
    }

    /// Human-readable label for evidence strings.
    pub fn label(&self) -> &'static str {
        match self {
            AxisKey::AutomationIntensity => "automation intensity",
            AxisKey::GuardrailStrength => "guardrail strength",
            AxisKey::IterationLoopIntensity => "iteration-loop intensity",
            AxisKey::PlanningSignal => "planning signal",
            AxisKey::ChangeSurfaceArea => "change surface area",
            AxisKey::ShippingRhythm => "shipping rhythm",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            AxisKey::AutomationIntensity => 0,
            AxisKey::GuardrailStrength => 1,
            AxisKey::IterationLoopIntensity => 2,
            AxisKey::PlanningSignal => 3,
            AxisKey::ChangeSurfaceArea => 4,
            AxisKey::ShippingRhythm => 5,
        }
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisLevel {
    Low,
    Medium,
    High,
}

impl AxisLevel {
    pub fn from_score(score: u8, bands: &LevelBands) -> Self {
        if score < bands.low_below {
            AxisLevel::Low
        } else if score < bands.medium_below {
            AxisLevel::Medium
        } else {
            AxisLevel::High
        }
    }
}

/// One scored axis plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisScore {
    pub score: u8,
    pub level: AxisLevel,
    pub why: Vec<String>,
}

/// Score used wherever real axis data is unavailable.
pub const NEUTRAL_SCORE: u8 = 50;

impl AxisScore {
    /// Round and clamp a raw score into 0..=100 and derive its level.
    pub fn from_raw(raw: f64, why: Vec<String>, bands: &LevelBands) -> Self {
        let score = clamp_score(raw);
        Self {
            score,
            level: AxisLevel::from_score(score, bands),
            why,
        }
    }

    /// Neutral stand-in for missing or degraded data.
    pub fn placeholder(reason: impl Into<String>) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            level: AxisLevel::Medium,
            why: vec![reason.into()],
        }
    }
}

/// Clamp a raw floating score into the 0..=100 integer range. NaN maps to 0.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// The full six-axis record. Always carries all six axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibeAxes {
    pub automation_intensity: AxisScore,
    pub guardrail_strength: AxisScore,
    pub iteration_loop_intensity: AxisScore,
    pub planning_signal: AxisScore,
    pub change_surface_area: AxisScore,
    pub shipping_rhythm: AxisScore,
}

impl VibeAxes {
    /// Build all six axes from a per-axis constructor, in `AxisKey::ALL` order.
    pub fn from_fn(mut f: impl FnMut(AxisKey) -> AxisScore) -> Self {
        Self {
            automation_intensity: f(AxisKey::AutomationIntensity),
            guardrail_strength: f(AxisKey::GuardrailStrength),
            iteration_loop_intensity: f(AxisKey::IterationLoopIntensity),
            planning_signal: f(AxisKey::PlanningSignal),
            change_surface_area: f(AxisKey::ChangeSurfaceArea),
            shipping_rhythm: f(AxisKey::ShippingRhythm),
        }
    }

    pub fn neutral(reason: &str) -> Self {
        Self::from_fn(|_| AxisScore::placeholder(reason))
    }

    pub fn get(&self, key: AxisKey) -> &AxisScore {
        match key {
            AxisKey::AutomationIntensity => &self.automation_intensity,
            AxisKey::GuardrailStrength => &self.guardrail_strength,
            AxisKey::IterationLoopIntensity => &self.iteration_loop_intensity,
            AxisKey::PlanningSignal => &self.planning_signal,
            AxisKey::ChangeSurfaceArea => &self.change_surface_area,
            AxisKey::ShippingRhythm => &self.shipping_rhythm,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisKey, &AxisScore)> {
        AxisKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    /// Scores only, for rule evaluation.
    pub fn vector(&self) -> AxisVector {
        AxisVector::from_fn(|k| self.get(k).score)
    }
}

/// Bare six-axis score vector. What the rule engine evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisVector {
    pub automation_intensity: u8,
    pub guardrail_strength: u8,
    pub iteration_loop_intensity: u8,
    pub planning_signal: u8,
    pub change_surface_area: u8,
    pub shipping_rhythm: u8,
}

impl AxisVector {
    pub fn from_fn(mut f: impl FnMut(AxisKey) -> u8) -> Self {
        Self {
            automation_intensity: f(AxisKey::AutomationIntensity),
            guardrail_strength: f(AxisKey::GuardrailStrength),
            iteration_loop_intensity: f(AxisKey::IterationLoopIntensity),
            planning_signal: f(AxisKey::PlanningSignal),
            change_surface_area: f(AxisKey::ChangeSurfaceArea),
            shipping_rhythm: f(AxisKey::ShippingRhythm),
        }
    }

    /// Values in `AxisKey::ALL` order.
    pub fn from_array(values: [u8; 6]) -> Self {
        Self::from_fn(|k| values[k.index()])
    }

    pub fn uniform(value: u8) -> Self {
        Self::from_fn(|_| value)
    }

    pub fn to_array(&self) -> [u8; 6] {
        AxisKey::ALL.map(|k| self.get(k))
    }

    pub fn get(&self, key: AxisKey) -> u8 {
        match key {
            AxisKey::AutomationIntensity => self.automation_intensity,
            AxisKey::GuardrailStrength => self.guardrail_strength,
            AxisKey::IterationLoopIntensity => self.iteration_loop_intensity,
            AxisKey::PlanningSignal => self.planning_signal,
            AxisKey::ChangeSurfaceArea => self.change_surface_area,
            AxisKey::ShippingRhythm => self.shipping_rhythm,
        }
    }

    pub fn with(mut self, key: AxisKey, value: u8) -> Self {
        match key {
            AxisKey::AutomationIntensity => self.automation_intensity = value,
            AxisKey::GuardrailStrength => self.guardrail_strength = value,
            AxisKey::IterationLoopIntensity => self.iteration_loop_intensity = value,
            AxisKey::PlanningSignal => self.planning_signal = value,
            AxisKey::ChangeSurfaceArea => self.change_surface_area = value,
            AxisKey::ShippingRhythm => self.shipping_rhythm = value,
        }
        self
    }
}

// ── AI tool metrics ──

/// Per-tool share of AI-assisted commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub tool_id: String,
    pub name: String,
    pub commit_count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiToolMetrics {
    pub detected: bool,
    pub ai_assisted_commits: u64,
    pub ai_collaboration_rate: f64,
    pub tool_diversity: u32,
    pub tools: Vec<ToolUsage>,
    pub primary_tool: Option<ToolUsage>,
    pub confidence: Confidence,
}

impl AiToolMetrics {
    pub fn none() -> Self {
        Self {
            detected: false,
            ai_assisted_commits: 0,
            ai_collaboration_rate: 0.0,
            tool_diversity: 0,
            tools: Vec::new(),
            primary_tool: None,
            confidence: Confidence::Low,
        }
    }
}

// ── Persona ──

/// A single axis change proposed by fallback diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisAdjustment {
    pub axis: AxisKey,
    pub from: u8,
    pub to: u8,
}

/// Attached only to fallback personas: why nothing matched and what would have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDiagnostics {
    pub axes: AxisVector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_rule: Option<String>,
    #[serde(default)]
    pub adjustments: Vec<AxisAdjustment>,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub confidence: Confidence,
    pub score: u8,
    #[serde(default)]
    pub matched_rules: Vec<String>,
    #[serde(default)]
    pub why: Vec<String>,
    #[serde(default)]
    pub caveats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<PersonaDiagnostics>,
}

impl Persona {
    pub fn is_fallback(&self) -> bool {
        self.diagnostics.is_some()
    }
}
