//! The persona rule table: an ordered list of declarative predicate sets.
//!
//! Table position is the only precedence mechanism. Tables are plain data and
//! can be versioned, loaded from YAML/JSON, validated and fingerprinted
//! without touching the evaluation code.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use vibe_core::hash::record_digest;
use vibe_core::{AxisKey, AxisVector, RuleTableError};

/// One threshold test on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AxisPredicate {
    AtLeast { axis: AxisKey, value: u8 },
    AtMost { axis: AxisKey, value: u8 },
    /// Inclusive on both ends.
    Between { axis: AxisKey, lo: u8, hi: u8 },
}

impl AxisPredicate {
    pub fn axis(&self) -> AxisKey {
        match self {
            AxisPredicate::AtLeast { axis, .. }
            | AxisPredicate::AtMost { axis, .. }
            | AxisPredicate::Between { axis, .. } => *axis,
        }
    }

    /// Inclusive score interval this predicate accepts.
    pub fn bounds(&self) -> (u8, u8) {
        match *self {
            AxisPredicate::AtLeast { value, .. } => (value, 100),
            AxisPredicate::AtMost { value, .. } => (0, value),
            AxisPredicate::Between { lo, hi, .. } => (lo, hi),
        }
    }

    /// Signed distance from the nearest edge of the accepted interval:
    /// non-negative inside, negative outside.
    pub fn margin(&self, score: u8) -> i16 {
        let s = i16::from(score);
        match *self {
            AxisPredicate::AtLeast { value, .. } => s - i16::from(value),
            AxisPredicate::AtMost { value, .. } => i16::from(value) - s,
            AxisPredicate::Between { lo, hi, .. } => (s - i16::from(lo)).min(i16::from(hi) - s),
        }
    }

    pub fn is_satisfied(&self, axes: &AxisVector) -> bool {
        self.margin(axes.get(self.axis())) >= 0
    }

    /// `automation_intensity >= 70`
    pub fn describe(&self) -> String {
        match *self {
            AxisPredicate::AtLeast { axis, value } => format!("{axis} >= {value}"),
            AxisPredicate::AtMost { axis, value } => format!("{axis} <= {value}"),
            AxisPredicate::Between { axis, lo, hi } => format!("{axis} in {lo}..={hi}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRule {
    /// Kebab-case id, unique within the table.
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub predicates: Vec<AxisPredicate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
}

impl PersonaRule {
    pub fn matches(&self, axes: &AxisVector) -> bool {
        self.predicates.iter().all(|p| p.is_satisfied(axes))
    }

    /// Per-axis accepted interval after intersecting every predicate, in
    /// `AxisKey::ALL` order. `None` when two predicates contradict each other.
    pub fn region(&self) -> Option<[(u8, u8); 6]> {
        let mut region = [(0u8, 100u8); 6];
        for p in &self.predicates {
            let (lo, hi) = p.bounds();
            let slot = &mut region[p.axis().index()];
            slot.0 = slot.0.max(lo);
            slot.1 = slot.1.min(hi);
        }
        region.iter().all(|(lo, hi)| lo <= hi).then_some(region)
    }
}

/// Identity returned when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPersona {
    pub id: String,
    pub name: String,
    pub tagline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub version: String,
    pub rules: Vec<PersonaRule>,
    pub fallback: FallbackPersona,
}

/// A rule that can never fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowedRule {
    pub rule: String,
    /// Earlier rule whose region contains this one; `None` when the rule's
    /// own predicates contradict each other.
    pub by: Option<String>,
}

static BUILTIN: LazyLock<RuleTable> = LazyLock::new(builtin_table);

impl RuleTable {
    /// The compiled-in table.
    pub fn builtin() -> &'static RuleTable {
        &BUILTIN
    }

    /// Parse and validate a table from YAML or JSON.
    ///
    /// Predicates may use the tagged form
    /// (`{op: at_least, axis: planning_signal, value: 65}`) or a short
    /// string form (`"planning_signal >= 65"`, `"planning_signal <= 40"`,
    /// `"planning_signal 35..65"`).
    pub fn from_yaml_str(content: &str) -> Result<Self, RuleTableError> {
        let mut raw: Value =
            serde_yaml::from_str(content).map_err(|e| RuleTableError::Parse(e.to_string()))?;
        normalize_predicates(&mut raw)?;
        let table: RuleTable =
            serde_yaml::from_value(raw).map_err(|e| RuleTableError::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), RuleTableError> {
        if self.rules.is_empty() {
            return Err(RuleTableError::Empty);
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleTableError::DuplicateId(rule.id.clone()));
            }
            if rule.predicates.is_empty() {
                return Err(RuleTableError::NoPredicates(rule.id.clone()));
            }
            for p in &rule.predicates {
                let (lo, hi) = p.bounds();
                for value in [lo, hi] {
                    if value > 100 {
                        return Err(RuleTableError::OutOfRange {
                            rule: rule.id.clone(),
                            axis: p.axis(),
                            value,
                        });
                    }
                }
                if lo > hi {
                    return Err(RuleTableError::InvertedRange {
                        rule: rule.id.clone(),
                        axis: p.axis(),
                        lo,
                        hi,
                    });
                }
            }
        }
        if seen.contains(self.fallback.id.as_str()) {
            return Err(RuleTableError::FallbackCollision(self.fallback.id.clone()));
        }
        let shadowed = self.shadowed_rules();
        if !shadowed.is_empty() {
            tracing::warn!(
                version = %self.version,
                count = shadowed.len(),
                "rule table contains rules that can never fire"
            );
        }
        Ok(())
    }

    pub fn rule(&self, id: &str) -> Option<&PersonaRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Rules unreachable under first-match evaluation, in table order.
    pub fn shadowed_rules(&self) -> Vec<ShadowedRule> {
        let regions: Vec<Option<[(u8, u8); 6]>> = self.rules.iter().map(|r| r.region()).collect();
        let mut out = Vec::new();
        for (j, rule) in self.rules.iter().enumerate() {
            let Some(inner) = regions[j] else {
                out.push(ShadowedRule {
                    rule: rule.id.clone(),
                    by: None,
                });
                continue;
            };
            let container = (0..j).find(|&i| {
                regions[i].is_some_and(|outer| {
                    outer
                        .iter()
                        .zip(inner.iter())
                        .all(|(o, n)| o.0 <= n.0 && n.1 <= o.1)
                })
            });
            if let Some(i) = container {
                out.push(ShadowedRule {
                    rule: rule.id.clone(),
                    by: Some(self.rules[i].id.clone()),
                });
            }
        }
        out
    }

    /// SHA-256 over the canonical JSON form. Stable across key order and
    /// formatting of the source file.
    pub fn digest(&self) -> String {
        record_digest(self).expect("rule table serialization should not fail")
    }
}

/// Rewrite short-form string predicates into tagged mappings.
fn normalize_predicates(raw: &mut Value) -> Result<(), RuleTableError> {
    let Some(Value::Sequence(rules)) = raw.get_mut("rules") else {
        return Ok(());
    };
    for rule in rules.iter_mut() {
        let Some(Value::Sequence(predicates)) = rule.get_mut("predicates") else {
            continue;
        };
        for predicate in predicates.iter_mut() {
            if let Value::String(short) = predicate {
                *predicate = parse_short_predicate(short)?;
            }
        }
    }
    Ok(())
}

fn parse_short_predicate(text: &str) -> Result<Value, RuleTableError> {
    let bad = || RuleTableError::Parse(format!("unrecognized predicate {text:?}"));
    let parts: Vec<&str> = text.split_whitespace().collect();
    let axis = parts.first().copied().ok_or_else(bad)?;
    if !AxisKey::ALL.iter().any(|k| k.as_str() == axis) {
        return Err(RuleTableError::Parse(format!("unknown axis {axis:?}")));
    }
    let number = |s: &str| s.parse::<u64>().map_err(|_| bad());

    let mut out = Mapping::new();
    out.insert("axis".into(), axis.into());
    match parts.as_slice() {
        [_, ">=", v] => {
            out.insert("op".into(), "at_least".into());
            out.insert("value".into(), number(*v)?.into());
        }
        [_, "<=", v] => {
            out.insert("op".into(), "at_most".into());
            out.insert("value".into(), number(*v)?.into());
        }
        [_, range] => {
            let (lo, hi) = range
                .split_once("..=")
                .or_else(|| range.split_once(".."))
                .ok_or_else(bad)?;
            out.insert("op".into(), "between".into());
            out.insert("lo".into(), number(lo)?.into());
            out.insert("hi".into(), number(hi)?.into());
        }
        _ => return Err(bad()),
    }
    Ok(Value::Mapping(out))
}

fn rule(
    id: &str,
    name: &str,
    tagline: &str,
    predicates: Vec<AxisPredicate>,
    caveats: &[&str],
) -> PersonaRule {
    PersonaRule {
        id: id.to_string(),
        name: name.to_string(),
        tagline: tagline.to_string(),
        predicates,
        caveats: caveats.iter().map(|c| c.to_string()).collect(),
    }
}

fn builtin_table() -> RuleTable {
    use AxisKey::*;
    use AxisPredicate::{AtLeast, AtMost, Between};

    RuleTable {
        version: "2024.1".to_string(),
        rules: vec![
            rule(
                "prompt-sprinter",
                "Prompt Sprinter",
                "Ships fast with AI at the wheel and few brakes.",
                vec![
                    AtLeast { axis: AutomationIntensity, value: 70 },
                    AtLeast { axis: IterationLoopIntensity, value: 60 },
                    AtMost { axis: GuardrailStrength, value: 40 },
                ],
                &["High automation with thin guardrails; fix commits tend to follow quickly."],
            ),
            rule(
                "guarded-pilot",
                "Guarded Pilot",
                "Leans on AI but keeps tests and CI in the loop.",
                vec![
                    AtLeast { axis: AutomationIntensity, value: 60 },
                    AtLeast { axis: GuardrailStrength, value: 60 },
                ],
                &[],
            ),
            rule(
                "spec-driven-orchestrator",
                "Spec-Driven Orchestrator",
                "Plans first, then delegates execution to agents.",
                vec![
                    AtLeast { axis: AutomationIntensity, value: 50 },
                    AtLeast { axis: PlanningSignal, value: 65 },
                ],
                &[],
            ),
            rule(
                "fix-loop-firefighter",
                "Fix-Loop Firefighter",
                "Iterates hard on fixes with little safety net.",
                vec![
                    AtLeast { axis: IterationLoopIntensity, value: 70 },
                    AtMost { axis: GuardrailStrength, value: 35 },
                ],
                &["Frequent fix-after-feature sequences suggest changes land before they are verified."],
            ),
            rule(
                "architect",
                "Architect",
                "Broad, well-described changes that reshape the system.",
                vec![
                    AtLeast { axis: PlanningSignal, value: 70 },
                    AtLeast { axis: ChangeSurfaceArea, value: 55 },
                ],
                &[],
            ),
            rule(
                "test-first-craftsperson",
                "Test-First Craftsperson",
                "Guards every change and rarely needs a second pass.",
                vec![
                    AtLeast { axis: GuardrailStrength, value: 70 },
                    AtMost { axis: IterationLoopIntensity, value: 40 },
                ],
                &[],
            ),
            rule(
                "steady-shipper",
                "Steady Shipper",
                "Small changes, shipped on a steady cadence.",
                vec![
                    AtLeast { axis: ShippingRhythm, value: 65 },
                    AtMost { axis: ChangeSurfaceArea, value: 40 },
                ],
                &[],
            ),
            rule(
                "burst-builder",
                "Burst Builder",
                "Long quiet spells, then large pushes.",
                vec![
                    AtMost { axis: ShippingRhythm, value: 30 },
                    AtLeast { axis: ChangeSurfaceArea, value: 60 },
                ],
                &[],
            ),
            rule(
                "hand-crafted-builder",
                "Hand-Crafted Builder",
                "Writes it by hand with a measured amount of planning.",
                vec![
                    AtMost { axis: AutomationIntensity, value: 20 },
                    Between { axis: PlanningSignal, lo: 35, hi: 65 },
                ],
                &[],
            ),
        ],
        fallback: FallbackPersona {
            id: "balanced-explorer".to_string(),
            name: "Balanced Explorer".to_string(),
            tagline: "No single habit dominates; the style is still taking shape.".to_string(),
        },
    }
}
