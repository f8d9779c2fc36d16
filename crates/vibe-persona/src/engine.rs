//! First-match persona evaluation with margin-based confidence and
//! fallback diagnostics.

use vibe_core::{
    clamp_score, AxisAdjustment, AxisKey, AxisLevel, AxisVector, Confidence, LevelBands, Persona,
    PersonaDiagnostics,
};

use crate::rules::{PersonaRule, RuleTable};

/// Margin (in score points) that counts as "deep inside" a threshold.
const DEEP_MARGIN: i16 = 10;

/// Evaluates axis vectors against one rule table.
#[derive(Debug, Clone, Copy)]
pub struct PersonaEngine<'a> {
    table: &'a RuleTable,
    bands: LevelBands,
}

impl<'a> PersonaEngine<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self {
            table,
            bands: LevelBands::default(),
        }
    }

    pub fn with_bands(mut self, bands: LevelBands) -> Self {
        self.bands = bands;
        self
    }

    pub fn table(&self) -> &'a RuleTable {
        self.table
    }

    /// First rule whose predicates all hold, in table order.
    pub fn first_match(&self, axes: &AxisVector) -> Option<&'a PersonaRule> {
        self.table.rules.iter().find(|r| r.matches(axes))
    }

    /// Exactly one persona for `axes`. Pure: the same vector and table
    /// always produce the same result.
    pub fn evaluate(&self, axes: &AxisVector) -> Persona {
        let matched: Vec<&PersonaRule> =
            self.table.rules.iter().filter(|r| r.matches(axes)).collect();
        let persona = match matched.first() {
            Some(rule) => self.matched_persona(rule, &matched, axes),
            None => self.fallback_persona(axes),
        };
        tracing::debug!(
            persona = %persona.id,
            confidence = persona.confidence.as_str(),
            matched = persona.matched_rules.len(),
            "persona evaluated"
        );
        persona
    }

    fn matched_persona(
        &self,
        rule: &PersonaRule,
        matched: &[&PersonaRule],
        axes: &AxisVector,
    ) -> Persona {
        let margins: Vec<i16> = rule
            .predicates
            .iter()
            .map(|p| p.margin(axes.get(p.axis())))
            .collect();
        let why = rule
            .predicates
            .iter()
            .zip(&margins)
            .map(|(p, m)| {
                format!(
                    "{} is {} (needs {}, margin {m})",
                    p.axis(),
                    axes.get(p.axis()),
                    p.describe()
                )
            })
            .collect();

        let deep = margins.iter().filter(|m| **m >= DEEP_MARGIN).count();
        let confidence = if deep == margins.len() {
            Confidence::High
        } else if deep * 2 >= margins.len() {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        let strength: f64 = margins
            .iter()
            .map(|m| (50.0 + 2.0 * f64::from(*m)).min(100.0))
            .sum::<f64>()
            / margins.len().max(1) as f64;

        Persona {
            id: rule.id.clone(),
            name: rule.name.clone(),
            tagline: rule.tagline.clone(),
            confidence,
            score: clamp_score(strength),
            matched_rules: matched.iter().map(|r| r.id.clone()).collect(),
            why,
            caveats: rule.caveats.clone(),
            diagnostics: None,
        }
    }

    fn fallback_persona(&self, axes: &AxisVector) -> Persona {
        let fallback = &self.table.fallback;
        let diagnostics = self.diagnose(axes);

        let mut why = vec![format!(
            "no rule in table {} matched all of its thresholds",
            self.table.version
        )];
        let mut score = 0.0;
        if let Some(rule) = diagnostics
            .nearest_rule
            .as_deref()
            .and_then(|id| self.table.rule(id))
        {
            let met = rule.predicates.iter().filter(|p| p.is_satisfied(axes)).count();
            score = 100.0 * met as f64 / rule.predicates.len() as f64;
            for p in rule.predicates.iter().filter(|p| !p.is_satisfied(axes)) {
                why.push(format!(
                    "{} is {}; {} needs {}",
                    p.axis(),
                    axes.get(p.axis()),
                    rule.id,
                    p.describe()
                ));
            }
        }

        let all_medium = AxisKey::ALL
            .iter()
            .all(|k| AxisLevel::from_score(axes.get(*k), &self.bands) == AxisLevel::Medium);
        let confidence = if all_medium {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        Persona {
            id: fallback.id.clone(),
            name: fallback.name.clone(),
            tagline: fallback.tagline.clone(),
            confidence,
            score: clamp_score(score),
            matched_rules: Vec::new(),
            why,
            caveats: Vec::new(),
            diagnostics: Some(diagnostics),
        }
    }

    /// Smallest total axis change that would satisfy some rule.
    ///
    /// Every satisfiable rule is measured by the summed distance from `axes`
    /// to its accepted region; the smallest wins, earlier rules on ties.
    pub fn diagnose(&self, axes: &AxisVector) -> PersonaDiagnostics {
        let mut best: Option<(&PersonaRule, u32, Vec<AxisAdjustment>)> = None;
        for rule in &self.table.rules {
            let Some(region) = rule.region() else {
                continue;
            };
            let mut cost = 0u32;
            let mut adjustments = Vec::new();
            for key in AxisKey::ALL {
                let (lo, hi) = region[key.index()];
                let from = axes.get(key);
                let to = from.clamp(lo, hi);
                if to != from {
                    cost += u32::from(from.abs_diff(to));
                    adjustments.push(AxisAdjustment {
                        axis: key,
                        from,
                        to,
                    });
                }
            }
            if best.as_ref().map_or(true, |(_, c, _)| cost < *c) {
                best = Some((rule, cost, adjustments));
            }
        }

        match best {
            Some((rule, _, adjustments)) => PersonaDiagnostics {
                axes: *axes,
                nearest_rule: Some(rule.id.clone()),
                suggestion: suggestion_text(rule, &adjustments),
                adjustments,
            },
            None => PersonaDiagnostics {
                axes: *axes,
                nearest_rule: None,
                adjustments: Vec::new(),
                suggestion: format!(
                    "rule table {} has no satisfiable rules",
                    self.table.version
                ),
            },
        }
    }
}

fn suggestion_text(rule: &PersonaRule, adjustments: &[AxisAdjustment]) -> String {
    let steps: Vec<String> = adjustments
        .iter()
        .map(|a| {
            let verb = if a.to > a.from { "raise" } else { "lower" };
            format!("{verb} {} from {} to {}", a.axis, a.from, a.to)
        })
        .collect();
    format!("{} to match {}", steps.join(" and "), rule.name)
}

/// Evaluate `axes` against `table` with default level bands.
pub fn detect_persona(table: &RuleTable, axes: &AxisVector) -> Persona {
    PersonaEngine::new(table).evaluate(axes)
}
