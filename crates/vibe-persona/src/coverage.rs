//! Exhaustive probe of a rule table over a discretized axis grid.
//!
//! The grid is never materialized: `GridIter` decodes each combination from
//! its index, so a probe can be split or resumed at any position.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vibe_core::stats::round_to;
use vibe_core::{AxisKey, AxisVector, PersonaDiagnostics, ProbeError};

use crate::engine::PersonaEngine;
use crate::rules::RuleTable;

/// How one axis is discretized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxisSweep {
    /// `0, step, 2*step, ...` and always 100.
    Sweep { step: u8 },
    /// Explicit values; sorted and deduplicated before probing.
    Values { values: Vec<u8> },
    Fixed { value: u8 },
}

impl AxisSweep {
    fn resolve(&self, axis: AxisKey) -> Result<Vec<u8>, ProbeError> {
        match self {
            AxisSweep::Sweep { step } => {
                if *step == 0 || *step > 100 {
                    return Err(ProbeError::InvalidStep(*step));
                }
                let mut values: Vec<u8> = (0..=100u8).step_by(usize::from(*step)).collect();
                if values.last() != Some(&100) {
                    values.push(100);
                }
                Ok(values)
            }
            AxisSweep::Values { values } => {
                if values.is_empty() {
                    return Err(ProbeError::EmptyAxis(axis));
                }
                if let Some(&value) = values.iter().find(|v| **v > 100) {
                    return Err(ProbeError::ValueOutOfRange { axis, value });
                }
                let mut values = values.clone();
                values.sort_unstable();
                values.dedup();
                Ok(values)
            }
            AxisSweep::Fixed { value } => {
                if *value > 100 {
                    return Err(ProbeError::ValueOutOfRange {
                        axis,
                        value: *value,
                    });
                }
                Ok(vec![*value])
            }
        }
    }
}

/// A uniform step for every axis plus optional per-axis overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeGrid {
    pub step: u8,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<AxisKey, AxisSweep>,
}

impl ProbeGrid {
    pub fn uniform(step: u8) -> Self {
        Self {
            step,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_axis(mut self, axis: AxisKey, sweep: AxisSweep) -> Self {
        self.overrides.insert(axis, sweep);
        self
    }

    pub fn iter(&self) -> Result<GridIter, ProbeError> {
        let default = AxisSweep::Sweep { step: self.step };
        let mut axes: [Vec<u8>; 6] = Default::default();
        for key in AxisKey::ALL {
            let sweep = self.overrides.get(&key).unwrap_or(&default);
            axes[key.index()] = sweep.resolve(key)?;
        }
        let total: u64 = axes.iter().map(|v| v.len() as u64).product();
        Ok(GridIter {
            axes,
            next: 0,
            total,
        })
    }
}

/// Lazy iterator over every vector in a grid. The last axis varies fastest.
#[derive(Debug, Clone)]
pub struct GridIter {
    axes: [Vec<u8>; 6],
    next: u64,
    total: u64,
}

impl GridIter {
    /// Skip to combination `index`. Indexes past the end yield nothing.
    pub fn starting_at(mut self, index: u64) -> Self {
        self.next = index.min(self.total);
        self
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Index of the next combination to be yielded.
    pub fn position(&self) -> u64 {
        self.next
    }

    fn decode(&self, mut index: u64) -> AxisVector {
        let mut values = [0u8; 6];
        for i in (0..6).rev() {
            let radix = self.axes[i].len() as u64;
            values[i] = self.axes[i][(index % radix) as usize];
            index /= radix;
        }
        AxisVector::from_array(values)
    }
}

impl Iterator for GridIter {
    type Item = AxisVector;

    fn next(&mut self) -> Option<AxisVector> {
        if self.next >= self.total {
            return None;
        }
        let vector = self.decode(self.next);
        self.next += 1;
        Some(vector)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

impl ExactSizeIterator for GridIter {}

/// Stored axes for one live user, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveUserAxes {
    pub user_id: String,
    pub axes: AxisVector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealUserFallback {
    pub user_id: String,
    pub diagnostics: PersonaDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub rule_table_version: String,
    pub rule_table_digest: String,
    pub grid: ProbeGrid,
    pub total_combinations: u64,
    pub fallback_count: u64,
    /// Percent of combinations, two decimals.
    pub fallback_percentage: f64,
    /// Hits per rule id; every rule in the table appears, zero or not.
    pub persona_counts: BTreeMap<String, u64>,
    /// Rules no grid vector reached.
    pub unreached_rules: Vec<String>,
    pub sample_fallbacks: Vec<AxisVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_user_fallbacks: Option<Vec<RealUserFallback>>,
}

impl CoverageReport {
    pub fn with_real_users(mut self, table: &RuleTable, users: &[LiveUserAxes]) -> Self {
        self.real_user_fallbacks = Some(cross_reference_users(table, users));
        self
    }
}

/// Run every vector in `grid` through `table`. Each combination is visited
/// exactly once; at most `sample_limit` fallback vectors are kept, in grid
/// order.
pub fn run_probe(
    table: &RuleTable,
    grid: &ProbeGrid,
    sample_limit: usize,
) -> Result<CoverageReport, ProbeError> {
    let iter = grid.iter()?;
    let total = iter.total();
    let engine = PersonaEngine::new(table);

    let mut persona_counts: BTreeMap<String, u64> =
        table.rules.iter().map(|r| (r.id.clone(), 0)).collect();
    let mut fallback_count = 0u64;
    let mut sample_fallbacks = Vec::new();

    for vector in iter {
        match engine.first_match(&vector) {
            Some(rule) => {
                if let Some(n) = persona_counts.get_mut(&rule.id) {
                    *n += 1;
                }
            }
            None => {
                fallback_count += 1;
                if sample_fallbacks.len() < sample_limit {
                    sample_fallbacks.push(vector);
                }
            }
        }
    }

    let unreached_rules: Vec<String> = table
        .rules
        .iter()
        .filter(|r| persona_counts.get(&r.id).copied().unwrap_or(0) == 0)
        .map(|r| r.id.clone())
        .collect();

    let fallback_percentage = if total == 0 {
        0.0
    } else {
        round_to(fallback_count as f64 * 100.0 / total as f64, 2)
    };

    tracing::debug!(
        total,
        fallback_count,
        unreached = unreached_rules.len(),
        "coverage probe finished"
    );

    Ok(CoverageReport {
        rule_table_version: table.version.clone(),
        rule_table_digest: table.digest(),
        grid: grid.clone(),
        total_combinations: total,
        fallback_count,
        fallback_percentage,
        persona_counts,
        unreached_rules,
        sample_fallbacks,
        real_user_fallbacks: None,
    })
}

/// Diagnostics for each live user whose stored axes hit the fallback.
pub fn cross_reference_users(table: &RuleTable, users: &[LiveUserAxes]) -> Vec<RealUserFallback> {
    let engine = PersonaEngine::new(table);
    users
        .iter()
        .filter(|u| engine.first_match(&u.axes).is_none())
        .map(|u| RealUserFallback {
            user_id: u.user_id.clone(),
            diagnostics: engine.diagnose(&u.axes),
        })
        .collect()
}
