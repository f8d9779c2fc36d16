use std::path::Path;

use anyhow::Context;
use vibe_core::{AnalysisConfig, AxisKey};
use vibe_persona::{run_probe, AxisSweep, LiveUserAxes, ProbeGrid, RuleTable};

use crate::input;

pub struct ProbeParams<'a> {
    pub step: Option<u8>,
    pub sample_limit: Option<usize>,
    pub fixed: &'a [String],
    pub users: Option<&'a Path>,
}

/// `vibe probe`
pub fn execute(
    params: &ProbeParams<'_>,
    config: &AnalysisConfig,
    table: &RuleTable,
) -> anyhow::Result<()> {
    let mut grid = ProbeGrid::uniform(params.step.unwrap_or(config.coverage_step));
    for arg in params.fixed {
        let (axis, value) = parse_fixed(arg)?;
        grid = grid.with_axis(axis, AxisSweep::Fixed { value });
    }

    let sample_limit = params.sample_limit.unwrap_or(config.coverage_sample_limit);
    let mut report = run_probe(table, &grid, sample_limit).context("running coverage probe")?;

    if let Some(path) = params.users {
        let users: Vec<LiveUserAxes> = input::read_json(path)?;
        report = report.with_real_users(table, &users);
    }
    input::print_json(&report)
}

/// `automation_intensity=80`
fn parse_fixed(arg: &str) -> anyhow::Result<(AxisKey, u8)> {
    let Some((name, value)) = arg.split_once('=') else {
        anyhow::bail!("--fix expects AXIS=VALUE, got {arg:?}");
    };
    let name = name.trim();
    let Some(axis) = AxisKey::ALL.iter().copied().find(|k| k.as_str() == name) else {
        let known: Vec<&str> = AxisKey::ALL.iter().map(|k| k.as_str()).collect();
        anyhow::bail!("unknown axis {name:?}; expected one of {}", known.join(", "));
    };
    let value: u8 = value
        .trim()
        .parse()
        .with_context(|| format!("--fix {arg:?}: value must be 0-100"))?;
    if value > 100 {
        anyhow::bail!("--fix {arg:?}: value must be 0-100");
    }
    Ok((axis, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_axis_assignment() {
        let (axis, value) = parse_fixed("guardrail_strength=70").unwrap();
        assert_eq!(axis, AxisKey::GuardrailStrength);
        assert_eq!(value, 70);
    }

    #[test]
    fn rejects_bad_assignments() {
        assert!(parse_fixed("guardrail_strength").is_err());
        assert!(parse_fixed("vibes=10").is_err());
        assert!(parse_fixed("guardrail_strength=101").is_err());
        assert!(parse_fixed("guardrail_strength=-1").is_err());
    }
}
