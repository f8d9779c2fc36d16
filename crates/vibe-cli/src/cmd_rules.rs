use serde::Serialize;
use vibe_persona::{FallbackPersona, PersonaRule, RuleTable, ShadowedRule};

use crate::input;

#[derive(Serialize)]
struct RulesReport<'a> {
    version: &'a str,
    digest: String,
    rules: &'a [PersonaRule],
    fallback: &'a FallbackPersona,
    shadowed: Vec<ShadowedRule>,
}

fn report(table: &RuleTable) -> RulesReport<'_> {
    RulesReport {
        version: &table.version,
        digest: table.digest(),
        rules: &table.rules,
        fallback: &table.fallback,
        shadowed: table.shadowed_rules(),
    }
}

/// `vibe rules [--strict]`
pub fn execute(table: &RuleTable, strict: bool) -> anyhow::Result<()> {
    let report = report(table);
    input::print_json(&report)?;
    if strict && !report.shadowed.is_empty() {
        let ids: Vec<&str> = report.shadowed.iter().map(|s| s.rule.as_str()).collect();
        anyhow::bail!("rule table {} has shadowed rules: {}", table.version, ids.join(", "));
    }
    Ok(())
}
