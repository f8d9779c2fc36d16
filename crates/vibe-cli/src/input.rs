use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use vibe_persona::RuleTable;

/// Read a file, or stdin when the path is `-`.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub fn parse_json<T: DeserializeOwned>(content: &str, origin: &Path) -> anyhow::Result<T> {
    serde_json::from_str(content).with_context(|| format!("parsing {}", origin.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = read_input(path)?;
    parse_json(&content, path)
}

/// The table at `path`, or the built-in one.
pub fn load_rules(path: Option<&Path>) -> anyhow::Result<RuleTable> {
    let Some(path) = path else {
        return Ok(RuleTable::builtin().clone());
    };
    let content = read_input(path)?;
    RuleTable::from_yaml_str(&content)
        .with_context(|| format!("loading rule table {}", path.display()))
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
