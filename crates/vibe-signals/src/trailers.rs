use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `Name: value` with a token-like name.
static TRAILER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9-]*)\s*:\s*(\S.*?)\s*$").unwrap());

/// Trailer names that credit a co-author or generating tool.
const ATTRIBUTION_KEYS: &[&str] = &["co-authored-by", "generated-by", "ai-assisted-by"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub key: String,
    pub value: String,
}

impl Trailer {
    /// Case-insensitive name comparison.
    pub fn key_is(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }

    pub fn is_attribution(&self) -> bool {
        ATTRIBUTION_KEYS.iter().any(|k| self.key_is(k))
    }
}

/// Parse the trailer block of a commit message.
///
/// Trailers are the final paragraph of the message, separated from what
/// precedes it by at least one blank line, where every line is `Name: value`
/// or an indented continuation of the previous value. A message that is a
/// single paragraph has no trailers, and a final paragraph containing any
/// other line is body text.
pub fn parse_trailers(message: &str) -> Vec<Trailer> {
    let lines: Vec<&str> = message.lines().collect();

    let mut end = lines.len();
    while end > 0 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && !lines[start - 1].trim().is_empty() {
        start -= 1;
    }
    // Final block must follow a blank line that itself follows real content.
    if start == 0 || lines[..start].iter().all(|l| l.trim().is_empty()) {
        return Vec::new();
    }

    let mut trailers: Vec<Trailer> = Vec::new();
    for line in &lines[start..end] {
        let continuation = line.starts_with(' ') || line.starts_with('\t');
        if continuation {
            match trailers.last_mut() {
                Some(prev) => {
                    prev.value.push(' ');
                    prev.value.push_str(line.trim());
                    continue;
                }
                None => return Vec::new(),
            }
        }
        match TRAILER_LINE.captures(line) {
            Some(caps) => trailers.push(Trailer {
                key: caps[1].to_string(),
                value: caps[2].to_string(),
            }),
            None => return Vec::new(),
        }
    }
    trailers
}

/// Values of attribution trailers (`Co-authored-by` and friends), in order.
pub fn attribution_values(message: &str) -> Vec<String> {
    parse_trailers(message)
        .into_iter()
        .filter(Trailer::is_attribution)
        .map(|t| t.value)
        .collect()
}
