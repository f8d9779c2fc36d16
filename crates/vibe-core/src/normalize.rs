//! Host commit records → `CommitEvent`.
//!
//! Two host shapes are accepted: the nested REST shape (`commit.author.date`,
//! `stats`, `files[].filename`, `parents[].sha`) and a flat shape used by
//! exports and hosts without nesting. Missing size data defaults to zero;
//! unparsable timestamps are rejected.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::NormalizeError;
use crate::types::CommitEvent;

/// A commit record as delivered by a code host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCommit {
    Nested(NestedCommit),
    Flat(FlatCommit),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffStats {
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedCommit {
    pub sha: String,
    pub commit: NestedDetail,
    #[serde(default)]
    pub stats: Option<DiffStats>,
    #[serde(default)]
    pub files: Option<Vec<NestedFile>>,
    #[serde(default)]
    pub parents: Vec<NestedParent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<NestedSignature>,
    #[serde(default)]
    pub committer: Option<NestedSignature>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestedSignature {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedFile {
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedParent {
    pub sha: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatCommit {
    #[serde(alias = "id")]
    pub sha: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "authored_date")]
    pub author_date: Option<String>,
    #[serde(default, alias = "committed_date")]
    pub committer_date: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
    #[serde(default, alias = "changed_files")]
    pub files_changed: Option<u64>,
    #[serde(default, alias = "parent_ids")]
    pub parents: Vec<String>,
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub stats: Option<DiffStats>,
}

/// Normalize one host record.
pub fn normalize_commit(raw: &RawCommit) -> Result<CommitEvent, NormalizeError> {
    match raw {
        RawCommit::Nested(c) => from_nested(c),
        RawCommit::Flat(c) => from_flat(c),
    }
}

/// Normalize a batch: duplicate shas are dropped (first wins) and the
/// result is ordered by committer date, then sha.
pub fn normalize_commits(raws: &[RawCommit]) -> Result<Vec<CommitEvent>, NormalizeError> {
    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(raws.len());
    for raw in raws {
        let event = normalize_commit(raw)?;
        if !seen.insert(event.sha.clone()) {
            tracing::debug!(sha = %event.sha, "dropping duplicate commit");
            continue;
        }
        events.push(event);
    }
    events.sort_by(|a, b| {
        a.committer_date
            .cmp(&b.committer_date)
            .then_with(|| a.sha.cmp(&b.sha))
    });
    Ok(events)
}

fn from_nested(c: &NestedCommit) -> Result<CommitEvent, NormalizeError> {
    let author = c.commit.author.clone().unwrap_or_default();
    let committer = c.commit.committer.clone().unwrap_or_default();
    let file_paths: Vec<String> = c
        .files
        .as_ref()
        .map(|files| files.iter().map(|f| f.filename.clone()).collect())
        .unwrap_or_default();
    let stats = c.stats.clone().unwrap_or_default();
    build(Parts {
        sha: &c.sha,
        message: &c.commit.message,
        author_date: author.date.as_deref(),
        committer_date: committer.date.as_deref(),
        author_email: author.email.as_deref(),
        additions: stats.additions,
        deletions: stats.deletions,
        files_changed: None,
        parents: c.parents.iter().map(|p| p.sha.clone()).collect(),
        file_paths,
    })
}

fn from_flat(c: &FlatCommit) -> Result<CommitEvent, NormalizeError> {
    let stats = c.stats.clone().unwrap_or_default();
    build(Parts {
        sha: &c.sha,
        message: &c.message,
        author_date: c.author_date.as_deref(),
        committer_date: c.committer_date.as_deref(),
        author_email: c.author_email.as_deref(),
        additions: c.additions.or(stats.additions),
        deletions: c.deletions.or(stats.deletions),
        files_changed: c.files_changed,
        parents: c.parents.clone(),
        file_paths: c.file_paths.clone(),
    })
}

struct Parts<'a> {
    sha: &'a str,
    message: &'a str,
    author_date: Option<&'a str>,
    committer_date: Option<&'a str>,
    author_email: Option<&'a str>,
    additions: Option<u64>,
    deletions: Option<u64>,
    files_changed: Option<u64>,
    parents: Vec<String>,
    file_paths: Vec<String>,
}

fn build(p: Parts<'_>) -> Result<CommitEvent, NormalizeError> {
    let sha = p.sha.trim();
    if sha.is_empty() {
        return Err(NormalizeError::EmptySha);
    }
    let author_date = p
        .author_date
        .map(|v| parse_timestamp(sha, "author", v))
        .transpose()?;
    let committer_date = p
        .committer_date
        .map(|v| parse_timestamp(sha, "committer", v))
        .transpose()?;
    let (author_date, committer_date) = match (author_date, committer_date) {
        (Some(a), Some(c)) => (a, c),
        (Some(a), None) => (a, a),
        (None, Some(c)) => (c, c),
        (None, None) => {
            return Err(NormalizeError::MissingTimestamp {
                sha: sha.to_string(),
            })
        }
    };
    let file_paths: Vec<String> = p
        .file_paths
        .into_iter()
        .map(|f| f.replace('\\', "/"))
        .filter(|f| !f.is_empty())
        .collect();
    let files_changed = p.files_changed.unwrap_or(file_paths.len() as u64);

    Ok(CommitEvent {
        sha: sha.to_string(),
        message: p.message.to_string(),
        author_date,
        committer_date,
        author_email: p.author_email.unwrap_or("").to_string(),
        additions: p.additions.unwrap_or(0),
        deletions: p.deletions.unwrap_or(0),
        files_changed,
        parents: p.parents,
        file_paths,
    })
}

/// Parse RFC 3339, falling back to git's `2024-01-02 03:04:05 +0100` form.
pub fn parse_timestamp(
    sha: &str,
    field: &'static str,
    value: &str,
) -> Result<OffsetDateTime, NormalizeError> {
    let trimmed = value.trim();
    if let Ok(ts) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(ts);
    }
    let git_format = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
    );
    OffsetDateTime::parse(trimmed, &git_format).map_err(|_| NormalizeError::InvalidTimestamp {
        sha: sha.to_string(),
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawCommit {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn nested_shape_normalizes() {
        let c = raw(json!({
            "sha": "a1b2c3",
            "commit": {
                "message": "feat: add search\n\nCo-authored-by: Claude <noreply@anthropic.com>",
                "author": {"name": "Ada", "email": "ada@example.com", "date": "2024-05-01T09:00:00Z"},
                "committer": {"date": "2024-05-01T09:05:00Z"}
            },
            "stats": {"additions": 40, "deletions": 2, "total": 42},
            "files": [{"filename": "src/search.rs"}, {"filename": "tests/search.rs"}],
            "parents": [{"sha": "p0"}]
        }));
        assert!(matches!(c, RawCommit::Nested(_)));
        let e = normalize_commit(&c).unwrap();
        assert_eq!(e.sha, "a1b2c3");
        assert_eq!(e.author_email, "ada@example.com");
        assert_eq!(e.additions, 40);
        assert_eq!(e.deletions, 2);
        assert_eq!(e.files_changed, 2);
        assert_eq!(e.parents, vec!["p0".to_string()]);
        assert!(e.committer_date > e.author_date);
    }

    #[test]
    fn flat_shape_with_aliases() {
        let c = raw(json!({
            "id": "ff00",
            "message": "fix: typo",
            "authored_date": "2024-05-01T10:00:00+02:00",
            "committed_date": "2024-05-01T10:01:00+02:00",
            "parent_ids": ["aa", "bb"],
            "stats": {"additions": 1, "deletions": 1}
        }));
        let e = normalize_commit(&c).unwrap();
        assert_eq!(e.sha, "ff00");
        assert_eq!(e.additions, 1);
        assert!(e.is_merge());
        assert_eq!(e.committer_date.offset().whole_hours(), 2);
    }

    #[test]
    fn host_without_stats_defaults_to_zero() {
        let c = raw(json!({
            "sha": "s1",
            "message": "chore: bump",
            "committer_date": "2024-05-01T10:00:00Z"
        }));
        let e = normalize_commit(&c).unwrap();
        assert_eq!((e.additions, e.deletions, e.files_changed), (0, 0, 0));
        assert!(e.file_paths.is_empty());
        assert!(e.author_email.is_empty());
    }

    #[test]
    fn files_changed_falls_back_to_path_count() {
        let c = raw(json!({
            "sha": "s2",
            "committer_date": "2024-05-01T10:00:00Z",
            "file_paths": ["a.rs", "b.rs", "c\\d.rs"]
        }));
        let e = normalize_commit(&c).unwrap();
        assert_eq!(e.files_changed, 3);
        assert_eq!(e.file_paths[2], "c/d.rs");
    }

    #[test]
    fn explicit_files_changed_wins_over_paths() {
        let c = raw(json!({
            "sha": "s3",
            "committer_date": "2024-05-01T10:00:00Z",
            "files_changed": 7,
            "file_paths": ["a.rs"]
        }));
        assert_eq!(normalize_commit(&c).unwrap().files_changed, 7);
    }

    #[test]
    fn missing_committer_date_uses_author_date() {
        let c = raw(json!({
            "sha": "s4",
            "author_date": "2024-05-01T10:00:00Z"
        }));
        let e = normalize_commit(&c).unwrap();
        assert_eq!(e.author_date, e.committer_date);
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let c = raw(json!({
            "sha": "bad",
            "committer_date": "yesterday-ish"
        }));
        let err = normalize_commit(&c).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::InvalidTimestamp {
                sha: "bad".to_string(),
                field: "committer",
                value: "yesterday-ish".to_string(),
            }
        );
    }

    #[test]
    fn missing_timestamps_are_rejected() {
        let c = raw(json!({"sha": "none"}));
        assert_eq!(
            normalize_commit(&c).unwrap_err(),
            NormalizeError::MissingTimestamp {
                sha: "none".to_string()
            }
        );
    }

    #[test]
    fn empty_sha_is_rejected() {
        let c = raw(json!({"sha": "  ", "committer_date": "2024-05-01T10:00:00Z"}));
        assert_eq!(normalize_commit(&c).unwrap_err(), NormalizeError::EmptySha);
    }

    #[test]
    fn git_timestamp_format_accepted() {
        let ts = parse_timestamp("x", "author", "2024-05-01 10:00:00 +0130").unwrap();
        assert_eq!(ts.offset().whole_minutes(), 90);
    }

    #[test]
    fn batch_dedupes_and_orders() {
        let raws = vec![
            raw(json!({"sha": "b", "committer_date": "2024-05-02T10:00:00Z"})),
            raw(json!({"sha": "a", "committer_date": "2024-05-01T10:00:00Z"})),
            raw(json!({"sha": "b", "committer_date": "2024-04-01T10:00:00Z"})),
        ];
        let events = normalize_commits(&raws).unwrap();
        let shas: Vec<&str> = events.iter().map(|e| e.sha.as_str()).collect();
        assert_eq!(shas, vec!["a", "b"]);
    }

    #[test]
    fn batch_fails_on_first_malformed_record() {
        let raws = vec![
            raw(json!({"sha": "ok", "committer_date": "2024-05-02T10:00:00Z"})),
            raw(json!({"sha": "bad", "committer_date": "13/45/2024"})),
        ];
        assert!(normalize_commits(&raws).is_err());
    }
}
