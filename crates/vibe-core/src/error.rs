//! Error types for the engine.
//! One enum per concern. Sparse input is never an error; only input that
//! cannot be interpreted at all is.

use crate::types::AxisKey;

/// Errors raised while turning host commit records into `CommitEvent`s.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("commit record has an empty sha")]
    EmptySha,

    #[error("commit {sha}: no committer or author timestamp present")]
    MissingTimestamp { sha: String },

    #[error("commit {sha}: invalid {field} timestamp {value:?}")]
    InvalidTimestamp {
        sha: String,
        field: &'static str,
        value: String,
    },
}

/// Errors raised while loading or validating `AnalysisConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid config value for {field}: {message}")]
    Validation { field: String, message: String },
}

/// Errors raised by persona rule table validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleTableError {
    #[error("rule table has no rules")]
    Empty,

    #[error("duplicate rule id {0:?}")]
    DuplicateId(String),

    #[error("rule {0:?} has no predicates")]
    NoPredicates(String),

    #[error("rule {rule:?}: range on {axis} has lo {lo} above hi {hi}")]
    InvertedRange {
        rule: String,
        axis: AxisKey,
        lo: u8,
        hi: u8,
    },

    #[error("rule {rule:?}: threshold {value} on {axis} is outside 0..=100")]
    OutOfRange {
        rule: String,
        axis: AxisKey,
        value: u8,
    },

    #[error("fallback persona id {0:?} collides with a rule id")]
    FallbackCollision(String),

    #[error("cannot parse rule table: {0}")]
    Parse(String),
}

/// Errors raised when a coverage probe grid is malformed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("step size {0} is outside 1..=100")]
    InvalidStep(u8),

    #[error("axis {0} has no values to probe")]
    EmptyAxis(AxisKey),

    #[error("axis {axis} value {value} is outside 0..=100")]
    ValueOutOfRange { axis: AxisKey, value: u8 },
}

/// Errors raised by multi-repo aggregation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no repository summaries to aggregate")]
    NoRepositories,
}
