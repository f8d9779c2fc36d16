pub mod canon;
pub mod config;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod stats;
pub mod types;

pub use config::{AiConfidenceBands, AnalysisConfig, LevelBands};
pub use error::{AggregateError, ConfigError, NormalizeError, ProbeError, RuleTableError};
pub use types::*;
