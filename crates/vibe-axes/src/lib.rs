pub mod analyze;
pub mod metrics;
pub mod scoring;

pub use analyze::{analyze_repo, analyze_repo_with, RepoAnalysis, SPARSE_COMMIT_THRESHOLD};
pub use metrics::RepoMetrics;
pub use scoring::score_axes;
