pub mod ai_tools;
pub mod classify;
pub mod episodes;
pub mod trailers;

pub use ai_tools::{compute_ai_tool_metrics, detect_commit_tools, identify_tool, AiTool};
pub use classify::{
    classify_category, classify_commit, classify_size, classify_subsystem, is_conventional,
    CommitCategory, CommitClassification, SizeBucket, Subsystem,
};
pub use episodes::{segment_episodes, timing_stats, DayWindow, Episode, Streak, TimingStats};
pub use trailers::{parse_trailers, Trailer};
