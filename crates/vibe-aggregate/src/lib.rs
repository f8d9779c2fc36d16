pub mod community;
pub mod profile;

pub use community::{
    build_community_stats, AdoptionBand, AxisQuartiles, BucketShare, CommunitySnapshot,
    CommunityStats, CommunityStatsPayload,
};
pub use profile::{
    build_unified_profile, AxisRecord, RepoContribution, RepoInsightSummary, StoredAxis,
    UnifiedProfile,
};
