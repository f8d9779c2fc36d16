pub mod coverage;
pub mod engine;
pub mod rules;

pub use coverage::{
    cross_reference_users, run_probe, AxisSweep, CoverageReport, GridIter, LiveUserAxes,
    ProbeGrid, RealUserFallback,
};
pub use engine::{detect_persona, PersonaEngine};
pub use rules::{AxisPredicate, FallbackPersona, PersonaRule, RuleTable, ShadowedRule};
