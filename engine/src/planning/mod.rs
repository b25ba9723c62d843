//! Plan-Reflect-Refine pipeline
//!
//! Produces quality-gated, multi-step advisory plans. The `Planner` drafts a
//! plan, the `Reflector` scores it, the `Refiner` rewrites sub-threshold
//! plans, and the `Orchestrator` sequences them under a bounded loop.

pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod reflector;
pub mod refiner;
pub mod types;

pub use orchestrator::{
    DeliveryApproval, Orchestrator, OutcomeStatus, PhaseStatus, PlanOutcome, ProcessSummary,
    ProgressNotice,
};
pub use planner::Planner;
pub use reflector::{Reflection, Reflector};
pub use refiner::Refiner;
pub use types::{
    EvaluationArtifact, PlanArtifact, PlanDocument, PlanStep, PlanningContext,
    QualityEvaluation, ReviewVerdict,
};
