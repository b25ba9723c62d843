//! Phase and risk types shared across the advisory pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the plan-reflect-refine pipeline
///
/// `Error` is reachable from every other phase. `Delivered` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Initial plan generation
    Planning,

    /// Quality evaluation of the current plan
    Reflecting,

    /// Full-replacement refinement of a sub-threshold plan
    Refining,

    /// Final plan handed back to the caller
    Delivered,

    /// Request aborted
    Error,
}

impl PipelinePhase {
    /// Whether the pipeline may move from `self` to `next`
    pub fn can_transition_to(self, next: PipelinePhase) -> bool {
        use PipelinePhase::*;
        match (self, next) {
            (Delivered, _) | (Error, _) => false,
            (_, Error) => true,
            (Planning, Reflecting) => true,
            (Planning, Delivered) => true,
            (Reflecting, Refining) => true,
            (Reflecting, Delivered) => true,
            (Refining, Reflecting) => true,
            (Refining, Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelinePhase::Planning => write!(f, "planning"),
            PipelinePhase::Reflecting => write!(f, "reflecting"),
            PipelinePhase::Refining => write!(f, "refining"),
            PipelinePhase::Delivered => write!(f, "delivered"),
            PipelinePhase::Error => write!(f, "error"),
        }
    }
}

/// Risk level assigned by the guardrail checker
///
/// Ordered so that `max` expresses escalation.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Raise the level to `other` if it is higher; never lowers it
    pub fn escalate(&mut self, other: RiskLevel) {
        *self = (*self).max(other);
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}
