//! Planning Types
//!
//! Plan documents, quality evaluations and the request context that flow
//! through the plan-reflect-refine pipeline. Model output is loosely shaped,
//! so every document field tolerates absence and mild type drift (a number
//! where a string was expected, a single string where a list was expected).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Lenient field decoders for model-produced JSON
mod lenient {
    use super::*;

    pub(super) fn value_to_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.trim().to_string(),
            Value::Array(items) => items
                .iter()
                .map(value_to_text)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(value_to_text(&Value::deserialize(d)?))
    }

    pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let items = match Value::deserialize(d)? {
            Value::Array(items) => items.iter().map(value_to_text).collect(),
            other => vec![value_to_text(&other)],
        };
        Ok(items.into_iter().filter(|s| !s.is_empty()).collect())
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let raw = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        raw.ok_or_else(|| serde::de::Error::custom("score must be a number"))
    }
}

/// Clamp a model-reported score into [0, 1]; NaN counts as 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// One ordered step of an advisory plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default, deserialize_with = "lenient::number")]
    pub step_number: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub timeline: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub resources_needed: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub success_criteria: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub potential_risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub alternatives: Vec<String>,
}

/// Structured advisory plan
///
/// Replaced wholesale by refinement, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default, deserialize_with = "lenient::text")]
    pub problem_analysis: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub goal: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub critical_path: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub total_timeline: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub budget_considerations: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub success_indicators: String,
}

impl PlanDocument {
    /// Whether the document carries any plan content at all
    ///
    /// An arbitrary JSON object deserializes into an all-default document;
    /// such a document is not treated as a plan.
    pub fn has_content(&self) -> bool {
        !self.steps.is_empty() || !self.goal.is_empty() || !self.problem_analysis.is_empty()
    }
}

/// Plan produced by a planning or refinement pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanArtifact {
    /// Unstructured model output kept verbatim
    RawFallback { raw_plan: String },

    Structured(PlanDocument),
}

impl PlanArtifact {
    pub fn is_structured(&self) -> bool {
        matches!(self, PlanArtifact::Structured(_))
    }

    /// Text handed to the evaluator and refiner
    ///
    /// Raw fallbacks pass through verbatim; structured plans become pretty JSON.
    pub fn to_prompt_text(&self) -> Result<String, serde_json::Error> {
        match self {
            PlanArtifact::RawFallback { raw_plan } => Ok(raw_plan.clone()),
            PlanArtifact::Structured(doc) => serde_json::to_string_pretty(doc),
        }
    }
}

/// Verdict reported by the evaluator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approved,
    NeedsRevision,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewVerdict::Approved => write!(f, "approved"),
            ReviewVerdict::NeedsRevision => write!(f, "needs_revision"),
            ReviewVerdict::Rejected => write!(f, "rejected"),
            ReviewVerdict::Unknown => write!(f, "unknown"),
        }
    }
}

/// How urgently the evaluator wants a revision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPriority {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unspecified,
}

/// Per-dimension sub-scores, each in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    #[serde(default)]
    pub technical_accuracy: f64,
    #[serde(default)]
    pub safety_assessment: f64,
    #[serde(default)]
    pub practicality: f64,
    #[serde(default)]
    pub completeness: f64,
}

/// Structured quality evaluation of one plan
///
/// Created fresh by every reflection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEvaluation {
    #[serde(deserialize_with = "lenient::score")]
    pub overall_quality_score: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub evaluation_summary: String,
    #[serde(default)]
    pub dimension_scores: DimensionScores,
    #[serde(default, deserialize_with = "lenient::list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub concerns: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub improvement_suggestions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub approval_status: ReviewVerdict,
    #[serde(default)]
    pub revision_priority: RevisionPriority,
    #[serde(default, deserialize_with = "lenient::text")]
    pub farmer_readiness: String,
}

impl QualityEvaluation {
    /// Clamp every score into [0, 1]
    pub fn normalized(mut self) -> Self {
        self.overall_quality_score = clamp_score(self.overall_quality_score);
        let dims = &mut self.dimension_scores;
        dims.technical_accuracy = clamp_score(dims.technical_accuracy);
        dims.safety_assessment = clamp_score(dims.safety_assessment);
        dims.practicality = clamp_score(dims.practicality);
        dims.completeness = clamp_score(dims.completeness);
        self
    }
}

/// Evaluation produced by a reflection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationArtifact {
    /// Unstructured model output kept verbatim; scores 0
    RawFallback { raw_evaluation: String },

    Structured(QualityEvaluation),
}

impl EvaluationArtifact {
    /// Overall score used for gating
    pub fn score(&self) -> f64 {
        match self {
            EvaluationArtifact::Structured(eval) => eval.overall_quality_score,
            EvaluationArtifact::RawFallback { .. } => 0.0,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, EvaluationArtifact::Structured(_))
    }
}

/// Known context for a planning request
///
/// Absent slots render as "Not specified" in prompts. `tool_results` holds
/// opaque outputs of data-source tools (weather, market prices) keyed by
/// tool name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub farm_size: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub resources: Option<String>,
    #[serde(default)]
    pub tool_results: BTreeMap<String, Value>,
}

impl PlanningContext {
    /// Fill empty slots from `other`, keeping slots already set
    pub fn fill_missing(&mut self, other: &PlanningContext) {
        fn fill(slot: &mut Option<String>, from: &Option<String>) {
            if slot.as_deref().map_or(true, |s| s.trim().is_empty()) {
                if let Some(value) = from.as_ref().filter(|v| !v.trim().is_empty()) {
                    *slot = Some(value.clone());
                }
            }
        }

        fill(&mut self.location, &other.location);
        fill(&mut self.season, &other.season);
        fill(&mut self.crop_type, &other.crop_type);
        fill(&mut self.farm_size, &other.farm_size);
        fill(&mut self.budget, &other.budget);
        fill(&mut self.experience, &other.experience);
        fill(&mut self.resources, &other.resources);
        for (name, value) in &other.tool_results {
            self.tool_results
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}
