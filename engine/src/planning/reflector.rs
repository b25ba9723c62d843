//! Reflector
//!
//! Scores a plan through the model. Each pass produces a fresh evaluation;
//! nothing carries over from earlier passes.

use super::prompts::{evaluation_prompt, EVALUATION_INSTRUCTION};
use super::types::{EvaluationArtifact, PlanArtifact, PlanningContext, QualityEvaluation};
use crate::llm::structured::{extract_json, Extracted};
use crate::llm::CompletionGateway;
use sdk::errors::EngineError;
use sdk::types::PipelinePhase;
use std::sync::Arc;

/// Outcome of one reflection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub evaluation: EvaluationArtifact,
    pub score: f64,
    pub meets_threshold: bool,
}

pub struct Reflector {
    gateway: Arc<dyn CompletionGateway>,
    quality_threshold: f64,
}

impl Reflector {
    pub fn new(gateway: Arc<dyn CompletionGateway>, quality_threshold: f64) -> Self {
        Self {
            gateway,
            quality_threshold,
        }
    }

    /// Evaluate `plan` against the original `problem`
    ///
    /// Unstructured output scores 0 and never meets the threshold.
    ///
    /// # Errors
    ///
    /// `GatewayFailure` when the gateway returns no text; `Serialization` if
    /// the plan cannot be rendered.
    pub async fn evaluate(
        &self,
        plan: &PlanArtifact,
        problem: &str,
        context: &PlanningContext,
    ) -> Result<Reflection, EngineError> {
        let plan_text = plan.to_prompt_text()?;
        let prompt = evaluation_prompt(&plan_text, problem, context);

        let text = self
            .gateway
            .send(EVALUATION_INSTRUCTION, &prompt)
            .await
            .into_text()
            .ok_or(EngineError::GatewayFailure {
                phase: PipelinePhase::Reflecting,
            })?;

        let evaluation = match extract_json::<QualityEvaluation>(&text) {
            Extracted::Structured(eval) => EvaluationArtifact::Structured(eval.normalized()),
            Extracted::RawFallback(raw) => {
                tracing::warn!("Failed to parse evaluation output, scoring it 0");
                EvaluationArtifact::RawFallback {
                    raw_evaluation: raw,
                }
            }
        };

        let score = evaluation.score();
        let meets_threshold = evaluation.is_structured() && score >= self.quality_threshold;
        tracing::info!(
            score,
            threshold = self.quality_threshold,
            meets_threshold,
            "Plan evaluated"
        );

        Ok(Reflection {
            evaluation,
            score,
            meets_threshold,
        })
    }
}
