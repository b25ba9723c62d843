//! Refiner
//!
//! Requests a full replacement plan addressing the latest evaluation. Unlike
//! the planner there is no raw fallback: a refinement that does not parse as
//! a plan is rejected and the previous plan stays in place.

use super::prompts::{refinement_prompt, REFINEMENT_INSTRUCTION};
use super::types::{EvaluationArtifact, PlanArtifact, PlanDocument};
use crate::llm::structured::{extract_json, Extracted};
use crate::llm::CompletionGateway;
use sdk::errors::EngineError;
use sdk::types::PipelinePhase;
use std::sync::Arc;

pub struct Refiner {
    gateway: Arc<dyn CompletionGateway>,
}

impl Refiner {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Produce a replacement for `plan`
    ///
    /// # Errors
    ///
    /// `GatewayFailure` when no text comes back, `ParseFailure` when the
    /// text is not a plan document.
    pub async fn refine(
        &self,
        plan: &PlanArtifact,
        evaluation: &EvaluationArtifact,
        problem: &str,
    ) -> Result<PlanDocument, EngineError> {
        let plan_text = plan.to_prompt_text()?;
        let feedback = match evaluation {
            EvaluationArtifact::Structured(eval) => Some(eval),
            EvaluationArtifact::RawFallback { .. } => None,
        };
        let prompt = refinement_prompt(problem, &plan_text, feedback);

        let text = self
            .gateway
            .send(REFINEMENT_INSTRUCTION, &prompt)
            .await
            .into_text()
            .ok_or(EngineError::GatewayFailure {
                phase: PipelinePhase::Refining,
            })?;

        match extract_json::<PlanDocument>(&text) {
            Extracted::Structured(doc) if doc.has_content() => {
                tracing::info!("Refined plan has {} steps", doc.steps.len());
                Ok(doc)
            }
            Extracted::Structured(_) => Err(EngineError::ParseFailure {
                phase: PipelinePhase::Refining,
                reason: "refined plan has no goal or steps".to_string(),
            }),
            Extracted::RawFallback(_) => Err(EngineError::ParseFailure {
                phase: PipelinePhase::Refining,
                reason: "refined plan is not a JSON plan document".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Completion;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingGateway {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionGateway for RecordingGateway {
        async fn send(&self, _system: &str, prompt: &str) -> Completion {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Completion {
                text: self.reply.map(str::to_string),
            }
        }
    }

    fn gateway(reply: Option<&'static str>) -> Arc<RecordingGateway> {
        Arc::new(RecordingGateway {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn raw_eval() -> EvaluationArtifact {
        EvaluationArtifact::RawFallback {
            raw_evaluation: "meh".to_string(),
        }
    }

    fn make_plan() -> PlanArtifact {
        PlanArtifact::RawFallback {
            raw_plan: "Sow in June".to_string(),
        }
    }

    #[tokio::test]
    async fn test_refined_plan_replaces_wholesale() {
        let gw = gateway(Some(r#"{"goal": "Timely kharif sowing", "steps": [{"action": "Wait for 100mm rain"}]}"#));
        let doc = Refiner::new(gw.clone())
            .refine(&make_plan(), &raw_eval(), "Soybean sowing date")
            .await
            .unwrap();

        assert_eq!(doc.goal, "Timely kharif sowing");
        let prompts = gw.prompts.lock().unwrap();
        assert!(prompts[0].contains("Sow in June"));
        assert!(prompts[0].contains("Soybean sowing date"));
    }

    #[tokio::test]
    async fn test_prose_refinement_is_parse_failure() {
        let err = Refiner::new(gateway(Some("I improved it.")))
            .refine(&make_plan(), &raw_eval(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn test_missing_text_is_gateway_failure() {
        let err = Refiner::new(gateway(None))
            .refine(&make_plan(), &raw_eval(), "x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::GatewayFailure {
                phase: PipelinePhase::Refining
            }
        ));
    }
}
