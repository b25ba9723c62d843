//! Planner
//!
//! Asks the model for an initial `PlanDocument`. Output that cannot be read
//! as a plan is kept verbatim as a raw fallback; only a missing completion
//! is an error.

use super::prompts::{planning_prompt, PLANNING_INSTRUCTION};
use super::types::{PlanArtifact, PlanDocument, PlanningContext};
use crate::llm::structured::{extract_json, Extracted};
use crate::llm::CompletionGateway;
use sdk::errors::EngineError;
use sdk::types::PipelinePhase;
use std::sync::Arc;

pub struct Planner {
    gateway: Arc<dyn CompletionGateway>,
}

impl Planner {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Generate the initial plan for `problem`
    ///
    /// # Errors
    ///
    /// `GatewayFailure` when the gateway returns no text. There is no retry.
    pub async fn generate_plan(
        &self,
        problem: &str,
        context: &PlanningContext,
    ) -> Result<PlanArtifact, EngineError> {
        let prompt = planning_prompt(problem, context);
        let text = self
            .gateway
            .send(PLANNING_INSTRUCTION, &prompt)
            .await
            .into_text()
            .ok_or(EngineError::GatewayFailure {
                phase: PipelinePhase::Planning,
            })?;

        Ok(parse_plan(text))
    }
}

/// Interpret planning output, falling back to the raw text
pub(crate) fn parse_plan(text: String) -> PlanArtifact {
    match extract_json::<PlanDocument>(&text) {
        Extracted::Structured(doc) if doc.has_content() => {
            tracing::info!("Planner produced plan with {} steps", doc.steps.len());
            PlanArtifact::Structured(doc)
        }
        _ => {
            tracing::warn!("Failed to parse plan output, keeping raw text");
            PlanArtifact::RawFallback { raw_plan: text }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Completion;
    use async_trait::async_trait;

    struct FixedGateway(Option<&'static str>);

    #[async_trait]
    impl CompletionGateway for FixedGateway {
        async fn send(&self, system: &str, prompt: &str) -> Completion {
            assert_eq!(system, PLANNING_INSTRUCTION);
            assert!(prompt.contains("FARMING CHALLENGE TO PLAN"));
            Completion {
                text: self.0.map(str::to_string),
            }
        }
    }

    fn planner(reply: Option<&'static str>) -> Planner {
        Planner::new(Arc::new(FixedGateway(reply)))
    }

    #[tokio::test]
    async fn test_structured_plan() {
        let reply = r#"```json
{"goal": "Control pink bollworm", "steps": [{"step_number": 1, "action": "Install pheromone traps"}]}
```"#;
        let plan = planner(Some(reply))
            .generate_plan("Bollworm in cotton", &PlanningContext::default())
            .await
            .unwrap();

        match plan {
            PlanArtifact::Structured(doc) => {
                assert_eq!(doc.goal, "Control pink bollworm");
                assert_eq!(doc.steps[0].action, "Install pheromone traps");
            }
            other => panic!("expected structured plan, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prose_becomes_raw_fallback() {
        let plan = planner(Some("Spray neem oil weekly."))
            .generate_plan("Aphids", &PlanningContext::default())
            .await
            .unwrap();

        assert_eq!(
            plan,
            PlanArtifact::RawFallback {
                raw_plan: "Spray neem oil weekly.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_contentless_json_becomes_raw_fallback() {
        let plan = planner(Some(r#"{"note": "n/a"}"#))
            .generate_plan("Aphids", &PlanningContext::default())
            .await
            .unwrap();
        assert!(!plan.is_structured());
    }

    #[tokio::test]
    async fn test_missing_text_is_gateway_failure() {
        let err = planner(None)
            .generate_plan("Aphids", &PlanningContext::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::GatewayFailure {
                phase: PipelinePhase::Planning
            }
        ));
    }
}
