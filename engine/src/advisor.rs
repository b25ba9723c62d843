//! Advisor service
//!
//! Composition root for one advisory request: guardrail check, session
//! lookup, memory-enriched planning context, plan-reflect-refine, and
//! recording of the exchange.

use crate::config::Config;
use crate::guardrails::{GuardrailChecker, GuardrailEvaluation};
use crate::llm::{CompletionGateway, ProviderGateway};
use crate::memory::{ExtractedContext, SessionRegistry};
use crate::planning::{Orchestrator, OutcomeStatus, PlanOutcome, PlanningContext};
use anyhow::Result;
use sdk::errors::{AdvisorErrorExt, EngineError};
use serde::Serialize;
use std::sync::Arc;

/// What the advisor says back to the farmer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisorReply {
    /// The query failed the guardrail check; nothing else ran
    Rejected {
        evaluation: GuardrailEvaluation,
        message: String,
    },
    /// The pipeline ran; `outcome.status` may still be `error`
    Answered {
        session_id: String,
        reply: String,
        outcome: PlanOutcome,
    },
}

impl AdvisorReply {
    /// Text to show the farmer
    pub fn text(&self) -> &str {
        match self {
            AdvisorReply::Rejected { message, .. } => message,
            AdvisorReply::Answered { reply, .. } => reply,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AdvisorReply::Rejected { .. })
    }
}

pub struct Advisor {
    guardrails: GuardrailChecker,
    orchestrator: Orchestrator,
    registry: SessionRegistry,
}

impl Advisor {
    /// Build an advisor backed by the configured providers
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = ProviderGateway::from_config(&config.llm)?;
        Self::new(Arc::new(gateway), config)
    }

    /// Build an advisor over any completion gateway
    pub fn new(gateway: Arc<dyn CompletionGateway>, config: &Config) -> Result<Self> {
        Ok(Self {
            guardrails: GuardrailChecker::new()?,
            orchestrator: Orchestrator::new(gateway.clone(), &config.planning),
            registry: SessionRegistry::new(gateway, config.memory.clone()),
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Answer one farmer query
    ///
    /// Memory is updated only when the outcome carries a plan.
    pub async fn handle_query(
        &self,
        user_id: &str,
        query: &str,
        context: PlanningContext,
    ) -> AdvisorReply {
        let evaluation = self.guardrails.check(query);
        if !evaluation.is_compliant() {
            tracing::warn!(
                "Query from {} blocked: {} ({:?})",
                user_id,
                evaluation.evaluation_summary,
                evaluation.triggered_policies
            );
            let message = rejection_message(&evaluation);
            return AdvisorReply::Rejected {
                evaluation,
                message,
            };
        }

        let (session, _) = self.registry.get_or_create(user_id).await;
        let memory = self.registry.get_enriched_context(&session.session_id).await;

        let mut planning_context = context.clone();
        planning_context.fill_missing(&memory.farmer_profile.to_planning_context());
        tracing::debug!(
            "Planning for session {} with {} remembered exchange(s)",
            session.session_id,
            memory.total_conversations
        );

        let outcome = self
            .orchestrator
            .create_validated_plan(query, &planning_context)
            .await;
        let reply = outcome.render_reply();

        if outcome.has_plan() && outcome.status != OutcomeStatus::Error {
            let extracted = ExtractedContext::from_planning_context(&context);
            if let Err(e) = self
                .registry
                .add_conversation(&session.session_id, query, &reply, extracted)
                .await
            {
                // Session cleared while the plan was being built
                tracing::warn!("Exchange not recorded: {}", e);
            }
        }

        AdvisorReply::Answered {
            session_id: session.session_id,
            reply,
            outcome,
        }
    }
}

fn rejection_message(evaluation: &GuardrailEvaluation) -> String {
    let error = EngineError::PolicyViolation {
        policies: evaluation.triggered_policies.clone(),
    };
    format!(
        "Request blocked: {}.\n{}. Ask me about crops, soil, irrigation, pests, weather or markets.",
        evaluation.evaluation_summary,
        error.user_hint()
    )
}
