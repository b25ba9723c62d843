//! Plan-Reflect-Refine Orchestrator
//!
//! Drives one planning request through
//! `Planning -> Reflecting -> (Refining -> Reflecting)* -> Delivered`, with
//! `Error` reachable from any phase. Refinement is gated by the latest quality
//! score and bounded by `max_refinement_iterations`; improvement between
//! passes is never assumed.
//!
//! Degradation rules:
//! - no text during planning aborts the request (`status = error`)
//! - no text during reflection or refinement keeps the best plan so far and
//!   delivers it (`status = partial_success`)
//! - unparseable output never aborts; the planner and reflector substitute raw
//!   fallbacks and a failed refinement parse stops the loop
//!
//! Once planning succeeds a plan is always delivered. Callers branch on
//! `approval_status`, not on the presence of a plan.

use super::planner::Planner;
use super::reflector::Reflector;
use super::refiner::Refiner;
use super::types::{EvaluationArtifact, PlanArtifact, PlanDocument, PlanningContext};
use crate::config::PlanningConfig;
use crate::llm::CompletionGateway;
use sdk::errors::EngineError;
use sdk::types::PipelinePhase;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Overall result status of a planning request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    PartialSuccess,
    Error,
}

/// Delivery verdict for the final plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryApproval {
    /// Final score reached the quality threshold
    Approved,

    /// Delivered below threshold or without a score
    ConditionallyApproved,
}

/// Per-phase status recorded in the process summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    /// Output was unstructured and kept as a raw fallback
    Partial,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub planning_phase: PhaseStatus,
    pub reflection_phase: PhaseStatus,
    pub refinement_phase: String,
    pub final_approval: Option<DeliveryApproval>,
}

impl Default for ProcessSummary {
    fn default() -> Self {
        Self {
            planning_phase: PhaseStatus::Skipped,
            reflection_phase: PhaseStatus::Skipped,
            refinement_phase: "0 iterations".to_string(),
            final_approval: None,
        }
    }
}

/// Phase-transition notice emitted while a request runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressNotice {
    pub phase: PipelinePhase,
    pub message: String,
}

/// Result of `create_validated_plan`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub status: OutcomeStatus,
    pub final_plan: Option<PlanArtifact>,
    pub quality_evaluation: Option<EvaluationArtifact>,
    /// Latest score; `None` when no evaluation completed
    pub quality_score: Option<f64>,
    pub approval_status: Option<DeliveryApproval>,
    pub refinement_iterations: u32,
    /// `Delivered` on success, otherwise the phase that failed
    pub phase: PipelinePhase,
    pub message: String,
    pub caveats: Vec<String>,
    pub process_summary: ProcessSummary,
}

impl PlanOutcome {
    pub fn has_plan(&self) -> bool {
        self.final_plan.is_some()
    }

    /// User-facing text for the outcome
    pub fn render_reply(&self) -> String {
        let mut reply = match &self.final_plan {
            None => return self.message.clone(),
            Some(PlanArtifact::RawFallback { raw_plan }) => raw_plan.trim().to_string(),
            Some(PlanArtifact::Structured(doc)) => render_document(doc),
        };

        if !self.caveats.is_empty() {
            reply.push_str("\n\n");
            for caveat in &self.caveats {
                reply.push_str(&format!("Note: {}\n", caveat));
            }
            reply.truncate(reply.trim_end().len());
        }

        reply
    }
}

fn render_document(doc: &PlanDocument) -> String {
    let mut out = String::new();

    if !doc.goal.is_empty() {
        out.push_str(&format!("Goal: {}\n", doc.goal));
    }
    if !doc.problem_analysis.is_empty() {
        out.push_str(&format!("{}\n", doc.problem_analysis));
    }

    for (idx, step) in doc.steps.iter().enumerate() {
        let number = if step.step_number > 0 {
            step.step_number as usize
        } else {
            idx + 1
        };
        let title = if step.action.is_empty() {
            &step.description
        } else {
            &step.action
        };

        out.push('\n');
        out.push_str(&format!("{}. {}", number, title));
        if !step.timeline.is_empty() {
            out.push_str(&format!(" ({})", step.timeline));
        }
        out.push('\n');
        if !step.action.is_empty() && !step.description.is_empty() {
            out.push_str(&format!("   {}\n", step.description));
        }
        if !step.resources_needed.is_empty() {
            out.push_str(&format!("   Needs: {}\n", step.resources_needed.join(", ")));
        }
        if !step.potential_risks.is_empty() {
            out.push_str(&format!("   Watch for: {}\n", step.potential_risks.join(", ")));
        }
    }

    if !doc.critical_path.is_empty() {
        out.push_str(&format!("\nCritical path: {}\n", doc.critical_path.join(", ")));
    }
    if !doc.total_timeline.is_empty() {
        out.push_str(&format!("Timeline: {}\n", doc.total_timeline));
    }
    if !doc.budget_considerations.is_empty() {
        out.push_str(&format!("Budget: {}\n", doc.budget_considerations));
    }

    out.trim().to_string()
}

/// Mutable state of one pipeline run
struct PipelineRun {
    phase: PipelinePhase,
    progress: Option<mpsc::Sender<ProgressNotice>>,
    degraded: bool,
    caveats: Vec<String>,
    summary: ProcessSummary,
}

impl PipelineRun {
    fn new(progress: Option<mpsc::Sender<ProgressNotice>>) -> Self {
        Self {
            phase: PipelinePhase::Planning,
            progress,
            degraded: false,
            caveats: Vec::new(),
            summary: ProcessSummary::default(),
        }
    }

    fn advance(&mut self, next: PipelinePhase) -> Result<(), EngineError> {
        if !self.phase.can_transition_to(next) {
            return Err(EngineError::Internal(format!(
                "invalid phase transition {} -> {}",
                self.phase, next
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Emit a progress notice without ever waiting on the receiver
    fn notify(&self, message: impl Into<String>) {
        let notice = ProgressNotice {
            phase: self.phase,
            message: message.into(),
        };
        tracing::info!(phase = %notice.phase, "{}", notice.message);

        if let Some(tx) = &self.progress {
            match tx.try_send(notice) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(notice)) => {
                    tracing::debug!(phase = %notice.phase, "Progress channel full, notice dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Record a gateway failure that keeps the request alive
    fn degrade(&mut self, caveat: impl Into<String>) {
        self.degraded = true;
        self.caveats.push(caveat.into());
    }

    fn fail(mut self, message: String) -> PlanOutcome {
        let failed_phase = self.phase;
        tracing::error!(phase = %failed_phase, "{}", message);
        // Error is reachable from every non-terminal phase
        if self.phase.can_transition_to(PipelinePhase::Error) {
            self.phase = PipelinePhase::Error;
        }
        self.notify(message.clone());

        PlanOutcome {
            status: OutcomeStatus::Error,
            final_plan: None,
            quality_evaluation: None,
            quality_score: None,
            approval_status: None,
            refinement_iterations: 0,
            phase: failed_phase,
            message,
            caveats: self.caveats,
            process_summary: self.summary,
        }
    }
}

/// Plan-reflect-refine pipeline bound to one completion gateway
pub struct Orchestrator {
    planner: Planner,
    reflector: Reflector,
    refiner: Refiner,
    quality_threshold: f64,
    max_refinement_iterations: u32,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn CompletionGateway>, config: &PlanningConfig) -> Self {
        Self {
            planner: Planner::new(gateway.clone()),
            reflector: Reflector::new(gateway.clone(), config.quality_threshold),
            refiner: Refiner::new(gateway),
            quality_threshold: config.quality_threshold,
            max_refinement_iterations: config.max_refinement_iterations,
        }
    }

    /// Produce a quality-gated plan for `problem`
    pub async fn create_validated_plan(
        &self,
        problem: &str,
        context: &PlanningContext,
    ) -> PlanOutcome {
        self.create_validated_plan_with_progress(problem, context, None)
            .await
    }

    /// Like `create_validated_plan`, also sending each phase notice to
    /// `progress`. Notices arrive in order; when the channel is full a notice
    /// is dropped rather than waited on.
    pub async fn create_validated_plan_with_progress(
        &self,
        problem: &str,
        context: &PlanningContext,
        progress: Option<mpsc::Sender<ProgressNotice>>,
    ) -> PlanOutcome {
        let mut run = PipelineRun::new(progress);

        match self.run(problem, context, &mut run).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                run.summary.planning_phase = PhaseStatus::Failed;
                run.fail("Planning failed: no response from the advisory model".to_string())
            }
            Err(e) => run.fail(format!("Planning pipeline error: {}", e)),
        }
    }

    /// Runs the phases; `Ok(None)` means planning produced no text
    async fn run(
        &self,
        problem: &str,
        context: &PlanningContext,
        run: &mut PipelineRun,
    ) -> Result<Option<PlanOutcome>, EngineError> {
        // Phase 1: planning
        run.notify("Analyzing problem and generating plan");
        let plan = match self.planner.generate_plan(problem, context).await {
            Ok(plan) => plan,
            Err(EngineError::GatewayFailure { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        run.summary.planning_phase = if plan.is_structured() {
            PhaseStatus::Completed
        } else {
            PhaseStatus::Partial
        };

        // Phase 2: reflection
        run.advance(PipelinePhase::Reflecting)?;
        run.notify("Evaluating plan quality, safety and practicality");

        let reflection = match self.reflector.evaluate(&plan, problem, context).await {
            Ok(reflection) => reflection,
            Err(EngineError::GatewayFailure { .. }) => {
                run.summary.reflection_phase = PhaseStatus::Failed;
                run.degrade("Quality check was unavailable; this plan has not been reviewed");
                run.notify("Quality check failed, proceeding with original plan");
                return self.deliver(run, plan, None, 0).map(Some);
            }
            Err(e) => return Err(e),
        };

        let mut current_plan = plan;
        let mut evaluation = reflection.evaluation;
        let mut score = reflection.score;
        run.summary.reflection_phase = reflection_status(&evaluation);
        run.notify(format!(
            "Quality score: {:.2} (threshold: {:.2})",
            score, self.quality_threshold
        ));

        // Phase 3: refinement
        let mut iterations = 0u32;
        while score < self.quality_threshold && iterations < self.max_refinement_iterations {
            run.advance(PipelinePhase::Refining)?;
            run.notify(format!(
                "Quality below threshold. Refining plan (attempt {}/{})",
                iterations + 1,
                self.max_refinement_iterations
            ));

            let refined = match self.refiner.refine(&current_plan, &evaluation, problem).await {
                Ok(doc) => doc,
                Err(EngineError::GatewayFailure { .. }) => {
                    run.degrade("Plan refinement was unavailable; delivering the last reviewed plan");
                    run.notify("Refinement failed, using previous version");
                    break;
                }
                Err(EngineError::ParseFailure { reason, .. }) => {
                    tracing::warn!("Discarding refinement: {}", reason);
                    run.notify("Refinement failed, using previous version");
                    break;
                }
                Err(e) => return Err(e),
            };

            iterations += 1;
            current_plan = PlanArtifact::Structured(refined);

            run.advance(PipelinePhase::Reflecting)?;
            match self.reflector.evaluate(&current_plan, problem, context).await {
                Ok(reflection) => {
                    evaluation = reflection.evaluation;
                    score = reflection.score;
                    run.summary.reflection_phase = reflection_status(&evaluation);
                    run.notify(format!("Refined quality score: {:.2}", score));
                }
                Err(EngineError::GatewayFailure { .. }) => {
                    run.degrade(
                        "The refined plan could not be re-checked; its quality score is from the previous version",
                    );
                    run.notify("Re-evaluation failed, keeping refined plan");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        run.summary.refinement_phase = format!("{} iterations", iterations);
        self.deliver(run, current_plan, Some((evaluation, score)), iterations)
            .map(Some)
    }

    /// Phase 4: delivery
    fn deliver(
        &self,
        run: &mut PipelineRun,
        plan: PlanArtifact,
        evaluation: Option<(EvaluationArtifact, f64)>,
        iterations: u32,
    ) -> Result<PlanOutcome, EngineError> {
        run.advance(PipelinePhase::Delivered)?;

        let score = evaluation.as_ref().map(|(_, s)| *s);
        let approval = match score {
            Some(s) if s >= self.quality_threshold => DeliveryApproval::Approved,
            _ => DeliveryApproval::ConditionallyApproved,
        };

        if let (DeliveryApproval::ConditionallyApproved, Some(s)) = (approval, score) {
            run.caveats.push(format!(
                "This plan scored {:.2}, below the {:.2} quality threshold. Verify it with a local agronomist before acting",
                s, self.quality_threshold
            ));
        }

        let message = match approval {
            DeliveryApproval::Approved => {
                "Plan approved! High-quality agricultural guidance ready".to_string()
            }
            DeliveryApproval::ConditionallyApproved => match score {
                Some(s) => format!("Plan conditionally approved (score: {:.2})", s),
                None => "Plan conditionally approved (not reviewed)".to_string(),
            },
        };
        run.notify(message.clone());
        run.summary.final_approval = Some(approval);

        let status = if run.degraded {
            OutcomeStatus::PartialSuccess
        } else {
            OutcomeStatus::Success
        };

        Ok(PlanOutcome {
            status,
            final_plan: Some(plan),
            quality_evaluation: evaluation.map(|(e, _)| e),
            quality_score: score,
            approval_status: Some(approval),
            refinement_iterations: iterations,
            phase: PipelinePhase::Delivered,
            message,
            caveats: std::mem::take(&mut run.caveats),
            process_summary: run.summary.clone(),
        })
    }
}

fn reflection_status(evaluation: &EvaluationArtifact) -> PhaseStatus {
    if evaluation.is_structured() {
        PhaseStatus::Completed
    } else {
        PhaseStatus::Partial
    }
}
