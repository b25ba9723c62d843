//! Shared test doubles for the integration tests

#![allow(dead_code)]

use agrisage_engine::llm::{Completion, CompletionGateway};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Gateway that replays a fixed script of replies in call order
///
/// `None` entries stand for a failed call. Once the script runs out every
/// call fails.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(Into::into)).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (system instruction, prompt) for every call so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn send(&self, system_instruction: &str, prompt: &str) -> Completion {
        self.calls
            .lock()
            .unwrap()
            .push((system_instruction.to_string(), prompt.to_string()));
        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(text) => Completion::text(text),
            None => Completion::empty(),
        }
    }
}

pub fn plan_json(goal: &str) -> String {
    serde_json::json!({
        "goal": goal,
        "problem_analysis": "Low yields from nutrient-poor soil",
        "steps": [
            {
                "step_number": 1,
                "action": "Test soil",
                "description": "Send samples to the district lab",
                "timeline": "Week 1",
                "resources_needed": ["sample bags"],
                "potential_risks": ["late results"]
            },
            {
                "step_number": 2,
                "action": "Apply compost",
                "description": "Spread 2 tonnes per acre before sowing",
                "timeline": "Week 2"
            }
        ],
        "critical_path": ["Test soil"],
        "total_timeline": "4 months",
        "budget_considerations": "About Rs 6000 per acre"
    })
    .to_string()
}

pub fn evaluation_json(score: f64) -> String {
    serde_json::json!({
        "overall_quality_score": score,
        "evaluation_summary": "Reviewed",
        "concerns": ["Irrigation timing is vague"],
        "improvement_suggestions": ["Give dates for each irrigation"],
        "approval_status": if score >= 0.75 { "approved" } else { "needs_revision" }
    })
    .to_string()
}
