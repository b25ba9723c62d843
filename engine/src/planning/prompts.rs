//! System instructions and prompt builders for each pipeline phase

use super::types::{PlanningContext, QualityEvaluation};

const NOT_SPECIFIED: &str = "Not specified";

pub const PLANNING_INSTRUCTION: &str = "You are an agricultural planning specialist for Indian farms. \
Decompose the farmer's problem into clear, sequential, actionable steps.\n\n\
Work through: problem analysis, task decomposition, resource planning, risk assessment \
(weather, market, operational) and measurable success metrics.\n\n\
Output ONLY a JSON object with this structure:\n\
{\n\
  \"problem_analysis\": \"analysis of the challenge and constraints\",\n\
  \"goal\": \"primary objective\",\n\
  \"steps\": [\n\
    {\n\
      \"step_number\": 1,\n\
      \"action\": \"specific action\",\n\
      \"description\": \"what to do and how\",\n\
      \"timeline\": \"when to do it\",\n\
      \"resources_needed\": [\"materials, tools, inputs\"],\n\
      \"dependencies\": [\"steps that must finish first\"],\n\
      \"success_criteria\": \"how to tell the step worked\",\n\
      \"potential_risks\": [\"risks to watch\"],\n\
      \"alternatives\": [\"fallback options\"]\n\
    }\n\
  ],\n\
  \"critical_path\": [\"steps that cannot slip\"],\n\
  \"total_timeline\": \"overall duration\",\n\
  \"budget_considerations\": \"cost factors\",\n\
  \"success_indicators\": \"overall measures of success\"\n\
}\n\n\
Be specific with quantities, timing and methods. Account for season, local weather \
patterns and market timing. Offer alternatives for farmers with fewer resources.";

pub const EVALUATION_INSTRUCTION: &str = "You are an agricultural quality reviewer. \
Critically evaluate the plan you are given on four equally weighted dimensions:\n\
- technical_accuracy: are methods, dosages, quantities and timing correct?\n\
- safety_assessment: are chemical recommendations safe and legal; are precautions stated?\n\
- practicality: can an average Indian farmer carry this out with accessible resources?\n\
- completeness: does it answer the actual question; are steps, risks or alternatives missing?\n\n\
Scores range from 0.0 to 1.0; 0.75 or above is acceptable for delivery.\n\n\
Output ONLY a JSON object with this structure:\n\
{\n\
  \"overall_quality_score\": 0.0,\n\
  \"evaluation_summary\": \"brief assessment\",\n\
  \"dimension_scores\": {\"technical_accuracy\": 0.0, \"safety_assessment\": 0.0, \"practicality\": 0.0, \"completeness\": 0.0},\n\
  \"strengths\": [],\n\
  \"concerns\": [],\n\
  \"improvement_suggestions\": [],\n\
  \"risk_flags\": [],\n\
  \"approval_status\": \"approved | needs_revision | rejected\",\n\
  \"revision_priority\": \"low | medium | high\",\n\
  \"farmer_readiness\": \"can a farmer apply this safely?\"\n\
}\n\n\
Be fair but thorough. Flag dangerous or misleading advice immediately.";

pub const REFINEMENT_INSTRUCTION: &str = "You are an agricultural plan refinement specialist. \
You receive a plan and a quality review. Produce a complete improved plan that resolves every \
concern and risk flag, applies the improvement suggestions, tightens technical accuracy and \
safety, and adds missing steps or detail.\n\n\
Return the full replacement plan as ONLY a JSON object in the same structure as the original \
plan. Do not return a diff or commentary.";

fn slot(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_SPECIFIED)
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "None reported".to_string();
    }
    items
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the planning pass
pub fn planning_prompt(problem: &str, context: &PlanningContext) -> String {
    let mut prompt = format!(
        "FARMING CHALLENGE TO PLAN:\n{}\n\n\
         AVAILABLE CONTEXT:\n\
         - Location: {}\n\
         - Current Season: {}\n\
         - Crop Type: {}\n\
         - Farm Size: {}\n\
         - Budget Range: {}\n\
         - Experience Level: {}\n\
         - Available Resources: {}\n",
        problem.trim(),
        slot(&context.location),
        slot(&context.season),
        slot(&context.crop_type),
        slot(&context.farm_size),
        slot(&context.budget),
        slot(&context.experience),
        slot(&context.resources),
    );

    if !context.tool_results.is_empty() {
        prompt.push_str("\nDATA FROM TOOLS:\n");
        for (name, value) in &context.tool_results {
            prompt.push_str(&format!("- {}: {}\n", name, value));
        }
    }

    prompt.push_str(
        "\nTASK: Create a step-by-step plan for this challenge with clear timelines and \
         resource requirements. Respond with the JSON plan only.",
    );
    prompt
}

/// Prompt for a reflection pass
pub fn evaluation_prompt(plan_text: &str, problem: &str, context: &PlanningContext) -> String {
    format!(
        "AGRICULTURAL PLAN TO EVALUATE:\n{}\n\n\
         EVALUATION CONTEXT:\n\
         - Original Query: {}\n\
         - Farmer Location: {}\n\
         - Crop/Topic: {}\n\
         - Farmer Experience: {}\n\
         - Season/Timing: {}\n\n\
         TASK: Rate the plan on all four dimensions, list strengths and concerns, and suggest \
         improvements. Respond with the JSON evaluation only.",
        plan_text,
        problem.trim(),
        slot(&context.location),
        slot(&context.crop_type),
        slot(&context.experience),
        slot(&context.season),
    )
}

/// Prompt for a refinement pass
///
/// `evaluation` is `None` when the last review was unstructured; the plan is
/// then refined against a zero score and empty feedback.
pub fn refinement_prompt(
    problem: &str,
    plan_text: &str,
    evaluation: Option<&QualityEvaluation>,
) -> String {
    let (score, concerns, suggestions, risks, verdict) = match evaluation {
        Some(eval) => (
            eval.overall_quality_score,
            bullet_list(&eval.concerns),
            bullet_list(&eval.improvement_suggestions),
            bullet_list(&eval.risk_flags),
            eval.approval_status.to_string(),
        ),
        None => (
            0.0,
            bullet_list(&[]),
            bullet_list(&[]),
            bullet_list(&[]),
            "unknown".to_string(),
        ),
    };

    format!(
        "ORIGINAL PROBLEM:\n{}\n\n\
         CURRENT PLAN TO REFINE:\n{}\n\n\
         QUALITY EVALUATION FEEDBACK:\n\
         - Overall Score: {:.2}\n\
         - Concerns:\n{}\n\
         - Improvement Suggestions:\n{}\n\
         - Risk Flags:\n{}\n\
         - Approval Status: {}\n\n\
         TASK: Write the complete improved plan. Address safety concerns and risk flags first, \
         then technical accuracy, practical detail and missing steps. Respond with the JSON \
         plan only.",
        problem.trim(),
        plan_text,
        score,
        concerns,
        suggestions,
        risks,
        verdict,
    )
}
