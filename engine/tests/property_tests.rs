mod common;

use agrisage_engine::config::{Config, MemoryConfig, PlanningConfig};
use agrisage_engine::memory::{ConversationMemory, ExtractedContext, FarmerProfile, ProfileField};
use agrisage_engine::planning::{Orchestrator, OutcomeStatus, PlanningContext};
use common::{evaluation_json, plan_json, ScriptedGateway};
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// Configuration survives a serialize/parse round trip
proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        default_provider in "ollama|gemini",
        threshold in 0.0..=1.0f64,
        iterations in 0..=10u32,
        window in 1..=50usize,
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level;
        config.llm.default_provider = default_provider;
        config.planning.quality_threshold = threshold;
        config.planning.max_refinement_iterations = iterations;
        config.memory.max_detailed_conversations = window;

        let toml_string = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml_str(&toml_string).unwrap();

        prop_assert_eq!(parsed.core.log_level, config.core.log_level);
        prop_assert_eq!(parsed.llm.default_provider, config.llm.default_provider);
        prop_assert_eq!(parsed.planning.quality_threshold, threshold);
        prop_assert_eq!(parsed.planning.max_refinement_iterations, iterations);
        prop_assert_eq!(parsed.memory.max_detailed_conversations, window);
    }
}

// The detailed window never exceeds its bound and nothing is lost: every
// exchange is either retained or counted as summarized.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn test_window_bound_conservation_and_growing_summary(window in 1..=6usize, exchanges in 0..=20usize) {
        let settings = MemoryConfig {
            max_detailed_conversations: window,
            ..Default::default()
        };
        // Summaries always fail: exercises the fallback path too
        let gateway = Arc::new(ScriptedGateway::new(Vec::<Option<String>>::new()));
        let mut memory = ConversationMemory::new(gateway, settings);

        let summary_lengths = runtime().block_on(async {
            let mut lengths = Vec::with_capacity(exchanges);
            for i in 0..exchanges {
                memory
                    .add(&format!("question {}", i), "answer", ExtractedContext::default())
                    .await;
                lengths.push(memory.summary().len());
            }
            lengths
        });

        // Summaries are only ever appended to
        for pair in summary_lengths.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }

        let context = memory.get_context();
        prop_assert!(memory.history().len() <= window);
        prop_assert_eq!(context.recent_count, exchanges.min(window));
        prop_assert_eq!(context.total_conversations, exchanges);
        prop_assert_eq!(context.has_summary, exchanges > window);
    }
}

// List fields only grow and hold no case-insensitive duplicates; scalar
// fields keep their first value.
proptest! {
    #[test]
    fn test_profile_merge_policies(
        crops in proptest::collection::vec("[a-zA-Z]{1,8}", 0..12),
        locations in proptest::collection::vec("[A-Z][a-z]{2,8}", 1..5),
    ) {
        let mut profile = FarmerProfile::default();
        let mut previous_len = 0;

        for crop in &crops {
            profile.merge(ProfileField::Crops, crop);
            prop_assert!(profile.crops.len() >= previous_len);
            previous_len = profile.crops.len();
        }
        for location in &locations {
            profile.merge(ProfileField::Location, location);
        }

        for crop in &crops {
            prop_assert!(profile.crops.iter().any(|c| c.eq_ignore_ascii_case(crop)));
        }
        for (i, a) in profile.crops.iter().enumerate() {
            for b in &profile.crops[i + 1..] {
                prop_assert!(!a.eq_ignore_ascii_case(b));
            }
        }
        prop_assert_eq!(profile.location.as_deref(), Some(locations[0].as_str()));
    }
}

// The refinement loop never runs past its cap, however low the scores.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn test_refinement_loop_is_bounded(
        cap in 0..=4u32,
        scores in proptest::collection::vec(0.0..=1.0f64, 6),
    ) {
        let mut script = vec![Some(plan_json("Draft")), Some(evaluation_json(scores[0]))];
        for score in &scores[1..] {
            script.push(Some(plan_json("Refined")));
            script.push(Some(evaluation_json(*score)));
        }
        let gateway = Arc::new(ScriptedGateway::new(script));
        let config = PlanningConfig {
            max_refinement_iterations: cap,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(gateway.clone(), &config);

        let outcome = runtime().block_on(
            orchestrator.create_validated_plan("Plan my farm", &PlanningContext::default()),
        );

        prop_assert_eq!(outcome.status, OutcomeStatus::Success);
        prop_assert!(outcome.refinement_iterations <= cap);
        prop_assert_eq!(gateway.call_count(), 2 + 2 * outcome.refinement_iterations as usize);
        if outcome.refinement_iterations < cap {
            prop_assert!(outcome.quality_score.unwrap_or(0.0) >= config.quality_threshold);
        }
    }
}
