//! Conversational memory manager
//!
//! Keeps the last `max_detailed_conversations` exchanges verbatim. When an
//! `add` pushes the history past that window the oldest exchanges are
//! summarized through the completion gateway and the summary is appended to
//! a running summary; nothing is dropped without being summarized. If the
//! gateway gives no text a deterministic keyword-topic summary is used.
//!
//! Summarization runs inside `add`, so a slow model delays that turn.

use super::extract::extract_exchange_context;
use super::profile::{ExtractedContext, FarmerProfile};
use crate::config::MemoryConfig;
use crate::llm::CompletionGateway;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Summary reported before any exchange has been compacted
pub const NO_HISTORY_SUMMARY: &str = "No previous conversation history.";

const SUMMARY_INSTRUCTION: &str = "You summarize agricultural advisory conversations for \
long-term memory. Keep: the farmer's crops, location, farm size and interests; the main \
topics discussed; decisions, plans and recommendations; challenges raised. Drop greetings, \
repetition and fine technical detail. Answer with one concise paragraph of 2-3 sentences.";

/// Keyword -> topic tally used by the fallback summary
const FALLBACK_TOPICS: &[(&[&str], &str)] = &[
    (&["pest"], "pest management"),
    (&["rice", "wheat"], "crop cultivation"),
    (&["weather"], "weather planning"),
    (&["price"], "market analysis"),
];

/// One recorded exchange; never modified after it is appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub extracted_context: ExtractedContext,
}

/// Snapshot of a session's memory for prompt enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContext {
    pub farmer_profile: FarmerProfile,
    pub conversation_summary: String,
    /// `Q: ..\nA: ..` per retained exchange, oldest first
    pub recent_conversations: Vec<String>,
    /// Retained plus summarized exchanges
    pub total_conversations: usize,
    pub recent_count: usize,
    pub has_summary: bool,
    pub memory_status: String,
}

impl MemoryContext {
    /// Context for a session with no memory
    pub fn empty() -> Self {
        Self {
            farmer_profile: FarmerProfile::default(),
            conversation_summary: NO_HISTORY_SUMMARY.to_string(),
            recent_conversations: Vec::new(),
            total_conversations: 0,
            recent_count: 0,
            has_summary: false,
            memory_status: "No active memory".to_string(),
        }
    }
}

/// Truncate to `max` characters, appending "..." when cut
fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Sliding-window memory for one session
pub struct ConversationMemory {
    gateway: Arc<dyn CompletionGateway>,
    settings: MemoryConfig,
    history: Vec<ConversationRecord>,
    summary: String,
    summarized_count: usize,
    profile: FarmerProfile,
}

impl ConversationMemory {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: MemoryConfig) -> Self {
        tracing::debug!(
            "Conversation memory window: {} exchanges",
            settings.max_detailed_conversations
        );
        Self {
            gateway,
            settings,
            history: Vec::new(),
            summary: String::new(),
            summarized_count: 0,
            profile: FarmerProfile::default(),
        }
    }

    /// Record an exchange, compacting the window if it overflows
    pub async fn add(&mut self, query: &str, response: &str, extracted_context: ExtractedContext) {
        self.profile.apply(&extracted_context);
        self.profile
            .apply(&extract_exchange_context(query, response));

        self.history.push(ConversationRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            response: response.to_string(),
            extracted_context,
        });

        let max = self.settings.max_detailed_conversations.max(1);
        if self.history.len() <= max {
            return;
        }

        let overflow = self.history.len() - max;
        tracing::info!(
            "Sliding window triggered: {} exchanges exceed max {}",
            self.history.len(),
            max
        );
        let evicted: Vec<ConversationRecord> = self.history.drain(..overflow).collect();

        let new_summary = self.summarize(&evicted).await;
        if self.summary.is_empty() {
            self.summary = new_summary;
        } else {
            self.summary = format!("{}\n\n{}", self.summary, new_summary);
        }
        self.summarized_count += evicted.len();

        tracing::info!(
            "Summarized {} older exchanges, keeping {} recent ones",
            evicted.len(),
            self.history.len()
        );
    }

    async fn summarize(&self, evicted: &[ConversationRecord]) -> String {
        let mut transcript = String::new();
        for record in evicted {
            transcript.push_str(&format!(
                "Q: {}\nA: {}\n\n",
                record.query,
                preview(&record.response, self.settings.summary_input_chars)
            ));
        }

        let prompt = format!(
            "CONVERSATIONS TO SUMMARIZE:\n\n{}TASK: Summarize these agricultural conversations, \
             keeping the farmer's profile, crops, location, interests and the main topics covered.",
            transcript
        );

        match self
            .gateway
            .send(SUMMARY_INSTRUCTION, &prompt)
            .await
            .into_text()
        {
            Some(text) => text.trim().to_string(),
            None => {
                tracing::warn!("Summarization unavailable, using keyword summary");
                fallback_summary(evicted)
            }
        }
    }

    /// Read-only snapshot for prompt enrichment
    pub fn get_context(&self) -> MemoryContext {
        let recent_conversations = self
            .history
            .iter()
            .map(|r| {
                format!(
                    "Q: {}\nA: {}",
                    r.query,
                    preview(&r.response, self.settings.response_preview_chars)
                )
            })
            .collect();

        MemoryContext {
            farmer_profile: self.profile.clone(),
            conversation_summary: if self.summary.is_empty() {
                NO_HISTORY_SUMMARY.to_string()
            } else {
                self.summary.clone()
            },
            recent_conversations,
            total_conversations: self.history.len() + self.summarized_count,
            recent_count: self.history.len(),
            has_summary: !self.summary.is_empty(),
            memory_status: format!("Tracking {} recent conversations", self.history.len()),
        }
    }

    pub fn history(&self) -> &[ConversationRecord] {
        &self.history
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn profile(&self) -> &FarmerProfile {
        &self.profile
    }
}

/// Deterministic summary of evicted exchanges from a keyword tally
pub fn fallback_summary(evicted: &[ConversationRecord]) -> String {
    let mut topics: Vec<&str> = Vec::new();
    for record in evicted {
        let query = record.query.to_lowercase();
        for (keywords, topic) in FALLBACK_TOPICS {
            if keywords.iter().any(|k| query.contains(k)) && !topics.contains(topic) {
                topics.push(*topic);
            }
        }
    }

    let covered = if topics.is_empty() {
        "various farming topics".to_string()
    } else {
        topics.join(", ")
    };

    format!(
        "Farmer engaged in agricultural discussions covering {} over {} conversations.",
        covered,
        evicted.len()
    )
}
