//! Session registry
//!
//! Maps each user to one session and each session to one memory manager.
//! The registry is an ordinary value owned by whoever composes the service;
//! there is no process-wide instance.
//!
//! The maps sit behind a `tokio::sync::RwLock` so lookups for distinct users
//! proceed concurrently. Each memory manager has its own mutex; callers are
//! expected to issue one request per session at a time.

use super::manager::{ConversationMemory, MemoryContext};
use super::profile::ExtractedContext;
use crate::config::MemoryConfig;
use crate::llm::CompletionGateway;
use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Memory manager shared between the registry and its callers
pub type SharedMemory = Arc<Mutex<ConversationMemory>>;

/// A user's conversation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryState {
    /// user_id -> session
    sessions: HashMap<String, Session>,
    /// session_id -> memory
    memories: HashMap<String, SharedMemory>,
}

pub struct SessionRegistry {
    gateway: Arc<dyn CompletionGateway>,
    settings: MemoryConfig,
    state: RwLock<RegistryState>,
}

impl SessionRegistry {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: MemoryConfig) -> Self {
        Self {
            gateway,
            settings,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Return the user's session and memory, creating both on first use
    pub async fn get_or_create(&self, user_id: &str) -> (Session, SharedMemory) {
        {
            let state = self.state.read().await;
            if let Some(found) = Self::lookup(&state, user_id) {
                return found;
            }
        }

        let mut state = self.state.write().await;
        // Another task may have created it between the two locks
        if let Some(found) = Self::lookup(&state, user_id) {
            return found;
        }

        let session = Session {
            user_id: user_id.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        };
        let memory: SharedMemory = Arc::new(Mutex::new(ConversationMemory::new(
            self.gateway.clone(),
            self.settings.clone(),
        )));

        state
            .sessions
            .insert(user_id.to_string(), session.clone());
        state
            .memories
            .insert(session.session_id.clone(), memory.clone());

        tracing::info!("Created new session {} for user {}", session.session_id, user_id);
        (session, memory)
    }

    fn lookup(state: &RegistryState, user_id: &str) -> Option<(Session, SharedMemory)> {
        let session = state.sessions.get(user_id)?;
        let memory = state.memories.get(&session.session_id)?;
        Some((session.clone(), memory.clone()))
    }

    /// Drop the user's session and its memory; returns whether one existed
    pub async fn clear(&self, user_id: &str) -> bool {
        let mut state = self.state.write().await;
        match state.sessions.remove(user_id) {
            Some(session) => {
                state.memories.remove(&session.session_id);
                tracing::info!("Cleared session for user {}", user_id);
                true
            }
            None => false,
        }
    }

    async fn memory(&self, session_id: &str) -> Option<SharedMemory> {
        self.state.read().await.memories.get(session_id).cloned()
    }

    /// Record an exchange in the session's memory
    ///
    /// # Errors
    ///
    /// `SessionNotFound` if `session_id` is unknown.
    pub async fn add_conversation(
        &self,
        session_id: &str,
        query: &str,
        response: &str,
        extracted_context: ExtractedContext,
    ) -> Result<(), EngineError> {
        let memory = self.memory(session_id).await.ok_or_else(|| {
            tracing::warn!("No memory manager found for session {}", session_id);
            EngineError::SessionNotFound(session_id.to_string())
        })?;

        memory.lock().await.add(query, response, extracted_context).await;
        tracing::debug!("Added conversation to memory for session {}", session_id);
        Ok(())
    }

    /// Memory snapshot for the session; empty for an unknown session
    pub async fn get_enriched_context(&self, session_id: &str) -> MemoryContext {
        match self.memory(session_id).await {
            Some(memory) => memory.lock().await.get_context(),
            None => MemoryContext::empty(),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Completion;
    use async_trait::async_trait;

    struct SilentGateway;

    #[async_trait]
    impl CompletionGateway for SilentGateway {
        async fn send(&self, _system: &str, _prompt: &str) -> Completion {
            Completion::empty()
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(SilentGateway), MemoryConfig::default())
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = registry();
        let (first, mem_a) = registry.get_or_create("farmer-1").await;
        let (second, mem_b) = registry.get_or_create("farmer-1").await;

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&mem_a, &mem_b));
        assert!(uuid::Uuid::parse_str(&first.session_id).is_ok());
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_clear_then_recreate_gives_new_session() {
        let registry = registry();
        let (first, _) = registry.get_or_create("farmer-1").await;

        assert!(registry.clear("farmer-1").await);
        assert!(!registry.clear("farmer-1").await);

        let (second, _) = registry.get_or_create("farmer-1").await;
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(
            registry.get_enriched_context(&first.session_id).await,
            MemoryContext::empty()
        );
    }

    #[tokio::test]
    async fn test_add_to_unknown_session_fails() {
        let err = registry()
            .add_conversation("missing", "q", "a", ExtractedContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_add_and_read_back() {
        let registry = registry();
        let (session, _) = registry.get_or_create("farmer-2").await;
        registry
            .add_conversation(&session.session_id, "Sugarcane spacing?", "4 feet", ExtractedContext::default())
            .await
            .unwrap();

        let ctx = registry.get_enriched_context(&session.session_id).await;
        assert_eq!(ctx.recent_count, 1);
        assert_eq!(ctx.farmer_profile.crops, vec!["sugarcane"]);
    }
}
