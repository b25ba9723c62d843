//! Conversational memory
//!
//! Per-session sliding-window memory with farmer profile extraction and
//! summarization on eviction, plus the registry mapping users to sessions.

pub mod extract;
pub mod manager;
pub mod profile;
pub mod registry;

pub use extract::extract_exchange_context;
pub use manager::{ConversationMemory, ConversationRecord, MemoryContext, NO_HISTORY_SUMMARY};
pub use profile::{ExtractedContext, FarmerProfile, MergePolicy, ProfileField};
pub use registry::{Session, SessionRegistry, SharedMemory};
