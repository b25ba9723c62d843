//! AgriSage SDK
//!
//! Shared error taxonomy and small value types used by the engine and by
//! anything embedding it.

/// Error types and handling
pub mod errors;

/// Shared phase and risk types
pub mod types;

// Re-export commonly used types
pub use errors::{AdvisorErrorExt, EngineError};
pub use types::{PipelinePhase, RiskLevel};
