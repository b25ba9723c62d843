//! Error types and handling
//!
//! This module provides the error taxonomy used throughout the AgriSage engine.
//! All errors implement the `AdvisorErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Error Categories
//!
//! - **GatewayFailure**: the completion gateway returned no text
//! - **ParseFailure**: text arrived but did not match the expected schema
//! - **PolicyViolation**: guardrail non-compliance, raised before orchestration
//! - **Internal**: unexpected fault in any phase
//!
//! Messages never carry API keys or raw model output; hints are static
//! strings safe to show to a farmer.
//!
//! # Examples
//!
//! ```
//! use sdk::errors::{AdvisorErrorExt, EngineError};
//! use sdk::types::PipelinePhase;
//!
//! let error = EngineError::GatewayFailure { phase: PipelinePhase::Reflecting };
//! assert!(error.is_recoverable());
//!
//! let fatal = EngineError::PolicyViolation { policies: vec!["off_domain".into()] };
//! assert!(!fatal.is_recoverable());
//! ```

use crate::types::PipelinePhase;
use thiserror::Error;

/// Trait for AgriSage error extensions
pub trait AdvisorErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or model output.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried. Policy violations are not: the same
    /// input will be rejected again.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    // Gateway returned empty or absent text
    #[error("Completion gateway returned no text during {phase}")]
    GatewayFailure { phase: PipelinePhase },

    // Text received but schema mismatch
    #[error("Could not parse {phase} output: {reason}")]
    ParseFailure {
        phase: PipelinePhase,
        reason: String,
    },

    // Guardrail non-compliance
    #[error("Input rejected by policy: {}", .policies.join(", "))]
    PolicyViolation { policies: Vec<String> },

    // Unexpected fault
    #[error("Internal error: {0}")]
    Internal(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Session errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("All LLM providers exhausted")]
    AllProvidersExhausted,

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::GatewayFailure { .. } => {
                "The advisory model did not respond. Please try again shortly"
            }
            Self::ParseFailure { .. } => "The advisory model returned an unexpected format",
            Self::PolicyViolation { .. } => {
                "I can only help with farming and agriculture questions"
            }
            Self::Internal(_) => "Something went wrong while preparing your plan",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::SessionNotFound(_) => "Your session has expired. Please start a new conversation",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::AllProvidersExhausted => "No LLM providers available. Check configuration",
            Self::Serialization(_) => "Failed to encode or decode advisory data",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::PolicyViolation { .. } | Self::Config(_) | Self::AllProvidersExhausted => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
