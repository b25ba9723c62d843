//! AgriSage Engine Library
//!
//! Core of the agricultural advisory assistant: guardrails, the
//! plan-reflect-refine pipeline, conversational memory and the LLM gateway.
//! It is used by both the main binary and integration tests.

/// Advisor service tying the components together
pub mod advisor;

/// CLI interface module
pub mod cli;

/// Configuration management module
pub mod config;

/// Input safety policy checker
pub mod guardrails;

/// Command handlers module
pub mod handlers;

/// LLM provider abstraction layer
pub mod llm;

/// Conversational memory and session registry
pub mod memory;

/// Plan-reflect-refine pipeline
pub mod planning;

/// Telemetry and Observability
pub mod telemetry;
