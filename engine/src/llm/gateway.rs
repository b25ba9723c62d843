//! Completion Gateway
//!
//! The planning and memory components see the model through one narrow seam:
//! send a system instruction plus a prompt, get text back or nothing. Transport
//! errors never cross this boundary; they are logged and folded into an empty
//! completion so each caller decides how to degrade.
//!
//! `ProviderGateway` implements the seam over an ordered list of
//! `LLMProvider`s, trying each in turn until one produces text.

use super::gemini::GeminiProvider;
use super::ollama::OllamaProvider;
use super::{LLMProvider, Message};
use crate::config::LLMConfig;
use async_trait::async_trait;
use sdk::errors::EngineError;
use std::time::Duration;

/// Text returned by a completion call; `None` means the call failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }

    /// The text, if present and not blank
    pub fn into_text(self) -> Option<String> {
        self.text.filter(|t| !t.trim().is_empty())
    }
}

/// Single entry point to the text-completion model
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn send(&self, system_instruction: &str, prompt: &str) -> Completion;
}

/// Gateway with ordered provider failover
pub struct ProviderGateway {
    providers: Vec<Box<dyn LLMProvider>>,
}

impl ProviderGateway {
    /// Create a gateway that tries `providers` in the given order
    pub fn new(providers: Vec<Box<dyn LLMProvider>>) -> Self {
        Self { providers }
    }

    /// Build the provider list from the `[llm]` config section
    ///
    /// The default provider comes first. With `failover` enabled the other
    /// providers follow. Gemini reports unhealthy without an API key and is
    /// skipped at call time.
    pub fn from_config(config: &LLMConfig) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let ollama = OllamaProvider::from_config(&config.ollama, timeout)
            .map_err(|e| EngineError::LLMProvider(e.to_string()))?;
        let gemini = GeminiProvider::from_env(config.gemini.clone(), timeout)
            .map_err(|e| EngineError::LLMProvider(e.to_string()))?;

        let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();
        match config.default_provider.as_str() {
            "gemini" => {
                providers.push(Box::new(gemini));
                if config.failover {
                    providers.push(Box::new(ollama));
                }
            }
            _ => {
                providers.push(Box::new(ollama));
                if config.failover {
                    providers.push(Box::new(gemini));
                }
            }
        }

        tracing::info!(
            "Completion gateway providers: {}",
            providers
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self::new(providers))
    }

    /// Provider names in attempt order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}

#[async_trait]
impl CompletionGateway for ProviderGateway {
    async fn send(&self, system_instruction: &str, prompt: &str) -> Completion {
        if self.providers.is_empty() {
            tracing::error!("No LLM providers configured");
            return Completion::empty();
        }

        let messages = [Message::system(system_instruction), Message::user(prompt)];

        for provider in &self.providers {
            if !provider.check_health().await {
                tracing::debug!("Skipping unhealthy provider: {}", provider.name());
                continue;
            }

            tracing::debug!("Attempting provider: {}", provider.name());

            match provider.generate(&messages).await {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!("Provider {} succeeded", provider.name());
                    return Completion::text(text);
                }
                Ok(_) => {
                    tracing::warn!("Provider {} returned empty text", provider.name());
                }
                Err(e) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                }
            }
        }

        tracing::error!("{}", EngineError::AllProvidersExhausted);
        Completion::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // Mock provider for testing
    struct MockProvider {
        name: String,
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn new(name: &str, reply: Option<&str>, calls: Arc<AtomicUsize>) -> Self {
            Self {
                name: name.to_string(),
                reply: reply.map(str::to_string),
                calls,
            }
        }
    }

    #[async_trait]
    impl LLMProvider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn generate(&self, messages: &[Message]) -> crate::llm::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(messages.len(), 2);
            self.reply
                .clone()
                .ok_or_else(|| LLMError::ProviderUnavailable(self.name.clone()))
        }
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = ProviderGateway::new(vec![
            Box::new(MockProvider::new("a", Some("first"), calls.clone())),
            Box::new(MockProvider::new("b", Some("second"), calls.clone())),
        ]);

        let completion = gateway.send("system", "prompt").await;
        assert_eq!(completion.text.as_deref(), Some("first"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failover_to_next_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = ProviderGateway::new(vec![
            Box::new(MockProvider::new("down", None, calls.clone())),
            Box::new(MockProvider::new("blank", Some("   "), calls.clone())),
            Box::new(MockProvider::new("up", Some("plan"), calls.clone())),
        ]);

        let completion = gateway.send("system", "prompt").await;
        assert_eq!(completion.text.as_deref(), Some("plan"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_all_failures_fold_into_empty_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway =
            ProviderGateway::new(vec![Box::new(MockProvider::new("down", None, calls))]);

        assert_eq!(gateway.send("s", "p").await, Completion::empty());
        assert_eq!(ProviderGateway::new(vec![]).send("s", "p").await, Completion::empty());
    }

    #[test]
    fn test_into_text_drops_blank() {
        assert_eq!(Completion::text("  ").into_text(), None);
        assert_eq!(Completion::text("ok").into_text().as_deref(), Some("ok"));
    }

    #[test]
    fn test_from_config_orders_default_first() {
        let mut config = LLMConfig::default();
        config.failover = false;
        let gateway = ProviderGateway::from_config(&config).unwrap();
        assert_eq!(gateway.provider_names(), vec!["ollama"]);

        config.default_provider = "gemini".to_string();
        config.failover = true;
        let gateway = ProviderGateway::from_config(&config).unwrap();
        assert_eq!(gateway.provider_names(), vec!["gemini", "ollama"]);
    }
}
