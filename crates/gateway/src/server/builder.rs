//! Builder for the LLM server: initializes providers, the model router, and wraps the result
//! with tracing instrumentation.

use std::sync::Arc;

use config::Config;

use crate::{
    error::LlmError,
    provider::{Provider, anthropic::AnthropicProvider, google::GoogleProvider, openai::OpenAIProvider},
    router::Router,
    server::{LlmHandler, LlmServer, LlmServerInner, tracing::LlmServerWithTracing},
};

pub(crate) struct LlmServerBuilder<'a> {
    config: &'a Config,
}

impl<'a> LlmServerBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub async fn build(self) -> crate::Result<LlmHandler> {
        log::debug!(
            "Initializing LLM server with {} providers",
            self.config.llm.providers.len()
        );

        let mut providers = Vec::with_capacity(self.config.llm.providers.len());

        for (name, provider_config) in self.config.llm.providers.clone().into_iter() {
            log::debug!("Initializing provider: {name}");

            let provider_type = provider_config
                .provider_type
                .ok_or_else(|| LlmError::InternalError(Some(format!("provider '{name}' is missing a provider_type"))))?;

            let provider: Box<dyn Provider> = match provider_type {
                config::ProviderType::Openai => Box::new(OpenAIProvider::new(name.clone(), provider_config)?),
                config::ProviderType::Anthropic => Box::new(AnthropicProvider::new(name.clone(), provider_config)?),
                config::ProviderType::Google => Box::new(GoogleProvider::new(name.clone(), provider_config)?),
            };

            providers.push(provider);
        }

        if providers.is_empty() {
            return Err(LlmError::InternalError(Some(
                "Failed to initialize any LLM providers.".to_string(),
            )));
        }

        log::debug!("LLM server initialized with {} active provider(s)", providers.len());

        let router = Arc::new(Router::new(&self.config.llm));
        let model_discovery = super::ModelDiscovery::new();

        let server = LlmServer {
            shared: Arc::new(LlmServerInner {
                providers,
                config: self.config.llm.clone(),
                router,
                model_discovery,
            }),
        };

        Ok(LlmHandler::WithTracing(LlmServerWithTracing::new(server)))
    }
}
