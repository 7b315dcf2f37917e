mod builder;
mod handler;
mod model_discovery;
mod service;
mod tracing;

pub(crate) use builder::LlmServerBuilder;
pub(crate) use handler::LlmHandler;
use model_discovery::ModelDiscovery;
pub(crate) use service::LlmService;

use std::sync::Arc;

use config::LlmConfig;
use futures::stream::StreamExt;

use crate::{
    messages::{
        anthropic::CountTokensResponse,
        openai::{ModelsResponse, ObjectType},
        unified::{UnifiedRequest, UnifiedResponse},
    },
    provider::{ChatCompletionStream, Provider},
    request::RequestContext,
    router::Router,
};

#[derive(Clone)]
pub(crate) struct LlmServer {
    shared: Arc<LlmServerInner>,
}

pub(crate) struct LlmServerInner {
    /// Live provider handles that service requests.
    pub(crate) providers: Vec<Box<dyn Provider>>,
    /// Resolved configuration snapshot used for routing.
    pub(crate) config: LlmConfig,
    /// Hot-reloadable model router.
    pub(crate) router: Arc<Router>,
    /// Model discovery and caching across providers.
    model_discovery: ModelDiscovery,
}

impl LlmServer {
    fn provider(&self, name: &str) -> crate::Result<&dyn Provider> {
        self.shared
            .providers
            .iter()
            .find(|provider| provider.name() == name)
            .map(AsRef::as_ref)
            .ok_or_else(|| crate::error::LlmError::ProviderNotFound(name.to_string()))
    }

    /// Process a unified chat completion request (protocol-agnostic).
    pub async fn unified_completions(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<UnifiedResponse> {
        let original_model = request.model.clone();
        let route = self.shared.router.resolve(&original_model).await?;
        let provider = self.provider(&route.provider)?;

        let mut modified_request = request;
        modified_request.model = route.model.clone();

        let mut response = provider.chat_completion(modified_request, context).await?;
        response.model = original_model;

        Ok(response)
    }

    /// Process a unified streaming chat completion request (protocol-agnostic).
    pub async fn unified_completions_stream(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionStream> {
        let original_model = request.model.clone();
        let route = self.shared.router.resolve(&original_model).await?;
        let provider = self.provider(&route.provider)?;

        if !provider.supports_streaming() {
            log::debug!("Provider '{}' does not support streaming", route.provider);
            return Err(crate::error::LlmError::StreamingNotSupported);
        }

        let mut modified_request = request;
        modified_request.model = route.model.clone();

        let stream = provider.chat_completion_stream(modified_request, context).await?;

        let transformed_stream = stream.map(move |chunk_result| {
            chunk_result.map(|mut chunk| {
                chunk.model = original_model.clone().into();
                chunk
            })
        });

        Ok(Box::pin(transformed_stream))
    }

    /// Count tokens a request's messages would consume at the routed provider.
    pub async fn unified_count_tokens(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<CountTokensResponse> {
        let route = self.shared.router.resolve(&request.model).await?;
        let provider = self.provider(&route.provider)?;

        let mut modified_request = request;
        modified_request.model = route.model;

        provider.count_tokens(modified_request, context).await
    }
}

impl LlmService for LlmServer {
    async fn models(&self) -> ModelsResponse {
        let models = self.shared.model_discovery.get_all_models(&self.shared.providers).await;

        ModelsResponse {
            object: ObjectType::List,
            data: models,
        }
    }

    async fn completions(&self, request: UnifiedRequest, context: &RequestContext) -> crate::Result<UnifiedResponse> {
        self.unified_completions(request, context).await
    }

    async fn completions_stream(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionStream> {
        self.unified_completions_stream(request, context).await
    }

    async fn count_tokens(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<CountTokensResponse> {
        self.unified_count_tokens(request, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indoc::indoc;
    use std::sync::Arc;

    struct DummyProvider {
        name: String,
    }

    impl DummyProvider {
        fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    #[async_trait::async_trait]
    impl Provider for DummyProvider {
        async fn chat_completion(
            &self,
            _request: crate::messages::unified::UnifiedRequest,
            _context: &crate::request::RequestContext,
        ) -> crate::Result<crate::messages::unified::UnifiedResponse> {
            Err(crate::error::LlmError::InternalError(None))
        }

        async fn chat_completion_stream(
            &self,
            _request: crate::messages::unified::UnifiedRequest,
            _context: &crate::request::RequestContext,
        ) -> crate::Result<crate::provider::ChatCompletionStream> {
            Err(crate::error::LlmError::StreamingNotSupported)
        }

        async fn list_models(&self) -> anyhow::Result<Vec<crate::messages::openai::Model>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn supports_streaming(&self) -> bool {
            false
        }
    }

    fn build_test_server(toml: &str) -> LlmServer {
        let config: LlmConfig = toml::from_str(toml).expect("valid LLM config");
        let provider_names: Vec<String> = config.providers.keys().cloned().collect();

        let providers: Vec<Box<dyn Provider>> = provider_names
            .iter()
            .map(|name| Box::new(DummyProvider::new(name.clone())) as Box<dyn Provider>)
            .collect();

        let router = Arc::new(Router::new(&config));
        let model_discovery = ModelDiscovery::new();

        LlmServer {
            shared: Arc::new(LlmServerInner {
                providers,
                config,
                router,
                model_discovery,
            }),
        }
    }

    #[tokio::test]
    async fn routes_models_matching_a_configured_pattern() {
        let server = build_test_server(indoc! {r#"
            [providers.openai]
            provider_type = "openai"
            api_key = "test"

            [[routes]]
            pattern = "gpt-4*"
            target = "openai"
        "#});

        let route = server.shared.router.resolve("gpt-4o-mini").await.expect("route resolves");
        assert_eq!(route.provider, "openai");
        assert_eq!(route.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn returns_error_when_model_cannot_be_resolved() {
        let server = build_test_server(indoc! {r#"
            [providers.openai]
            provider_type = "openai"
            api_key = "test"

            [[routes]]
            pattern = "gpt-4*"
            target = "openai"
        "#});

        let error = server.shared.router.resolve("unknown-model").await.expect_err("should fail");
        assert!(matches!(error, crate::error::LlmError::ModelNotFound(_)));
    }
}
