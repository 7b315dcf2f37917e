//! LLM handler that optionally applies tracing instrumentation.

use crate::{
    messages::{
        anthropic::CountTokensResponse,
        openai::ModelsResponse,
        unified::{UnifiedRequest, UnifiedResponse},
    },
    provider::ChatCompletionStream,
    request::RequestContext,
    server::{LlmServer, LlmService, tracing::LlmServerWithTracing},
};

/// Entry point into the LLM server, optionally wrapped with tracing instrumentation.
#[derive(Clone)]
pub enum LlmHandler {
    /// Server with tracing spans around every call.
    WithTracing(LlmServerWithTracing<LlmServer>),
    /// Server without any middleware wrapping (direct calls).
    Direct(LlmServer),
}

impl LlmHandler {
    /// List all available models from all providers.
    pub(crate) async fn models(&self) -> ModelsResponse {
        match self {
            LlmHandler::WithTracing(server) => server.models().await,
            LlmHandler::Direct(server) => server.models().await,
        }
    }

    /// Process a unified chat completion request (protocol-agnostic).
    pub(crate) async fn completions(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<UnifiedResponse> {
        match self {
            LlmHandler::WithTracing(server) => server.completions(request, context).await,
            LlmHandler::Direct(server) => server.completions(request, context).await,
        }
    }

    /// Process a unified streaming chat completion request (protocol-agnostic).
    pub(crate) async fn completions_stream(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionStream> {
        match self {
            LlmHandler::WithTracing(server) => server.completions_stream(request, context).await,
            LlmHandler::Direct(server) => server.completions_stream(request, context).await,
        }
    }

    /// Forward a count-tokens request to the appropriate provider.
    pub(crate) async fn count_tokens(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<CountTokensResponse> {
        match self {
            LlmHandler::WithTracing(server) => server.count_tokens(request, context).await,
            LlmHandler::Direct(server) => server.count_tokens(request, context).await,
        }
    }
}
