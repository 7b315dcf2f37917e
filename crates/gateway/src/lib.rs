use std::{convert::Infallible, sync::Arc};

use axum::{
    Router,
    extract::{Extension, Json, State},
    http::HeaderMap,
    response::{IntoResponse, Sse, sse::Event},
    routing::{get, post},
};
use axum_serde::Sonic;
use futures::StreamExt;
use messages::{anthropic, openai};

mod error;
mod firewall;
mod messages;
pub mod provider;
mod request;
mod router;
mod server;
mod tool_continuation;

pub use error::{AnthropicResult, LlmError, LlmResult as Result};
use firewall::FirewallEngine;
use server::{LlmHandler, LlmServerBuilder};

use crate::messages::unified;

/// Shared handle passed to every HTTP handler: the LLM server plus the Prompt Firewall that
/// wraps every request/response traversal.
struct GatewayState {
    server: LlmHandler,
    firewall: FirewallEngine,
    warn_on_duplicate_tool_calls: bool,
}

/// The built gateway: an axum router plus the state it closes over. Exposed as its own type
/// (rather than a bare `Router`) so `crates/server` can attach its own middleware stack before
/// mounting it.
pub struct Gateway {
    router: Router,
}

impl Gateway {
    /// Consume the gateway, yielding the axum router ready to merge into the outer server.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Build the gateway: initialize providers, the firewall, and every dialect endpoint enabled
/// in configuration.
pub async fn build(config: &config::Config) -> anyhow::Result<Gateway> {
    let server = LlmServerBuilder::new(config)
        .build()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize LLM server: {e}"))?;

    let state = Arc::new(GatewayState {
        server,
        firewall: FirewallEngine::new(config.firewall.clone()),
        warn_on_duplicate_tool_calls: config.llm.warn_on_duplicate_tool_calls,
    });

    let mut router = Router::new();

    if config.llm.dialects.openai_chat.enabled {
        let routes = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/models", get(list_models))
            .with_state(state.clone());

        router = router.nest(&config.llm.dialects.openai_chat.path, routes);
    }

    if config.llm.dialects.anthropic_messages.enabled {
        let routes = Router::new()
            .route("/v1/messages", post(anthropic_messages))
            .route("/v1/messages/count_tokens", post(anthropic_count_tokens))
            .route("/v1/models", get(anthropic_list_models))
            .with_state(state.clone());

        // Reachable both at the configured path and at the fixed `/anthropic` alias.
        router = router.nest(&config.llm.dialects.anthropic_messages.path, routes.clone());
        router = router.nest("/anthropic", routes);
    }

    if config.llm.dialects.gemini_openai_compat.enabled {
        // The OpenAI-compat shim is a routing alias, not a distinct wire format: it reuses the
        // OpenAI Chat codec verbatim and relies on the router sending it to a Google-dialect
        // provider.
        let routes = Router::new().route("/chat/completions", post(chat_completions)).with_state(state.clone());

        router = router.nest(&config.llm.dialects.gemini_openai_compat.path, routes);
    }

    Ok(Gateway { router })
}

fn extract_context(
    headers: &HeaderMap,
    client_identity: Option<Extension<context::ClientIdentity>>,
) -> request::RequestContext {
    request::extract_context(headers, client_identity.map(|ext| ext.0), None)
}

/// Handle chat completion requests.
///
/// This endpoint supports both streaming and non-streaming responses.
/// When `stream: true` is set in the request, the response is sent as
/// Server-Sent Events (SSE). Otherwise, a standard JSON response is returned.
async fn chat_completions(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    client_identity: Option<Extension<context::ClientIdentity>>,
    Sonic(request): Sonic<openai::ChatCompletionRequest>,
) -> Result<impl IntoResponse> {
    log::debug!("OpenAI chat completions handler called for model: {}", request.model);
    log::debug!("Streaming: {}", request.stream.unwrap_or(false));

    let context = extract_context(&headers, client_identity);
    let session_id = context.firewall_session_id().to_string();

    let mut unified_request = unified::UnifiedRequest::from(request);
    tool_continuation::repair(&mut unified_request.messages, state.warn_on_duplicate_tool_calls);
    state.firewall.filter_input(&mut unified_request, &session_id).await?;

    if unified_request.stream.unwrap_or(false) {
        let stream = state.server.completions_stream(unified_request, &context).await?;

        let event_stream = stream.map(move |result| {
            let event = match result {
                Ok(unified_chunk) => {
                    let openai_chunk = openai::ChatCompletionChunk::from(unified_chunk);
                    let json = sonic_rs::to_string(&openai_chunk).unwrap_or_else(|e| {
                        log::error!("Failed to serialize chunk: {e}");
                        r#"{"error":"serialization failed"}"#.to_string()
                    });

                    Event::default().data(json)
                }
                Err(e) => {
                    log::error!("Stream error: {e}");
                    Event::default().data(format!(r#"{{"error":"{e}"}}"#))
                }
            };

            Ok::<_, Infallible>(event)
        });

        let with_done = event_stream.chain(futures::stream::once(async {
            Ok::<_, Infallible>(Event::default().data("[DONE]"))
        }));

        log::debug!("Returning streaming response");
        Ok(Sse::new(with_done).into_response())
    } else {
        let mut unified_response = state.server.completions(unified_request, &context).await?;
        state.firewall.filter_output(&mut unified_response, &session_id).await?;

        let response = openai::ChatCompletionResponse::from(unified_response);

        log::debug!(
            "Chat completion successful, returning response with {} choices",
            response.choices.len()
        );

        Ok(Json(response).into_response())
    }
}

/// Handle list models requests.
async fn list_models(State(state): State<Arc<GatewayState>>) -> Result<impl IntoResponse> {
    let response = state.server.models().await;

    log::debug!("Returning {} models", response.data.len());
    Ok(Json(response))
}

/// Handle Anthropic messages requests.
///
/// This endpoint supports both streaming and non-streaming responses.
/// When `stream: true` is set in the request, the response is sent as
/// Server-Sent Events (SSE). Otherwise, a standard JSON response is returned.
async fn anthropic_messages(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    client_identity: Option<Extension<context::ClientIdentity>>,
    Sonic(request): Sonic<anthropic::AnthropicChatRequest>,
) -> AnthropicResult<impl IntoResponse> {
    log::debug!("Anthropic messages handler called for model: {}", request.model);
    log::debug!("Streaming: {}", request.stream.unwrap_or(false));

    let context = extract_context(&headers, client_identity);
    let session_id = context.firewall_session_id().to_string();

    let mut unified_request = unified::UnifiedRequest::from(request);
    tool_continuation::repair(&mut unified_request.messages, state.warn_on_duplicate_tool_calls);
    state.firewall.filter_input(&mut unified_request, &session_id).await?;

    if unified_request.stream.unwrap_or(false) {
        let stream = state.server.completions_stream(unified_request, &context).await?;

        let event_stream = stream.map(move |result| {
            let event = match result {
                Ok(chunk) => {
                    let anthropic_event = anthropic::AnthropicStreamEvent::from(chunk);
                    let json = sonic_rs::to_string(&anthropic_event).unwrap_or_else(|e| {
                        log::error!("Failed to serialize Anthropic streaming event: {e}");
                        r#"{"error":"serialization failed"}"#.to_string()
                    });

                    Event::default().data(json)
                }
                Err(e) => {
                    log::error!("Stream error: {e}");
                    let anthropic_error = anthropic::AnthropicError::from(e);
                    let error_event = anthropic::AnthropicStreamEvent::Error {
                        error: anthropic_error.error,
                    };
                    let json = sonic_rs::to_string(&error_event).unwrap_or_else(|se| {
                        log::error!("Failed to serialize Anthropic stream error event: {se}");
                        r#"{"type":"error","error":{"type":"internal_error","message":"serialization failed"}}"#
                            .to_string()
                    });

                    Event::default().data(json)
                }
            };

            Ok::<_, Infallible>(event)
        });

        log::debug!("Returning Anthropic streaming response");

        Ok(Sse::new(event_stream).into_response())
    } else {
        let mut unified_response = state.server.completions(unified_request, &context).await?;
        state
            .firewall
            .filter_output(&mut unified_response, &session_id)
            .await
            .map_err(error::AnthropicErrorResponse::from)?;

        let anthropic_response = anthropic::AnthropicChatResponse::from(unified_response);

        log::debug!("Anthropic messages completion successful");

        Ok(Json(anthropic_response).into_response())
    }
}

/// Handle Anthropic's `/v1/messages/count_tokens` endpoint.
async fn anthropic_count_tokens(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    client_identity: Option<Extension<context::ClientIdentity>>,
    Sonic(request): Sonic<anthropic::AnthropicChatRequest>,
) -> AnthropicResult<impl IntoResponse> {
    let context = extract_context(&headers, client_identity);
    let unified_request = unified::UnifiedRequest::from(request);

    let response = state.server.count_tokens(unified_request, &context).await?;
    Ok(Json(response))
}

/// Handle Anthropic list models requests.
async fn anthropic_list_models(State(state): State<Arc<GatewayState>>) -> AnthropicResult<impl IntoResponse> {
    let openai_response = state.server.models().await;
    let anthropic_response = anthropic::AnthropicModelsResponse::from(openai_response);

    log::debug!("Returning {} models for Anthropic", anthropic_response.data.len());
    Ok(Json(anthropic_response))
}
