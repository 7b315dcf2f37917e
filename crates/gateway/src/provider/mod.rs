//! Upstream provider glue: wire-format translation, HTTP plumbing, and model resolution shared
//! by every provider implementation.

pub(crate) mod anthropic;
pub(crate) mod google;
pub(crate) mod http_client;
pub(crate) mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use axum::http;
use futures::Stream;
use indexmap::IndexMap;
use reqwest::{Client, Method, RequestBuilder};

use crate::{
    messages::{
        anthropic::CountTokensResponse,
        openai::Model,
        unified::{UnifiedChunk, UnifiedRequest, UnifiedResponse},
    },
    request::RequestContext,
};

/// A boxed stream of incremental chat completion chunks, already translated into the
/// canonical shape. Each provider's SSE handling collapses into this one type.
pub(crate) type ChatCompletionStream = Pin<Box<dyn Stream<Item = crate::Result<UnifiedChunk>> + Send>>;

/// A single upstream LLM backend: OpenAI, Anthropic, Google, or any future dialect.
///
/// Every method takes and returns canonical `messages::unified` types; dialect translation
/// happens entirely inside each implementation's `input`/`output` modules.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Send a non-streaming chat completion request.
    async fn chat_completion(&self, request: UnifiedRequest, context: &RequestContext) -> crate::Result<UnifiedResponse>;

    /// Send a streaming chat completion request.
    async fn chat_completion_stream(
        &self,
        request: UnifiedRequest,
        context: &RequestContext,
    ) -> crate::Result<ChatCompletionStream>;

    /// List the models this provider exposes (explicitly configured plus, where supported, the
    /// upstream's own model listing).
    async fn list_models(&self) -> anyhow::Result<Vec<Model>>;

    /// Count the tokens a request would consume without generating a completion.
    ///
    /// Only Anthropic exposes a dedicated endpoint for this; other providers report that the
    /// operation isn't supported.
    async fn count_tokens(&self, _request: UnifiedRequest, _context: &RequestContext) -> crate::Result<CountTokensResponse> {
        Err(crate::error::LlmError::InvalidRequest(
            "this provider does not support counting tokens".to_string(),
        ))
    }

    /// Whether this provider can stream responses.
    fn supports_streaming(&self) -> bool;

    /// The name this provider was registered under in configuration.
    fn name(&self) -> &str;
}

/// Providers that talk to an upstream over plain HTTP, sharing a header-transformation pipeline
/// and a pooled client.
pub(crate) trait HttpProvider {
    /// Header rules configured for this provider, applied before any model-level rules.
    fn get_provider_headers(&self) -> &[config::HeaderRule];

    /// The pooled HTTP client to issue requests with.
    fn get_http_client(&self) -> &Client;

    /// Build a request, applying the provider's and (if any) the model's header rules in
    /// declaration order over the inbound client headers.
    fn request_builder(
        &self,
        method: Method,
        url: &str,
        context: &RequestContext,
        model_config: Option<&config::ModelConfig>,
    ) -> RequestBuilder {
        let mut headers = http::HeaderMap::new();

        for rule in self.get_provider_headers() {
            apply_header_rule(&mut headers, rule, &context.headers);
        }

        if let Some(config::ModelConfig::Api(api_model)) = model_config {
            for rule in &api_model.headers {
                apply_header_rule(&mut headers, rule, &context.headers);
            }
        }

        self.get_http_client().request(method, url).headers(headers)
    }
}

fn header_name_matches(pattern: &config::NameOrPattern, name: &http::HeaderName) -> bool {
    match pattern {
        config::NameOrPattern::Name(n) => name.as_str().eq_ignore_ascii_case(n.as_str()),
        config::NameOrPattern::Pattern(p) => p.is_match(name.as_str()),
    }
}

/// Apply a single header rule against the in-progress outbound header set, consulting the
/// inbound client headers for `forward`/`rename_duplicate` sources.
fn apply_header_rule(out: &mut http::HeaderMap, rule: &config::HeaderRule, inbound: &http::HeaderMap) {
    match rule {
        config::HeaderRule::Forward(forward) => {
            for (name, value) in inbound.iter() {
                if !header_name_matches(&forward.name, name) {
                    continue;
                }

                let target = forward.rename.as_ref().map(|r| r.as_str()).unwrap_or_else(|| name.as_str());

                if let Ok(target) = http::HeaderName::from_bytes(target.as_bytes()) {
                    out.insert(target, value.clone());
                }
            }
        }
        config::HeaderRule::Insert(insert) => {
            if let (Ok(name), Ok(value)) = (
                http::HeaderName::from_bytes(insert.name.as_str().as_bytes()),
                http::HeaderValue::from_str(&insert.value),
            ) {
                out.insert(name, value);
            }
        }
        config::HeaderRule::Remove(remove) => {
            out.retain(|name, _| !header_name_matches(&remove.name, name));
        }
        config::HeaderRule::RenameDuplicate(rename) => {
            let Ok(source) = http::HeaderName::from_bytes(rename.name.as_str().as_bytes()) else {
                return;
            };

            if let Some(value) = out.get(&source).cloned() {
                if let Ok(target) = http::HeaderName::from_bytes(rename.rename.as_str().as_bytes()) {
                    out.insert(target, value);
                }
            }
        }
    }
}

/// Resolves client-facing model aliases to the upstream-configured model, keyed per provider.
pub(crate) struct ModelManager {
    models: IndexMap<String, config::ModelConfig>,
    provider_name: String,
}

impl ModelManager {
    pub(crate) fn new(models: IndexMap<String, config::ModelConfig>, provider_name: &str) -> Self {
        Self {
            models,
            provider_name: provider_name.to_string(),
        }
    }

    /// Resolve a client-supplied model id to the name the upstream expects, applying a
    /// configured rename if one exists. Returns `None` when the model isn't explicitly
    /// configured (the caller forwards the client's model id unchanged in that case).
    pub(crate) fn resolve_model(&self, requested: &str) -> Option<String> {
        let config = self.models.get(requested)?;
        Some(config.rename().unwrap_or(requested).to_string())
    }

    /// Look up the configuration for a client-supplied model id, if one was explicitly
    /// configured.
    pub(crate) fn get_model_config(&self, requested: &str) -> Option<&config::ModelConfig> {
        self.models.get(requested)
    }

    /// Every explicitly configured model, with a provider-prefixed id.
    pub(crate) fn get_configured_models(&self) -> Vec<Model> {
        self.models
            .keys()
            .map(|id| Model {
                id: id.clone(),
                object: crate::messages::openai::ObjectType::Model,
                created: 0,
                owned_by: self.provider_name.clone(),
            })
            .collect()
    }
}

/// Resolves the credential a provider should send upstream: the client's own key when
/// `forward_token` (BYOK) is enabled, otherwise the configured key.
pub(crate) mod token {
    use secrecy::SecretString;

    use crate::{error::LlmError, request::RequestContext};

    pub(crate) fn get(
        forward_token: bool,
        configured_key: &Option<SecretString>,
        context: &RequestContext,
    ) -> crate::Result<SecretString> {
        if forward_token {
            return context.api_key.clone().ok_or_else(|| {
                LlmError::AuthenticationFailed(
                    "this model forwards the client's own API key, but none was provided".to_string(),
                )
            });
        }

        configured_key
            .clone()
            .ok_or_else(|| LlmError::AuthenticationFailed("no API key configured for this provider".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_model(rename: Option<&str>) -> config::ModelConfig {
        config::ModelConfig::Api(config::ApiModelConfig {
            rename: rename.map(str::to_string),
            headers: Vec::new(),
        })
    }

    #[test]
    fn resolves_renamed_model() {
        let mut models = IndexMap::new();
        models.insert("fast".to_string(), api_model(Some("gpt-4o-mini")));
        let manager = ModelManager::new(models, "openai");

        assert_eq!(manager.resolve_model("fast").as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn falls_back_to_requested_name_without_rename() {
        let mut models = IndexMap::new();
        models.insert("gpt-4o-mini".to_string(), api_model(None));
        let manager = ModelManager::new(models, "openai");

        assert_eq!(manager.resolve_model("gpt-4o-mini").as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn unconfigured_model_resolves_to_none() {
        let manager = ModelManager::new(IndexMap::new(), "openai");
        assert_eq!(manager.resolve_model("whatever"), None);
    }
}
