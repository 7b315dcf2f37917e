//! Gateway configuration: upstream providers, dialect endpoints, and the routing table.

use std::{borrow::Cow, fmt};

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::headers::HeaderRule;

/// Configuration for an individual model within an upstream provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiModelConfig {
    /// Optional rename - the actual provider model name.
    /// If not specified, the model ID (map key) is used.
    pub rename: Option<String>,
    /// Header transformation rules for this model.
    pub headers: Vec<HeaderRule>,
}

impl Default for ApiModelConfig {
    fn default() -> Self {
        Self {
            rename: None,
            headers: Vec::new(),
        }
    }
}

/// Per-model configuration, keyed by provider kind.
///
/// Currently every provider is a plain HTTP API, so there is only one variant. Kept as an enum
/// rather than a bare `ApiModelConfig` so future provider kinds (e.g. a local/embedded model) can
/// be added without breaking the `ModelManager` call sites.
#[derive(Debug, Clone)]
pub enum ModelConfig {
    Api(ApiModelConfig),
}

impl ModelConfig {
    pub fn rename(&self) -> Option<&str> {
        match self {
            Self::Api(config) => config.rename.as_deref(),
        }
    }
}

/// Case-insensitive regex filter for matching model identifiers.
#[derive(Clone)]
pub struct ModelFilter {
    regex: Regex,
}

impl ModelFilter {
    fn new(pattern: &str) -> Result<Self, String> {
        let trimmed = pattern.trim();

        if trimmed.is_empty() {
            return Err("model_filter cannot be empty".to_string());
        }

        let regex = RegexBuilder::new(trimmed)
            .case_insensitive(true)
            .build()
            .map_err(|err| format!("invalid model_filter regex: {err}"))?;

        Ok(Self { regex })
    }

    /// Return the original pattern string.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Check whether the supplied model identifier matches the pattern.
    pub fn is_match(&self, model: &str) -> bool {
        self.regex.is_match(model)
    }
}

impl fmt::Debug for ModelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFilter").field("pattern", &self.pattern()).finish()
    }
}

impl<'de> Deserialize<'de> for ModelFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pattern = Cow::<'de, str>::deserialize(deserializer)?;
        ModelFilter::new(pattern.as_ref()).map_err(serde::de::Error::custom)
    }
}

/// Which upstream dialect a provider entry speaks natively.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    /// OpenAI Chat Completions.
    Openai,
    /// Anthropic Messages.
    Anthropic,
    /// Google Gemini native.
    Google,
}

/// Configuration for a single upstream provider entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiProviderConfig {
    /// Which dialect this provider speaks natively.
    pub provider_type: Option<ProviderType>,
    /// API key for authentication.
    pub api_key: Option<SecretString>,
    /// Custom base URL for the provider API.
    pub base_url: Option<String>,
    /// Enable token forwarding: use the client's own `Authorization`/`x-goog-api-key`
    /// header instead of the configured key (BYOK).
    pub forward_token: bool,
    /// Regular expression filter for automatically routing models to this provider.
    pub model_filter: Option<ModelFilter>,
    /// Explicitly configured per-model overrides, keyed by the model id clients use.
    pub models: IndexMap<String, ApiModelConfig>,
    /// Header transformation rules applied to every request sent to this provider.
    pub headers: Vec<HeaderRule>,
}

impl Default for ApiProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: None,
            api_key: None,
            base_url: None,
            forward_token: false,
            model_filter: None,
            models: IndexMap::new(),
            headers: Vec::new(),
        }
    }
}

/// Endpoint enable/path pair shared by every dialect.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectEndpointConfig {
    /// Whether this endpoint is exposed.
    pub enabled: bool,
    /// Path the endpoint is mounted at.
    pub path: String,
}

impl DialectEndpointConfig {
    fn new(path: &str) -> Self {
        Self {
            enabled: true,
            path: path.to_string(),
        }
    }
}

/// Configuration for all dialect-specific endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectsConfig {
    /// OpenAI Chat Completions endpoint.
    pub openai_chat: DialectEndpointConfig,
    /// OpenAI Responses endpoint.
    pub openai_responses: DialectEndpointConfig,
    /// Anthropic Messages endpoint (both the `/v1/messages` and `/anthropic/v1/messages` aliases).
    pub anthropic_messages: DialectEndpointConfig,
    /// Gemini native endpoint.
    pub gemini_native: DialectEndpointConfig,
    /// Gemini OpenAI-compatibility shim endpoint.
    pub gemini_openai_compat: DialectEndpointConfig,
}

impl Default for DialectsConfig {
    fn default() -> Self {
        Self {
            openai_chat: DialectEndpointConfig::new("/v1/chat/completions"),
            openai_responses: DialectEndpointConfig::new("/v1/responses"),
            anthropic_messages: DialectEndpointConfig::new("/v1/messages"),
            gemini_native: DialectEndpointConfig::new("/v1beta/models"),
            gemini_openai_compat: DialectEndpointConfig::new("/v1beta/openai/chat/completions"),
        }
    }
}

/// Global policy gating whether the gateway may passthrough, translate, or choose
/// automatically.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    /// Passthrough when client and target dialect match, translate otherwise.
    #[default]
    Auto,
    /// Fail fast if translation would be required.
    Passthrough,
    /// Fail fast if no translation is required (client dialect == target's native dialect).
    Translation,
}

/// A single ordered glob-pattern routing rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelProviderRoute {
    /// Case-insensitive glob pattern matched against the (aliased) model name.
    pub pattern: String,
    /// Name of the provider entry in `providers` this route selects.
    pub target: String,
}

/// Gateway-wide LLM configuration: providers, dialect endpoints, and the routing table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Whether the LLM gateway functionality is enabled.
    pub enabled: bool,
    /// Dialect-specific endpoint configuration.
    pub dialects: DialectsConfig,
    /// Map of upstream provider configurations, keyed by provider name.
    pub providers: IndexMap<String, ApiProviderConfig>,
    /// Global work mode gate.
    pub work_mode: WorkMode,
    /// Ordered glob-pattern routes, evaluated first-match-wins.
    pub routes: Vec<ModelProviderRoute>,
    /// Flat alias map, applied (repeatedly, to a fixed point) before routing.
    pub aliases: IndexMap<String, String>,
    /// Provider selected when no route matches.
    pub fallback_provider: Option<String>,
    /// Interval, in seconds, at which the router checks for and applies config changes.
    pub hot_reload_interval_secs: u64,
    /// Whether to warn (diagnostic only, never suppressed) on a duplicate tool call.
    pub warn_on_duplicate_tool_calls: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dialects: DialectsConfig::default(),
            providers: IndexMap::new(),
            work_mode: WorkMode::default(),
            routes: Vec::new(),
            aliases: IndexMap::new(),
            fallback_provider: None,
            hot_reload_interval_secs: 5,
            warn_on_duplicate_tool_calls: false,
        }
    }
}

impl LlmConfig {
    /// Whether there are any upstream providers configured.
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }
}
