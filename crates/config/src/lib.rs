//! Configuration structures mapping the gateway's TOML configuration file.

#![deny(missing_docs)]

pub mod error;
mod firewall;
mod headers;
mod health;
mod llm;
mod loader;
mod server;
mod tls;

use std::path::Path;

pub use firewall::{FilterConfig, FilterKind, FirewallConfig, FirewallMode, LocaleSet, NerConfig, OnFilterError, TokenizerStoreConfig};
pub use headers::{HeaderForward, HeaderInsert, HeaderRemove, HeaderRenameDuplicate, HeaderRule, NameOrPattern, NamePattern};
pub use health::HealthConfig;
pub use llm::{
    ApiModelConfig, ApiProviderConfig, DialectEndpointConfig, DialectsConfig, LlmConfig, ModelConfig, ModelFilter,
    ModelProviderRoute, ProviderType, WorkMode,
};
use serde::Deserialize;
pub use server::ServerConfig;
pub use tls::TlsServerConfig;

/// Top-level configuration for the gateway binary.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    pub server: ServerConfig,
    /// Upstream providers, dialect endpoints, and routing.
    pub llm: LlmConfig,
    /// Prompt Firewall configuration.
    pub firewall: FirewallConfig,
}

impl Config {
    /// Load configuration from a file path, expanding `{{ env.VAR }}` placeholders.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates that the configuration has at least one functional downstream.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate_has_downstreams(self)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use crate::Config;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_debug_snapshot!(&config, @r#"
        Config {
            server: ServerConfig {
                listen_address: None,
                tls: None,
                health: HealthConfig {
                    enabled: true,
                    listen: None,
                    path: "/health",
                },
                cors_permissive: true,
            },
            llm: LlmConfig {
                enabled: true,
                dialects: DialectsConfig {
                    openai_chat: DialectEndpointConfig {
                        enabled: true,
                        path: "/v1/chat/completions",
                    },
                    openai_responses: DialectEndpointConfig {
                        enabled: true,
                        path: "/v1/responses",
                    },
                    anthropic_messages: DialectEndpointConfig {
                        enabled: true,
                        path: "/v1/messages",
                    },
                    gemini_native: DialectEndpointConfig {
                        enabled: true,
                        path: "/v1beta/models",
                    },
                    gemini_openai_compat: DialectEndpointConfig {
                        enabled: true,
                        path: "/v1beta/openai/chat/completions",
                    },
                },
                providers: {},
                work_mode: Auto,
                routes: [],
                aliases: {},
                fallback_provider: None,
                hot_reload_interval_secs: 5,
                warn_on_duplicate_tool_calls: false,
            },
            firewall: FirewallConfig {
                mode: Disabled,
                input_filters: [],
                output_filters: [],
                locales: LocaleSet {
                    global: true,
                    us: true,
                    cn: false,
                },
                min_confidence: 0.5,
                ner: None,
                tokenizer: TokenizerStoreConfig {
                    max_capacity: 100000,
                    ttl: 3600s,
                },
            },
        }
        "#);
    }
}
