//! Prompt Firewall configuration: mode, filter chains, detectors, tokenizer store.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Global firewall mode.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FirewallMode {
    /// Pipeline is inert.
    #[default]
    Disabled,
    /// Filters run and log, nothing is modified or blocked.
    Monitor,
    /// Detected PII is tokenized on input and reversed on output.
    Redact,
    /// Critical-severity detections reject the request; others are redacted.
    Enforce,
}

/// What happens to the rest of the chain (and the request) when a filter fails.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnFilterError {
    /// Skip this filter, keep the last-known content, continue the chain.
    #[default]
    Allow,
    /// Fail closed: 503 on input, 502 on output.
    Block,
    /// Skip this filter AND the remainder of the chain.
    Bypass,
}

/// Which detector a filter chain entry runs.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// The built-in regex detector bank.
    Regex,
    /// The remote NER detector.
    Ner,
}

/// One entry in an input or output filter chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Human-readable name, used in logs.
    pub name: String,
    /// Which detector this entry runs.
    pub kind: FilterKind,
    /// Chains execute in ascending priority order; ties by declaration order.
    #[serde(default)]
    pub priority: i32,
    /// Whether this entry is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Policy applied when this filter itself fails (timeout, transport error, panic-free
    /// internal error).
    #[serde(default)]
    pub on_error: OnFilterError,
}

fn default_true() -> bool {
    true
}

/// Locale groups activated for the regex detector bank.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleSet {
    /// Patterns with no country affinity (email, credit card, IP, API keys, ...).
    pub global: bool,
    /// United States locale patterns (SSN, US phone numbers, ...).
    pub us: bool,
    /// China locale patterns (resident ID card, ...).
    pub cn: bool,
}

impl Default for LocaleSet {
    fn default() -> Self {
        Self {
            global: true,
            us: true,
            cn: false,
        }
    }
}

/// Remote NER (Presidio-style) detector client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NerConfig {
    /// Base URL of the remote NER service.
    pub base_url: Url,
    /// Per-call deadline.
    #[serde(with = "humantime_serde", default = "default_ner_timeout")]
    pub timeout: Duration,
}

fn default_ner_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Bounded, session-scoped bidirectional tokenizer store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenizerStoreConfig {
    /// Maximum number of token mappings held at once, across all sessions.
    pub max_capacity: u64,
    /// Wall-clock time-to-idle for a session's mappings.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for TokenizerStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Prompt Firewall configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirewallConfig {
    /// Global mode.
    pub mode: FirewallMode,
    /// Filters applied to the decoded client request.
    pub input_filters: Vec<FilterConfig>,
    /// Filters applied to the decoded upstream response.
    pub output_filters: Vec<FilterConfig>,
    /// Locales activated for the regex detector bank.
    pub locales: LocaleSet,
    /// Minimum confidence, in `[0,1]`, for a span to be reported at all.
    pub min_confidence: f32,
    /// Optional remote NER detector.
    pub ner: Option<NerConfig>,
    /// Tokenizer store bounds.
    pub tokenizer: TokenizerStoreConfig,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            mode: FirewallMode::default(),
            input_filters: Vec::new(),
            output_filters: Vec::new(),
            locales: LocaleSet::default(),
            min_confidence: 0.5,
            ner: None,
            tokenizer: TokenizerStoreConfig::default(),
        }
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
