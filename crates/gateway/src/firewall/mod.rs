//! The Prompt Firewall: a priority-ordered PII filter chain with four policy modes
//! (disabled/monitor/redact/enforce) and reversible, session-scoped tokenization.

mod pii;
mod tokenizer;

use config::{FilterConfig, FilterKind, FirewallConfig, FirewallMode, OnFilterError};

use crate::{
    error::LlmError,
    messages::unified::{UnifiedContent, UnifiedContentContainer, UnifiedMessage, UnifiedRequest, UnifiedResponse},
};

use pii::{NerClient, PiiSpan, PiiType, detect_regex, fuse};
use tokenizer::TokenizerStore;

/// Detections surfaced for the observability log line (never the PII values themselves).
#[derive(Debug, Clone, Default)]
pub(crate) struct Detections {
    pub types: Vec<String>,
}

impl Detections {
    fn record(&mut self, spans: &[PiiSpan]) {
        for span in spans {
            let name = span.kind.to_string();
            if !self.types.contains(&name) {
                self.types.push(name);
            }
        }
    }
}

pub(crate) struct FirewallEngine {
    config: FirewallConfig,
    tokenizer: TokenizerStore,
    ner: Option<NerClient>,
}

impl FirewallEngine {
    pub(crate) fn new(config: FirewallConfig) -> Self {
        let ner = config.ner.as_ref().map(NerClient::new);
        let tokenizer = TokenizerStore::new(&config.tokenizer);

        Self { config, tokenizer, ner }
    }

    pub(crate) fn mode(&self) -> FirewallMode {
        self.config.mode
    }

    /// Run the input chain over every text block of a request's messages, in place.
    ///
    /// Returns the detections observed (for logging) or a `FirewallBlocked` error if enforce
    /// mode trips on a critical-severity type.
    pub(crate) async fn filter_input(
        &self,
        request: &mut UnifiedRequest,
        session_id: &str,
    ) -> crate::Result<Detections> {
        if self.config.mode == FirewallMode::Disabled {
            return Ok(Detections::default());
        }

        let mut detections = Detections::default();

        for message in &mut request.messages {
            self.filter_message(message, session_id, &self.config.input_filters, "input", &mut detections)
                .await?;
        }

        Ok(detections)
    }

    /// Run the output chain over a response's choices, in place. Surrogates minted during
    /// input filtering of the same session are reversed back to their originals; any new PII
    /// the model itself produced is replaced with a non-reversible placeholder.
    pub(crate) async fn filter_output(
        &self,
        response: &mut UnifiedResponse,
        session_id: &str,
    ) -> crate::Result<Detections> {
        if self.config.mode == FirewallMode::Disabled {
            return Ok(Detections::default());
        }

        let mut detections = Detections::default();

        for choice in &mut response.choices {
            self.filter_message(
                &mut choice.message,
                session_id,
                &self.config.output_filters,
                "output",
                &mut detections,
            )
            .await?;
        }

        Ok(detections)
    }

    async fn filter_message(
        &self,
        message: &mut UnifiedMessage,
        session_id: &str,
        chain: &[FilterConfig],
        direction: &'static str,
        detections: &mut Detections,
    ) -> crate::Result<()> {
        match &mut message.content {
            UnifiedContentContainer::Text(text) => {
                let rewritten = self.filter_text(text, session_id, chain, direction, detections).await?;
                *text = rewritten;
            }
            UnifiedContentContainer::Blocks(blocks) => {
                for block in blocks {
                    if let UnifiedContent::Text { text } = block {
                        let rewritten = self.filter_text(text, session_id, chain, direction, detections).await?;
                        *text = rewritten;
                    }
                }
            }
        }

        Ok(())
    }

    /// Ordered by ascending priority, ties by declaration order (the slice is already in that
    /// order - chains are never re-sorted so insertion order doubles as the tie-break).
    async fn filter_text(
        &self,
        text: &str,
        session_id: &str,
        chain: &[FilterConfig],
        direction: &'static str,
        detections: &mut Detections,
    ) -> crate::Result<String> {
        let mut ordered: Vec<&FilterConfig> = chain.iter().filter(|f| f.enabled).collect();
        ordered.sort_by_key(|f| f.priority);

        let mut current = text.to_string();

        for filter in ordered {
            let spans = match self.run_filter(filter, &current).await {
                Ok(spans) => spans,
                Err(err) => match filter.on_error {
                    OnFilterError::Allow => {
                        log::warn!("firewall filter '{}' failed, allowing through: {err}", filter.name);
                        continue;
                    }
                    OnFilterError::Bypass => {
                        log::warn!("firewall filter '{}' failed, bypassing remaining chain: {err}", filter.name);
                        break;
                    }
                    OnFilterError::Block => {
                        let status = if direction == "input" { 503 } else { 502 };
                        return Err(LlmError::ProviderApiError {
                            status,
                            message: format!("firewall filter '{}' failed: {err}", filter.name),
                        });
                    }
                },
            };

            detections.record(&spans);

            match self.config.mode {
                FirewallMode::Disabled => unreachable!("checked by caller"),
                FirewallMode::Monitor => {}
                FirewallMode::Redact => {
                    current = self.apply_redaction(&current, &spans, session_id, direction);
                }
                FirewallMode::Enforce => {
                    if direction == "input" {
                        let critical: Vec<String> =
                            spans.iter().filter(|s| s.kind.is_critical()).map(|s| s.kind.to_string()).collect();

                        if !critical.is_empty() {
                            return Err(LlmError::FirewallBlocked {
                                reason: "pii_critical".to_string(),
                                types_detected: critical,
                            });
                        }
                    }

                    current = self.apply_redaction(&current, &spans, session_id, direction);
                }
            }
        }

        if direction == "output" && self.config.mode == FirewallMode::Redact {
            current = self.reverse_surrogates(&current, session_id);
        }

        Ok(current)
    }

    async fn run_filter(&self, filter: &FilterConfig, text: &str) -> anyhow::Result<Vec<PiiSpan>> {
        match filter.kind {
            FilterKind::Regex => Ok(detect_regex(text, &self.config.locales, self.config.min_confidence)),
            FilterKind::Ner => {
                let Some(ner) = &self.ner else {
                    anyhow::bail!("filter '{}' configured as NER but no ner client is configured", filter.name);
                };

                let regex_spans = detect_regex(text, &self.config.locales, self.config.min_confidence);
                let direction = "input";
                let ner_spans = ner.detect(text, direction).await?;

                Ok(fuse(regex_spans, ner_spans))
            }
        }
    }

    /// Replace spans right-to-left so earlier byte offsets stay valid as we rewrite the tail.
    fn apply_redaction(&self, text: &str, spans: &[PiiSpan], session_id: &str, direction: &str) -> String {
        let mut rewritten = text.to_string();
        let mut ordered: Vec<&PiiSpan> = spans.iter().collect();
        ordered.sort_by_key(|s| std::cmp::Reverse(s.start));

        for span in ordered {
            let original = span.text(text);

            let replacement = if direction == "input" && span.kind.reversible() {
                self.tokenizer.surrogate_for(session_id, original, span.kind)
            } else {
                format!("[{}]", span.kind)
            };

            rewritten.replace_range(span.start..span.end, &replacement);
        }

        rewritten
    }

    /// Longest-match-first scan over the session's active surrogates, never re-scanning bytes
    /// already substituted in this pass.
    fn reverse_surrogates(&self, text: &str, session_id: &str) -> String {
        let surrogates = self.tokenizer.active_surrogates(session_id);

        if surrogates.is_empty() {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        'outer: while !rest.is_empty() {
            for surrogate in &surrogates {
                if let Some(original) = rest.strip_prefix(surrogate.as_str()).map(|tail| (surrogate, tail)) {
                    let (surrogate, tail) = original;
                    if let Some(value) = self.tokenizer.reverse_lookup(session_id, surrogate) {
                        result.push_str(&value);
                        rest = tail;
                        continue 'outer;
                    }
                }
            }

            let mut chars = rest.chars();
            let next = chars.next().expect("rest is non-empty");
            result.push(next);
            rest = chars.as_str();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::unified::UnifiedRole;

    fn engine(mode: FirewallMode) -> FirewallEngine {
        FirewallEngine::new(FirewallConfig {
            mode,
            input_filters: vec![FilterConfig {
                name: "pii".to_string(),
                kind: FilterKind::Regex,
                priority: 0,
                enabled: true,
                on_error: OnFilterError::Allow,
            }],
            output_filters: vec![FilterConfig {
                name: "pii".to_string(),
                kind: FilterKind::Regex,
                priority: 0,
                enabled: true,
                on_error: OnFilterError::Allow,
            }],
            locales: config::LocaleSet {
                global: true,
                us: true,
                cn: false,
            },
            min_confidence: 0.5,
            ner: None,
            tokenizer: config::TokenizerStoreConfig {
                max_capacity: 1000,
                ttl: std::time::Duration::from_secs(3600),
            },
        })
    }

    fn text_message(role: UnifiedRole, text: &str) -> UnifiedMessage {
        UnifiedMessage {
            role,
            content: UnifiedContentContainer::Text(text.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[tokio::test]
    async fn redact_mode_round_trips_email_through_a_session() {
        let engine = engine(FirewallMode::Redact);

        let mut request = UnifiedRequest {
            messages: vec![text_message(
                UnifiedRole::User,
                "My email is alice@example.com, echo it back.",
            )],
            ..blank_request()
        };

        engine.filter_input(&mut request, "session-1").await.unwrap();

        let UnifiedContentContainer::Text(rewritten) = &request.messages[0].content else {
            panic!("expected text content");
        };
        assert!(rewritten.contains("@redacted.local"));
        let surrogate_line = rewritten.clone();

        let mut response = blank_response(&surrogate_line);
        engine.filter_output(&mut response, "session-1").await.unwrap();

        let UnifiedContentContainer::Text(final_text) = &response.choices[0].message.content else {
            panic!("expected text content");
        };
        assert!(final_text.contains("alice@example.com"));
    }

    #[tokio::test]
    async fn enforce_mode_blocks_critical_pii() {
        let engine = engine(FirewallMode::Enforce);

        let mut request = UnifiedRequest {
            messages: vec![text_message(UnifiedRole::User, "My SSN is 123-45-6789")],
            ..blank_request()
        };

        let error = engine.filter_input(&mut request, "session-1").await.unwrap_err();
        assert!(matches!(error, LlmError::FirewallBlocked { .. }));
    }

    #[tokio::test]
    async fn monitor_mode_never_modifies_content() {
        let engine = engine(FirewallMode::Monitor);

        let original = "My email is alice@example.com";
        let mut request = UnifiedRequest {
            messages: vec![text_message(UnifiedRole::User, original)],
            ..blank_request()
        };

        engine.filter_input(&mut request, "session-1").await.unwrap();

        let UnifiedContentContainer::Text(text) = &request.messages[0].content else {
            panic!("expected text content");
        };
        assert_eq!(text, original);
    }

    fn blank_request() -> UnifiedRequest {
        UnifiedRequest {
            model: "test".to_string(),
            messages: Vec::new(),
            system: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            top_k: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop_sequences: None,
            stream: None,
            tools: None,
            tool_choice: None,
            parallel_tool_calls: None,
            metadata: None,
        }
    }

    fn blank_response(text: &str) -> UnifiedResponse {
        UnifiedResponse {
            id: "test".to_string(),
            model: "test".to_string(),
            choices: vec![crate::messages::unified::UnifiedChoice {
                index: 0,
                message: text_message(UnifiedRole::Assistant, text),
                finish_reason: None,
            }],
            usage: crate::messages::unified::UnifiedUsage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
            },
            created: 0,
            stop_reason: None,
            stop_sequence: None,
        }
    }
}
