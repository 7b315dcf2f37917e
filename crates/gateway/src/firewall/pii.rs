//! Regex and remote-NER PII detectors, and the fusion step that merges their spans.

use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A PII type the regex bank or the NER client can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum PiiType {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
    ApiKey,
    Person,
    Location,
    CnIdCard,
    Passport,
}

impl PiiType {
    /// Detector confidence before any context penalty is applied.
    fn base_confidence(self) -> f32 {
        match self {
            PiiType::Email => 0.95,
            PiiType::Phone => 0.8,
            PiiType::Ssn => 0.9,
            PiiType::CreditCard => 0.9,
            PiiType::IpAddress => 0.85,
            PiiType::ApiKey => 0.85,
            PiiType::Person => 0.6,
            PiiType::Location => 0.6,
            PiiType::CnIdCard => 0.9,
            PiiType::Passport => 0.75,
        }
    }

    /// Whether this type gets a reversible surrogate in redact mode, versus a fixed
    /// non-reversible placeholder.
    pub(crate) fn reversible(self) -> bool {
        matches!(
            self,
            PiiType::Email | PiiType::Phone | PiiType::Person | PiiType::CnIdCard | PiiType::Location
        )
    }

    /// Whether a hit of this type on input trips enforce mode regardless of other filters.
    pub(crate) fn is_critical(self) -> bool {
        matches!(self, PiiType::Ssn | PiiType::CreditCard | PiiType::ApiKey | PiiType::CnIdCard)
    }
}

/// Where a span came from, used to break ties deterministically during fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DetectorSource {
    Regex,
    Ner,
}

/// A detected PII occurrence within a piece of text.
#[derive(Debug, Clone)]
pub(crate) struct PiiSpan {
    pub kind: PiiType,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
    pub source: DetectorSource,
}

impl PiiSpan {
    pub(crate) fn text<'a>(&self, haystack: &'a str) -> &'a str {
        &haystack[self.start..self.end]
    }
}

/// Substrings that, when found near a match, suggest it's a documentation example rather
/// than a real value (`"format is ..."`, `"e.g. sk-xxxx"`).
const BENIGN_CONTEXT_MARKERS: &[&str] = &["example", "e.g.", "format is", "sample", "placeholder", "xxxx", "xxx-xx"];

const CONTEXT_WINDOW: usize = 24;
const CONTEXT_PENALTY: f32 = 0.35;

fn context_penalty(text: &str, start: usize) -> f32 {
    let window_start = start.saturating_sub(CONTEXT_WINDOW);
    let window = &text[window_start..start];
    let lower = window.to_ascii_lowercase();

    if BENIGN_CONTEXT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        CONTEXT_PENALTY
    } else {
        0.0
    }
}

struct Pattern {
    kind: PiiType,
    regex: Regex,
}

fn compiled(kind: PiiType, pattern: &str) -> Pattern {
    Pattern {
        kind,
        regex: Regex::new(pattern).expect("static PII pattern must compile"),
    }
}

static GLOBAL_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        compiled(PiiType::Email, r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"),
        compiled(
            PiiType::CreditCard,
            r"\b(?:\d[ -]?){13,16}\b",
        ),
        compiled(
            PiiType::IpAddress,
            r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b",
        ),
        compiled(PiiType::ApiKey, r"\b(?:sk|pk|rk)-[A-Za-z0-9]{16,}\b"),
    ]
});

static US_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        compiled(PiiType::Ssn, r"\b\d{3}-\d{2}-\d{4}\b"),
        compiled(PiiType::Phone, r"\b(?:\+1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b"),
    ]
});

static CN_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![compiled(PiiType::CnIdCard, r"\b\d{17}[\dXx]\b")]
});

/// Run the regex bank over `text`, activating only the locale groups configured.
pub(crate) fn detect_regex(text: &str, locales: &config::LocaleSet, min_confidence: f32) -> Vec<PiiSpan> {
    let mut groups: Vec<&LazyLock<Vec<Pattern>>> = Vec::new();

    if locales.global {
        groups.push(&GLOBAL_PATTERNS);
    }
    if locales.us {
        groups.push(&US_PATTERNS);
    }
    if locales.cn {
        groups.push(&CN_PATTERNS);
    }

    let mut spans = Vec::new();

    for group in groups {
        for pattern in group.iter() {
            for m in pattern.regex.find_iter(text) {
                let confidence = pattern.kind.base_confidence() - context_penalty(text, m.start());

                if confidence >= min_confidence {
                    spans.push(PiiSpan {
                        kind: pattern.kind,
                        start: m.start(),
                        end: m.end(),
                        confidence,
                        source: DetectorSource::Regex,
                    });
                }
            }
        }
    }

    spans
}

/// Wire shape returned by the remote NER service.
#[derive(Debug, Deserialize)]
pub(crate) struct NerResponse {
    pub entities: Vec<NerEntity>,
    #[serde(default)]
    pub redacted_input: Option<String>,
    #[serde(default)]
    pub block: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NerEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

#[derive(Debug, Serialize)]
struct NerRequest<'a> {
    input: &'a str,
}

/// Thin client for the external, Presidio-shaped NER service.
pub(crate) struct NerClient {
    http: reqwest::Client,
    base_url: url::Url,
    timeout: Duration,
}

impl NerClient {
    pub(crate) fn new(config: &config::NerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        }
    }

    /// Call the NER service's `/v1/filter/{direction}` endpoint with a bounded deadline.
    pub(crate) async fn detect(&self, text: &str, direction: &str) -> anyhow::Result<Vec<PiiSpan>> {
        let url = self.base_url.join(&format!("v1/filter/{direction}"))?;

        let response = tokio::time::timeout(
            self.timeout,
            self.http.post(url).json(&NerRequest { input: text }).send(),
        )
        .await??
        .error_for_status()?;

        let body: NerResponse = response.json().await?;

        Ok(body
            .entities
            .into_iter()
            .filter_map(|entity| {
                let kind: PiiType = entity.entity_type.parse().ok()?;
                Some(PiiSpan {
                    kind,
                    start: entity.start,
                    end: entity.end,
                    confidence: entity.score,
                    source: DetectorSource::Ner,
                })
            })
            .collect())
    }
}

/// Union regex and NER spans, deduplicating overlaps deterministically: higher confidence
/// wins, then longer span, then the detector that ran earlier (regex before NER).
pub(crate) fn fuse(mut regex_spans: Vec<PiiSpan>, mut ner_spans: Vec<PiiSpan>) -> Vec<PiiSpan> {
    regex_spans.append(&mut ner_spans);
    let mut spans = regex_spans;

    spans.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then((b.end - b.start).cmp(&(a.end - a.start)))
            .then(source_index(a.source).cmp(&source_index(b.source)))
    });

    let mut kept: Vec<PiiSpan> = Vec::new();

    'next: for span in spans {
        for existing in &kept {
            if span.start < existing.end && existing.start < span.end {
                continue 'next;
            }
        }
        kept.push(span);
    }

    kept.sort_by_key(|span| span.start);
    kept
}

fn source_index(source: DetectorSource) -> u8 {
    match source {
        DetectorSource::Regex => 0,
        DetectorSource::Ner => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales(global: bool, us: bool, cn: bool) -> config::LocaleSet {
        config::LocaleSet { global, us, cn }
    }

    #[test]
    fn detects_email() {
        let spans = detect_regex("contact alice@example.com now", &locales(true, false, false), 0.5);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, PiiType::Email);
    }

    #[test]
    fn applies_context_penalty_for_documentation_examples() {
        let spans = detect_regex(
            "the expected format is alice@example.com in every request",
            &locales(true, false, false),
            0.7,
        );
        assert!(spans.is_empty(), "penalized confidence should drop below threshold");
    }

    #[test]
    fn detects_us_ssn_only_when_locale_enabled() {
        let text = "my ssn is 123-45-6789";
        assert!(detect_regex(text, &locales(true, false, false), 0.5).is_empty());
        assert_eq!(detect_regex(text, &locales(true, true, false), 0.5).len(), 1);
    }

    #[test]
    fn fusion_keeps_higher_confidence_overlap() {
        let low = PiiSpan {
            kind: PiiType::Person,
            start: 0,
            end: 10,
            confidence: 0.5,
            source: DetectorSource::Ner,
        };
        let high = PiiSpan {
            kind: PiiType::Email,
            start: 2,
            end: 8,
            confidence: 0.9,
            source: DetectorSource::Regex,
        };

        let fused = fuse(vec![high], vec![low]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].kind, PiiType::Email);
    }
}
