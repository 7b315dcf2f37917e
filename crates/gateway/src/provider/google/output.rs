//! Response shapes for Google Gemini's `generateContent` and `streamGenerateContent` endpoints.
//!
//! [`GoogleContent`]/[`GooglePart`] are shared between request and response bodies (Gemini
//! echoes conversation turns back in the same shape it accepts them), so they live here rather
//! than in `input`, which imports them.

use serde::{Deserialize, Serialize};

use crate::messages::{openai, unified};

/// Author of a piece of content: the caller (`user`) or the model (`model`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoogleRole {
    User,
    Model,
}

/// A single conversation turn: one or more parts sharing a role.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleContent {
    #[serde(default)]
    pub parts: Vec<GooglePart>,
    pub role: GoogleRole,
}

/// One piece of a [`GoogleContent`] turn.
///
/// Exactly one of `text`, `function_call`, or `function_response` is set per Gemini's contract,
/// but the API doesn't enforce that structurally, so all three stay optional here.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<GoogleFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<GoogleFunctionResponse>,
}

/// A model-issued request to call a function.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
    /// Gemini 2.5's internal reasoning token bound to this call, echoed back opaquely on the
    /// next turn. Absent for earlier model families.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

/// The caller's answer to a [`GoogleFunctionCall`], sent back as a `user`-role part.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleFunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// Why the model stopped generating for a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleFinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl<'de> Deserialize<'de> for GoogleFinishReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            _ => Self::Other(raw),
        })
    }
}

impl From<GoogleFinishReason> for openai::FinishReason {
    fn from(reason: GoogleFinishReason) -> Self {
        match reason {
            GoogleFinishReason::Stop => Self::Stop,
            GoogleFinishReason::MaxTokens => Self::Length,
            GoogleFinishReason::Safety | GoogleFinishReason::Recitation => Self::ContentFilter,
            GoogleFinishReason::Other(raw) => Self::Other(raw),
        }
    }
}

/// Token accounting for a single `generateContent` call.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

/// One generated alternative. Gemini supports `candidateCount > 1`; the gateway only ever
/// requests and forwards the first.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCandidate {
    #[serde(default)]
    pub content: GoogleContent,
    #[serde(default)]
    pub finish_reason: Option<GoogleFinishReason>,
    #[serde(default)]
    pub index: Option<i32>,
}

impl Default for GoogleContent {
    fn default() -> Self {
        Self {
            parts: Vec::new(),
            role: GoogleRole::Model,
        }
    }
}

/// Full, non-streaming response from `generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerateResponse {
    #[serde(default)]
    pub candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GoogleUsageMetadata>,
    #[serde(default)]
    pub model_version: Option<String>,
}

fn content_text(content: &GoogleContent) -> String {
    content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

fn content_tool_calls(content: &GoogleContent) -> Option<Vec<openai::ToolCall>> {
    let calls: Vec<openai::ToolCall> = content
        .parts
        .iter()
        .filter_map(|part| part.function_call.as_ref())
        .enumerate()
        .map(|(index, call)| openai::ToolCall {
            id: format!("call_{index}"),
            tool_type: openai::ToolCallType::Function,
            function: openai::FunctionCall {
                name: call.name.clone(),
                arguments: serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_string()),
            },
        })
        .collect();

    if calls.is_empty() { None } else { Some(calls) }
}

impl From<GoogleGenerateResponse> for openai::ChatCompletionResponse {
    fn from(response: GoogleGenerateResponse) -> Self {
        let created = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let usage = response.usage_metadata.unwrap_or_default();

        let choices = response
            .candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let text = content_text(&candidate.content);
                let tool_calls = content_tool_calls(&candidate.content);

                openai::ChatChoice {
                    index: index as u32,
                    message: openai::ChatMessage {
                        role: openai::ChatRole::Assistant,
                        content: if text.is_empty() { None } else { Some(text) },
                        tool_calls,
                        tool_call_id: None,
                    },
                    finish_reason: candidate
                        .finish_reason
                        .clone()
                        .map(openai::FinishReason::from)
                        .unwrap_or(openai::FinishReason::Stop),
                }
            })
            .collect();

        Self {
            id: format!("gemini-{created}"),
            object: openai::ObjectType::ChatCompletion,
            created,
            model: String::new(),
            choices,
            usage: openai::Usage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
        }
    }
}

impl From<GoogleGenerateResponse> for unified::UnifiedResponse {
    fn from(response: GoogleGenerateResponse) -> Self {
        Self::from(openai::ChatCompletionResponse::from(response))
    }
}

/// One event of a `streamGenerateContent?alt=sse` response.
///
/// Gemini streams whole, non-cumulative `GoogleCandidate` snapshots per part rather than
/// OpenAI-style incremental deltas, so each chunk carries the full text fragment generated since
/// the last event rather than a running total.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleStreamChunk {
    #[serde(default)]
    pub candidates: Vec<GoogleCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GoogleUsageMetadata>,
}

impl GoogleStreamChunk {
    /// Converts this chunk into an OpenAI-shaped streaming delta for the unified pipeline.
    pub fn into_chunk(self, provider_name: &str, model_name: &str) -> openai::ChatCompletionChunk {
        let created = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let choices = self
            .candidates
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let text = content_text(&candidate.content);
                let function_calls: Vec<&GoogleFunctionCall> =
                    candidate.content.parts.iter().filter_map(|part| part.function_call.as_ref()).collect();

                let tool_calls = if function_calls.is_empty() {
                    None
                } else {
                    Some(
                        function_calls
                            .into_iter()
                            .enumerate()
                            .map(|(tool_index, call)| openai::StreamingToolCall::Start {
                                index: tool_index,
                                id: format!("call_{tool_index}"),
                                r#type: openai::ToolCallType::Function,
                                function: openai::FunctionStart {
                                    name: call.name.clone(),
                                    arguments: serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_string()),
                                },
                            })
                            .collect(),
                    )
                };

                openai::ChatChoiceDelta {
                    index: index as u32,
                    logprobs: None,
                    delta: openai::ChatMessageDelta {
                        role: None,
                        content: if text.is_empty() { None } else { Some(text) },
                        function_call: None,
                        tool_calls,
                    },
                    finish_reason: candidate.finish_reason.map(openai::FinishReason::from),
                }
            })
            .collect();

        openai::ChatCompletionChunk {
            id: format!("gemini-{provider_name}-{created}"),
            object: openai::ObjectType::ChatCompletionChunk,
            created,
            model: format!("{provider_name}/{model_name}"),
            system_fingerprint: None,
            choices,
            usage: self.usage_metadata.map(|usage| openai::Usage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_text_response() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "hello"}], "role": "model"},
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7}
        }"#;

        let response: GoogleGenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(content_text(&response.candidates[0].content), "hello");
        assert_eq!(response.candidates[0].finish_reason, Some(GoogleFinishReason::Stop));
    }

    #[test]
    fn deserializes_function_call_part() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"functionCall": {"name": "get_weather", "args": {"city": "nyc"}}}],
                    "role": "model"
                }
            }]
        }"#;

        let response: GoogleGenerateResponse = serde_json::from_str(json).unwrap();
        let tool_calls = content_tool_calls(&response.candidates[0].content).unwrap();
        assert_eq!(tool_calls[0].function.name, "get_weather");
    }

    #[test]
    fn unknown_finish_reason_round_trips_as_other() {
        let json = r#"{"candidates":[{"content":{"parts":[],"role":"model"},"finishReason":"OTHER_NEW_REASON"}]}"#;
        let response: GoogleGenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.candidates[0].finish_reason,
            Some(GoogleFinishReason::Other("OTHER_NEW_REASON".to_string()))
        );
    }
}
