//! OpenAI provider output: the wire response already matches the canonical `messages::openai`
//! shapes, so only the streaming chunk needs a borrowed, zero-copy deserialization path.

use serde::Deserialize;

use crate::messages::{openai, unified};

pub(crate) use crate::messages::openai::ChatCompletionResponse as OpenAIResponse;

/// A single `data:` line of an OpenAI chat-completion SSE stream, borrowed from the event
/// buffer to avoid allocating for fields the gateway only forwards.
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIStreamChunk<'a> {
    pub id: &'a str,
    pub created: u64,
    pub model: &'a str,
    #[serde(default)]
    pub system_fingerprint: Option<&'a str>,
    #[serde(borrow)]
    pub choices: Vec<OpenAIStreamChoice<'a>>,
    #[serde(default)]
    pub usage: Option<openai::Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAIStreamChoice<'a> {
    pub index: u32,
    #[serde(borrow)]
    pub delta: OpenAIStreamDelta<'a>,
    #[serde(default)]
    pub finish_reason: Option<openai::FinishReason>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAIStreamDelta<'a> {
    #[serde(default)]
    pub role: Option<openai::ChatRole>,
    #[serde(default)]
    pub content: Option<&'a str>,
    #[serde(default)]
    pub tool_calls: Option<Vec<openai::StreamingToolCall>>,
}

impl<'a> OpenAIStreamChunk<'a> {
    /// Converts a borrowed wire chunk into an owned, provider-prefixed `UnifiedChunk`.
    pub(crate) fn into_chunk(self, provider_name: &str) -> unified::UnifiedChunk {
        let choices = self
            .choices
            .into_iter()
            .map(|choice| openai::ChatChoiceDelta {
                index: choice.index,
                logprobs: None,
                delta: openai::ChatMessageDelta {
                    role: choice.delta.role,
                    content: choice.delta.content.map(str::to_string),
                    function_call: None,
                    tool_calls: choice.delta.tool_calls,
                },
                finish_reason: choice.finish_reason,
            })
            .collect();

        let chunk = openai::ChatCompletionChunk {
            id: self.id.to_string(),
            object: openai::ObjectType::ChatCompletionChunk,
            created: self.created,
            model: format!("{provider_name}/{}", self.model),
            system_fingerprint: self.system_fingerprint.map(str::to_string),
            choices,
            usage: self.usage,
        };

        unified::UnifiedChunk::from(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_delta_chunk() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": "hi"},
                "finish_reason": null
            }]
        }"#;

        let chunk: OpenAIStreamChunk<'_> = serde_json::from_str(json).unwrap();
        let unified_chunk = chunk.into_chunk("openai");
        assert_eq!(unified_chunk.model.as_ref(), "openai/gpt-4o-mini");
    }
}
