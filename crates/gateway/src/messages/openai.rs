//! OpenAI Chat Completions wire format.
//!
//! Mirrors the request/response/streaming-chunk shapes documented at
//! <https://platform.openai.com/docs/api-reference/chat>. Kept intentionally tolerant of
//! forward-compatible additions (unknown enum values round-trip through the `Other` variants
//! instead of failing deserialization).

use serde::{Deserialize, Serialize, Serializer};

/// JSON Schema document describing a tool's parameters.
///
/// Schemas are forwarded opaquely between dialects; the gateway never validates or
/// introspects their contents.
pub type JsonSchema = serde_json::Value;

/// Request body for the Chat Completions endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier, e.g. `"gpt-4o"`.
    pub model: String,
    /// Conversation so far, including an optional leading system message.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Penalizes tokens based on their frequency so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Penalizes tokens that have appeared at all so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Sequences that stop generation when produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Whether to stream the response as Server-Sent Events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// Controls whether/which tool the model must call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether the model may call multiple tools in one turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
}

/// Role of a message's author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRole {
    /// System instructions, usually the first message.
    System,
    /// End-user message.
    User,
    /// Prior model output.
    Assistant,
    /// Result of a tool call, referencing `tool_call_id`.
    Tool,
    /// Any role not recognized above, preserved verbatim.
    Other(String),
}

impl Serialize for ChatRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
            ChatRole::Other(s) => s.as_str(),
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for ChatRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "system" => ChatRole::System,
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            "tool" => ChatRole::Tool,
            _ => ChatRole::Other(s),
        })
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    /// Who authored this message.
    pub role: ChatRole,
    /// Plain text content. `None` when the message carries only tool calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls the assistant requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// For `role: "tool"` messages, the id of the call this responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Discriminator for tool call/definition kinds. OpenAI only defines `function`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallType {
    /// The only kind OpenAI currently supports.
    Function,
}

/// A completed tool call emitted by the assistant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCall {
    /// Unique identifier for this call, echoed back in the matching tool result message.
    pub id: String,
    /// Always [`ToolCallType::Function`].
    #[serde(rename = "type")]
    pub tool_type: ToolCallType,
    /// Which function was called and with what arguments.
    pub function: FunctionCall,
}

/// Function name and arguments for a completed tool call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as a JSON-encoded string (not a parsed value).
    pub arguments: String,
}

/// A tool definition offered to the model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    /// Always [`ToolCallType::Function`].
    #[serde(rename = "type")]
    pub tool_type: ToolCallType,
    /// The function's name, description, and parameter schema.
    pub function: FunctionDefinition,
}

/// Function name, description, and parameter schema for a tool definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// Description shown to the model to help it decide when to call this.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Box<JsonSchema>,
}

/// Bare string forms of [`ToolChoice`]: `"none"`, `"auto"`, `"required"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoiceMode {
    /// The model must not call any tool.
    None,
    /// The model may call a tool if it decides to.
    Auto,
    /// The model must call at least one tool.
    Required,
    /// Legacy alias for `Required` used by some clients.
    Any,
    /// Any value not recognized above.
    Other(String),
}

impl Serialize for ToolChoiceMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            ToolChoiceMode::None => "none",
            ToolChoiceMode::Auto => "auto",
            ToolChoiceMode::Required => "required",
            ToolChoiceMode::Any => "any",
            ToolChoiceMode::Other(s) => s.as_str(),
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for ToolChoiceMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "none" => ToolChoiceMode::None,
            "auto" => ToolChoiceMode::Auto,
            "required" => ToolChoiceMode::Required,
            "any" => ToolChoiceMode::Any,
            _ => ToolChoiceMode::Other(s),
        })
    }
}

/// Function name used to pin the model to one specific tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolChoiceFunction {
    /// The tool's name.
    pub name: String,
}

/// `tool_choice` field: either a bare mode string or an object naming one tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// `"none"` / `"auto"` / `"required"`.
    Mode(ToolChoiceMode),
    /// `{"type": "function", "function": {"name": "..."}}`.
    Specific {
        /// Always [`ToolCallType::Function`].
        #[serde(rename = "type")]
        tool_type: ToolCallType,
        /// The forced tool.
        function: ToolChoiceFunction,
    },
}

/// `object` discriminator shared by completions, chunks, models, and model lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ObjectType {
    /// A complete (non-streaming) chat completion.
    #[serde(rename = "chat.completion")]
    ChatCompletion,
    /// One chunk of a streamed chat completion.
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
    /// A model description.
    #[serde(rename = "model")]
    Model,
    /// A list of models.
    #[serde(rename = "list")]
    List,
}

/// Why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Generation reached a natural end or a stop sequence.
    Stop,
    /// Generation hit `max_tokens`.
    Length,
    /// Output was truncated by a content filter.
    ContentFilter,
    /// The model chose to call one or more tools instead of finishing.
    ToolCalls,
    /// Any value not recognized above.
    Other(String),
}

impl Serialize for FinishReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Other(s) => s.as_str(),
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            "tool_calls" => FinishReason::ToolCalls,
            _ => FinishReason::Other(s),
        })
    }
}

/// Token usage for a request.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Sum of the two.
    pub total_tokens: u32,
}

/// One choice in a non-streaming completion. OpenAI allows `n > 1`; the gateway always
/// returns exactly one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    /// Index of this choice, always `0` for gateway responses.
    pub index: u32,
    /// The generated message.
    pub message: ChatMessage,
    /// Why generation stopped for this choice.
    pub finish_reason: FinishReason,
}

/// Non-streaming response from the Chat Completions endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    /// Completion id, `chatcmpl-...`.
    pub id: String,
    /// Always [`ObjectType::ChatCompletion`].
    pub object: ObjectType,
    /// Unix timestamp when generation started.
    pub created: u64,
    /// Model that produced this response (may differ from the requested alias).
    pub model: String,
    /// Generated choices, always length 1 from this gateway.
    pub choices: Vec<ChatChoice>,
    /// Token usage for the whole request.
    pub usage: Usage,
}

/// Start of a streamed tool call, or an incremental update to one already started.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StreamingToolCall {
    /// First chunk for a tool call: carries its id, type, and function name.
    Start {
        /// Index of this tool call within the choice's `tool_calls` array.
        index: usize,
        /// Unique identifier for this call.
        id: String,
        /// Always [`ToolCallType::Function`].
        r#type: ToolCallType,
        /// Name and (usually empty) initial arguments fragment.
        function: FunctionStart,
    },
    /// Subsequent chunk appending to a tool call's arguments.
    Delta {
        /// Index matching a previously started tool call.
        index: usize,
        /// Incremental arguments fragment.
        function: FunctionDelta,
    },
}

/// Function name and initial arguments fragment for a newly started streaming tool call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionStart {
    /// The function being called.
    pub name: String,
    /// Usually empty; arguments arrive via subsequent [`FunctionDelta`]s.
    pub arguments: String,
}

/// Incremental arguments fragment for an in-progress streaming tool call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionDelta {
    /// Fragment to append to the accumulated arguments string.
    pub arguments: String,
}

/// Incremental content for one choice within a streamed chunk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatMessageDelta {
    /// Present only on the first chunk of a choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatRole>,
    /// Text fragment to append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Deprecated pre-tools function-call delta, never populated by this gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<serde_json::Value>,
    /// Tool call deltas for this chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<StreamingToolCall>>,
}

/// One choice within a streamed chunk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoiceDelta {
    /// Index of this choice, always `0`.
    pub index: u32,
    /// Token log probabilities; never populated by this gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<serde_json::Value>,
    /// The incremental content.
    pub delta: ChatMessageDelta,
    /// Set on the final chunk for this choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// One `data:` event of a streamed chat completion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionChunk {
    /// Same id across every chunk of one completion.
    pub id: String,
    /// Always [`ObjectType::ChatCompletionChunk`].
    pub object: ObjectType,
    /// Unix timestamp, constant across chunks.
    pub created: u64,
    /// Model that produced this response.
    pub model: String,
    /// Backend fingerprint; not populated by this gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    /// Per-choice incremental content.
    pub choices: Vec<ChatChoiceDelta>,
    /// Present only on the final chunk, when the client requested `stream_options`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// A model available for use.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Model {
    /// Model identifier used in requests.
    pub id: String,
    /// Always [`ObjectType::Model`].
    pub object: ObjectType,
    /// Unix timestamp the model was created, or `0` if unknown.
    pub created: u64,
    /// Owning organization, e.g. `"openai"`, `"anthropic"`.
    pub owned_by: String,
}

/// Response for `GET /v1/models`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsResponse {
    /// Always [`ObjectType::List`].
    pub object: ObjectType,
    /// Available models.
    pub data: Vec<Model>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn chat_role_roundtrips_unknown_variants() {
        let role: ChatRole = serde_json::from_value(json!("developer")).unwrap();
        assert_eq!(role, ChatRole::Other("developer".to_string()));
        assert_eq!(serde_json::to_value(&role).unwrap(), json!("developer"));
    }

    #[test]
    fn tool_choice_deserializes_bare_mode() {
        let choice: ToolChoice = serde_json::from_value(json!("auto")).unwrap();
        assert!(matches!(choice, ToolChoice::Mode(ToolChoiceMode::Auto)));
    }

    #[test]
    fn tool_choice_deserializes_specific() {
        let choice: ToolChoice = serde_json::from_value(json!({
            "type": "function",
            "function": {"name": "get_weather"}
        }))
        .unwrap();

        let ToolChoice::Specific { function, .. } = choice else {
            unreachable!("expected specific tool choice");
        };
        assert_eq!(function.name, "get_weather");
    }

    #[test]
    fn streaming_tool_call_distinguishes_start_from_delta() {
        let start: StreamingToolCall = serde_json::from_value(json!({
            "index": 0,
            "id": "call_1",
            "type": "function",
            "function": {"name": "get_weather", "arguments": ""}
        }))
        .unwrap();
        assert!(matches!(start, StreamingToolCall::Start { .. }));

        let delta: StreamingToolCall = serde_json::from_value(json!({
            "index": 0,
            "function": {"arguments": "{\"loc"}
        }))
        .unwrap();
        assert!(matches!(delta, StreamingToolCall::Delta { .. }));
    }
}
