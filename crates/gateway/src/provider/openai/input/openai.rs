//! OpenAI provider input: the unified request already converts directly into the wire format.

pub(crate) use crate::messages::openai::ChatCompletionRequest as OpenAIRequest;
