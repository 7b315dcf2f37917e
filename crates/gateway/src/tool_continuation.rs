//! Tool-call continuation: correlates client-provided tool results with the assistant turn
//! that issued them, and repairs requests where that turn is missing from the conversation
//! the gateway was given.

use serde_json::Value;

use crate::messages::unified::{UnifiedContent, UnifiedContentContainer, UnifiedMessage, UnifiedRole};

/// Walk the conversation and make sure every `tool_result` block's `tool_use_id` resolves to
/// a prior assistant `tool_use` block. Ids that don't resolve get a synthesized assistant turn
/// inserted just before the orphaned tool-result message, carrying only that id with empty
/// arguments, so the upstream dialect's invariant ("every tool result answers a tool use")
/// still holds.
pub(crate) fn repair(messages: &mut Vec<UnifiedMessage>, warn_on_duplicate: bool) {
    let mut known_ids: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut seen_calls: Vec<(String, Value)> = Vec::new();
    let mut insertions: Vec<(usize, UnifiedMessage)> = Vec::new();

    for (index, message) in messages.iter().enumerate() {
        let tool_use_ids = tool_use_ids_in(message);

        for (id, name, input) in &tool_use_ids {
            known_ids.insert(id.clone());

            if warn_on_duplicate {
                let canonical = canonicalize(input);
                if seen_calls.iter().any(|(seen_name, seen_input)| seen_name == name && *seen_input == canonical) {
                    log::warn!("duplicate tool call detected: name='{name}' id='{id}' (kept, diagnostic only)");
                }
                seen_calls.push((name.clone(), canonical));
            }
        }

        for orphan_id in tool_result_ids_in(message) {
            if !known_ids.contains(&orphan_id) {
                insertions.push((index, synthesize_assistant_turn(&orphan_id)));
                known_ids.insert(orphan_id);
            }
        }
    }

    // Insert in reverse index order so earlier insertions don't shift the indices of later ones.
    for (index, turn) in insertions.into_iter().rev() {
        messages.insert(index, turn);
    }
}

fn tool_use_ids_in(message: &UnifiedMessage) -> Vec<(String, String, Value)> {
    if message.role != UnifiedRole::Assistant {
        return Vec::new();
    }

    match &message.content {
        UnifiedContentContainer::Text(_) => Vec::new(),
        UnifiedContentContainer::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                UnifiedContent::ToolUse { id, name, input } => Some((id.clone(), name.clone(), input.clone())),
                _ => None,
            })
            .collect(),
    }
}

fn tool_result_ids_in(message: &UnifiedMessage) -> Vec<String> {
    match &message.content {
        UnifiedContentContainer::Text(_) => Vec::new(),
        UnifiedContentContainer::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                UnifiedContent::ToolResult { tool_use_id, .. } => Some(tool_use_id.clone()),
                _ => None,
            })
            .collect(),
    }
}

fn synthesize_assistant_turn(tool_use_id: &str) -> UnifiedMessage {
    UnifiedMessage {
        role: UnifiedRole::Assistant,
        content: UnifiedContentContainer::Blocks(vec![UnifiedContent::ToolUse {
            id: tool_use_id.to_string(),
            name: "unknown".to_string(),
            input: Value::Object(serde_json::Map::new()),
        }]),
        tool_calls: None,
        tool_call_id: None,
    }
}

/// Order-independent canonical form: objects get sorted keys, arrays keep order, primitives
/// are left as-is.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_use(id: &str, name: &str, input: Value) -> UnifiedMessage {
        UnifiedMessage {
            role: UnifiedRole::Assistant,
            content: UnifiedContentContainer::Blocks(vec![UnifiedContent::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }]),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(tool_use_id: &str) -> UnifiedMessage {
        UnifiedMessage {
            role: UnifiedRole::User,
            content: UnifiedContentContainer::Blocks(vec![UnifiedContent::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                content: crate::messages::unified::UnifiedToolResultContent::Text("42".to_string()),
                is_error: None,
            }]),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    #[test]
    fn leaves_matched_tool_results_untouched() {
        let mut messages = vec![tool_use("call_1", "get_weather", json!({"city": "Paris"})), tool_result("call_1")];
        let before = messages.len();

        repair(&mut messages, false);

        assert_eq!(messages.len(), before);
    }

    #[test]
    fn synthesizes_assistant_turn_for_orphaned_tool_result() {
        let mut messages = vec![tool_result("call_unknown")];

        repair(&mut messages, false);

        assert_eq!(messages.len(), 2);
        let UnifiedContentContainer::Blocks(blocks) = &messages[0].content else {
            panic!("expected blocks");
        };
        assert!(matches!(&blocks[0], UnifiedContent::ToolUse { id, .. } if id == "call_unknown"));
    }

    #[test]
    fn canonicalize_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }
}
