//! Agent decision parsing.
//!
//! The model is asked for one JSON object per turn: a direct reply, a
//! read-only tool call, or an order proposal with structured items. Real
//! model output is messy (code fences, surrounding prose, truncation), so
//! parsing is layered: fenced JSON first, then the whole response, then the
//! first balanced object, and finally the raw text as a direct reply.

use forno_session::OrderItem;
use serde_json::Value;

/// What the model decided to do with a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    /// Answer the user directly.
    Reply { text: String },
    /// Invoke a tool by name.
    ToolCall {
        thought: String,
        tool: String,
        args: Value,
    },
    /// Suggest an order and ask the user to confirm it.
    ProposeOrder { reply: String, items: Vec<OrderItem> },
}

/// Parse raw model output into a decision.
///
/// Never fails: output that doesn't contain a recognizable JSON decision
/// becomes a direct reply carrying the raw text.
pub fn parse_decision(raw: &str) -> AgentDecision {
    for block in extract_json_blocks(raw) {
        if let Some(decision) = decision_from_json(&block) {
            return decision;
        }
    }

    let trimmed = raw.trim();
    if let Some(decision) = decision_from_json(trimmed) {
        return decision;
    }

    if let Some(start) = trimmed.find('{') {
        let rest = &trimmed[start..];
        if let Some(end) = find_matching_brace(rest) {
            if let Some(decision) = decision_from_json(&rest[..=end]) {
                return decision;
            }
        }
    }

    tracing::debug!("Model output carried no JSON decision, treating as direct reply");
    AgentDecision::Reply {
        text: trimmed.to_string(),
    }
}

fn decision_from_json(json: &str) -> Option<AgentDecision> {
    let value: Value = serde_json::from_str(json).ok()?;
    let obj = value.as_object()?;

    if let Some(tool) = obj.get("tool").and_then(Value::as_str) {
        let thought = obj
            .get("thought")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let args = obj
            .get("tool_input")
            .or_else(|| obj.get("args"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        return Some(AgentDecision::ToolCall {
            thought,
            tool: tool.to_string(),
            args,
        });
    }

    let reply = obj.get("reply").and_then(Value::as_str)?.to_string();

    let items = obj
        .get("proposed_order")
        .and_then(|p| p.get("items"))
        .map(parse_items)
        .unwrap_or_default();

    if items.is_empty() {
        Some(AgentDecision::Reply { text: reply })
    } else {
        Some(AgentDecision::ProposeOrder { reply, items })
    }
}

/// Lenient item-list parsing: entries that don't match the draft item shape
/// are dropped rather than failing the whole decision.
pub(crate) fn parse_items(value: &Value) -> Vec<OrderItem> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Extract JSON blocks from markdown code fences.
fn extract_json_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find("```json") {
        let after_marker = &remaining[start + 7..];
        // Skip optional newline after ```json
        let content_start = usize::from(after_marker.starts_with('\n'));

        if let Some(end) = after_marker[content_start..].find("```") {
            let json_content = &after_marker[content_start..content_start + end];
            blocks.push(json_content.trim().to_string());
            remaining = &after_marker[content_start + end + 3..];
        } else {
            // Incomplete block - try to salvage
            let json_content = after_marker[content_start..].trim();
            if !json_content.is_empty() {
                blocks.push(json_content.to_string());
            }
            break;
        }
    }

    blocks
}

/// Find the index of the matching closing brace.
fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }

        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
