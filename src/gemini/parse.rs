//! Tolerant parsing of Gemini response payloads.
//!
//! The wire shape nests generated parts under
//! `candidates[0].content.parts`. Parsing is lenient: a malformed payload
//! yields no events rather than an error, because partial frames and
//! keep-alive noise are normal mid-stream.

use serde_json::Value;

use super::events::StreamEvent;
use crate::tools::ToolCall;

/// Parse one SSE payload into normalized events.
///
/// Text parts become [`StreamEvent::TextDelta`]. At most one function call
/// is taken per payload; the dispatch protocol is strictly one call per
/// model turn, so any extras are ignored.
pub fn parse_stream_chunk(payload: &str) -> Vec<StreamEvent> {
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    let mut saw_call = false;
    for part in candidate_parts(&value) {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                events.push(StreamEvent::TextDelta { text: text.to_string() });
            }
        } else if !saw_call
            && let Some(call) = part.get("functionCall")
            && let Some(name) = call.get("name").and_then(Value::as_str)
        {
            saw_call = true;
            events.push(StreamEvent::FunctionCall {
                call: ToolCall {
                    name: name.to_string(),
                    args: call.get("args").cloned().unwrap_or(Value::Null),
                },
            });
        }
    }
    events
}

/// Concatenate the text parts of a non-streaming response.
pub fn extract_text(value: &Value) -> String {
    candidate_parts(value)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

/// Extract base64 audio data from a speech-generation response.
pub fn extract_inline_audio(value: &Value) -> Option<String> {
    candidate_parts(value).iter().find_map(|part| {
        part.get("inlineData")?
            .get("data")?
            .as_str()
            .map(str::to_string)
    })
}

/// Strip a Markdown code fence wrapping structured output.
///
/// The model sometimes wraps requested JSON in ```` ```json ... ``` ````
/// despite instructions not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn candidate_parts(value: &Value) -> &[Value] {
    value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(parts: Value) -> String {
        json!({"candidates": [{"content": {"parts": parts}}]}).to_string()
    }

    #[test]
    fn text_parts_become_deltas() {
        let events = parse_stream_chunk(&chunk(json!([{"text": "Hello"}, {"text": " there"}])));
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta { text: "Hello".into() },
                StreamEvent::TextDelta { text: " there".into() },
            ]
        );
    }

    #[test]
    fn only_first_function_call_is_taken() {
        let events = parse_stream_chunk(&chunk(json!([
            {"functionCall": {"name": "getCalendarEvents", "args": {}}},
            {"functionCall": {"name": "getHRVStatus", "args": {}}},
        ])));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::FunctionCall { call } if call.name == "getCalendarEvents"
        ));
    }

    #[test]
    fn text_before_call_is_preserved_in_order() {
        let events = parse_stream_chunk(&chunk(json!([
            {"text": "One sec."},
            {"functionCall": {"name": "getHRVStatus", "args": {}}},
        ])));
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::TextDelta { text } if text == "One sec."));
        assert!(matches!(&events[1], StreamEvent::FunctionCall { .. }));
    }

    #[test]
    fn malformed_payload_yields_nothing() {
        assert!(parse_stream_chunk("not json").is_empty());
        assert!(parse_stream_chunk("{\"candidates\": 7}").is_empty());
        assert!(parse_stream_chunk("{}").is_empty());
    }

    #[test]
    fn empty_text_parts_are_skipped() {
        assert!(parse_stream_chunk(&chunk(json!([{"text": ""}]))).is_empty());
    }

    #[test]
    fn extract_text_concatenates_parts() {
        let value = json!({"candidates": [{"content": {"parts": [
            {"text": "A"}, {"text": "B"}
        ]}}]});
        assert_eq!(extract_text(&value), "AB");
    }

    #[test]
    fn inline_audio_is_found() {
        let value = json!({"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "audio/pcm", "data": "QUJD"}}
        ]}}]});
        assert_eq!(extract_inline_audio(&value), Some("QUJD".into()));
        assert_eq!(extract_inline_audio(&json!({})), None);
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("[1]"), "[1]");
    }
}
