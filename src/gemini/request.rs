//! Request-body builders for the Gemini generate-content API.

use serde_json::{Value, json};

use crate::model::{Message, Sender};
use crate::tools::ToolCall;

/// An image attached to a user turn.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Convert transcript history to wire `contents`.
///
/// Empty AI placeholders (streaming slots that never received text) are
/// skipped; the API rejects empty parts.
pub fn contents_from_history(history: &[Message]) -> Vec<Value> {
    history
        .iter()
        .filter(|m| !m.is_empty_placeholder())
        .map(|m| {
            let role = match m.sender {
                Sender::User => "user",
                Sender::Ai => "model",
            };
            json!({"role": role, "parts": [{"text": m.text}]})
        })
        .collect()
}

/// Build the latest user turn, with any image part ahead of the text.
pub fn user_turn(text: &str, image: Option<&ImageAttachment>) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = image {
        parts.push(json!({
            "inlineData": {"mimeType": image.mime_type, "data": image.data}
        }));
    }
    parts.push(json!({"text": text}));
    json!({"role": "user", "parts": parts})
}

/// Echo the model's own tool request back into the context.
pub fn model_function_call_turn(call: &ToolCall) -> Value {
    json!({
        "role": "model",
        "parts": [{"functionCall": {"name": call.name, "args": call.args}}]
    })
}

/// Wrap a tool result as a function-response turn.
pub fn function_response_turn(name: &str, result: Value) -> Value {
    json!({
        "role": "function",
        "parts": [{"functionResponse": {"name": name, "response": {"content": result}}}]
    })
}

/// Chat request body, optionally advertising the tool declarations.
pub fn chat_body(contents: Vec<Value>, system_instruction: &str, tools: Option<Value>) -> Value {
    let mut body = json!({
        "contents": contents,
        "systemInstruction": {"parts": [{"text": system_instruction}]},
    });
    if let Some(tools) = tools {
        body["tools"] = json!([{"functionDeclarations": tools}]);
    }
    body
}

/// One-shot request body asking for structured JSON output.
pub fn json_body(prompt: &str, system_instruction: &str) -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "systemInstruction": {"parts": [{"text": system_instruction}]},
        "generationConfig": {"responseMimeType": "application/json"},
    })
}

/// One-shot request body for plain-text generation.
pub fn text_body(prompt: &str, system_instruction: &str) -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "systemInstruction": {"parts": [{"text": system_instruction}]},
    })
}

/// Speech-synthesis request body for a prebuilt voice.
pub fn speech_body(text: &str, voice: &str) -> Value {
    json!({
        "contents": [{"parts": [{"text": text}]}],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": voice}}
            }
        },
    })
}
