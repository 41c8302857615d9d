//! Gemini API integration: wire codecs, request builders, and the client.

mod client;
mod events;
mod parse;
pub mod request;
mod sse;

pub use client::{GeminiClient, ScriptKind};
pub use events::{EventStream, StreamEvent};
pub use parse::strip_code_fence;
pub use request::ImageAttachment;
