//! Normalized events produced by a Gemini generation stream.

use std::pin::Pin;

use futures_util::Stream;

use crate::error::Result;
use crate::tools::ToolCall;

/// One normalized event from a streaming generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental visible text.
    TextDelta { text: String },
    /// The model requested a tool invocation. Terminal for the current
    /// stream; the orchestrator dispatches and opens a continuation.
    FunctionCall { call: ToolCall },
}

/// A boxed stream of normalized events. Transport failures surface as
/// `Err` items and end consumption.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;
