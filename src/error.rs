//! Error types for the companion core.

/// Top-level error type for the wellbeing companion.
#[derive(Debug, thiserror::Error)]
pub enum CompanionError {
    /// No API credential configured. Fatal to AI features; callers show a
    /// fixed explanation instead of a retry prompt.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transient network or service failure. Surfaced to the user as one
    /// apologetic chat message; conversation state is preserved for retry.
    #[error("service error: {0}")]
    Service(String),

    /// Speech synthesis or audio decoding failure. Logged and skipped,
    /// never interrupts the text conversation.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Malformed structured output from the model (stress-hotspot JSON,
    /// tool arguments). Swallowed at call sites with best-effort semantics.
    #[error("tool result parse error: {0}")]
    ToolParse(String),

    /// The model requested a tool name outside the dispatch table. This is
    /// a schema mismatch, not a user condition, and always propagates.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Audio device or playback error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Configuration file load/parse error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CompanionError>;
