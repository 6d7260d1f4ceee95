use thiserror::Error;

/// Main error type for the Glint acquisition engine.
#[derive(Error, Debug)]
pub enum GlintError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to parse model response: {response}")]
    Parse { response: String },

    #[error("No observed configurations or performance values provided")]
    EmptyObservations,

    #[error(
        "Model failed to generate sufficient candidate points after {attempts} attempts \
         ({raw_candidates} raw candidates on the final attempt)"
    )]
    GenerationExhausted {
        attempts: usize,
        raw_candidates: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Row has {got} values but table has {expected} columns")]
    ColumnCount { expected: usize, got: usize },

    #[error("Missing column: {name}")]
    MissingColumn { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the text-generation transport collaborator. A single
/// failed request never aborts a dispatch batch; the slot is recorded empty.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection to model backend failed: {message}")]
    ConnectionFailed { message: String },

    #[error("model backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed backend reply: {message}")]
    MalformedReply { message: String },
}

/// Result type alias for Glint operations.
pub type GlintResult<T> = Result<T, GlintError>;
