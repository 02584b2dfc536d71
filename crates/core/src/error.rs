//! Error types for the Parlance domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context (model client, functions, plugins, templates) has its
//! own enum; all of them convert into the top-level [`Error`].

use thiserror::Error;

/// The top-level error type for all Parlance operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model client errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Dispatch errors ---
    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    // --- Plugin errors ---
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    // --- Template errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- History validation ---
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // --- Recursive re-invocation guard ---
    #[error("Model re-invocation exceeded the maximum depth of {limit}")]
    MaxDepthExceeded { limit: u32 },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// The failure categories a model client can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Detected before any network call; retrying cannot help.
    Configuration,
    /// The request never produced an HTTP response.
    Transport,
    /// The endpoint answered, but not with a usable completion.
    Protocol,
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API request failed with status {status_code}: {body}")]
    Status { status_code: u16, body: String },

    #[error("Malformed response: {reason} (body: {body})")]
    MalformedResponse { reason: String, body: String },
}

impl ProviderError {
    /// Classify this error into one of the three reportable categories.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured(_) => FailureKind::Configuration,
            Self::Network(_) | Self::Timeout(_) => FailureKind::Transport,
            Self::Status { .. } | Self::MalformedResponse { .. } => FailureKind::Protocol,
        }
    }
}

#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {function_name}: {reason}")]
    InvalidArguments {
        function_name: String,
        reason: String,
    },

    #[error("Function execution failed: {function_name}: {reason}")]
    ExecutionFailed {
        function_name: String,
        reason: String,
    },

    #[error("Function failed to initialize: {function_name}: {reason}")]
    Init {
        function_name: String,
        reason: String,
    },

    #[error("Function failed to close: {function_name}: {reason}")]
    Close {
        function_name: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{plugin} failed to convert input: {reason}")]
    ConvertInput { plugin: String, reason: String },

    #[error("{plugin} failed to convert output: {reason}")]
    ConvertOutput { plugin: String, reason: String },

    #[error("Input of type {kind} was not converted to text by any plugin")]
    UnconvertedInput { kind: String },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template: {0}")]
    Invalid(String),

    #[error("Render failed: {0}")]
    Render(String),
}
