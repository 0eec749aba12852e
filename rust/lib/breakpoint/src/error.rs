use thiserror::Error;

/// Error returned by a user-supplied transition callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Hosts match on these,
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const CALLBACK_FAILED: &str = "CALLBACK_FAILED";
    pub const ALREADY_LISTENING: &str = "ALREADY_LISTENING";
    pub const INVALID_MANIFEST: &str = "INVALID_MANIFEST";
}

#[derive(Error, Debug)]
pub enum BreakpointError {
    /// Registration input is missing, empty, or inconsistent.
    #[error("invalid watch set: {0}")]
    Validation(String),

    /// The namespace is already registered (under any dimension).
    #[error("namespace already registered: {0}")]
    DuplicateNamespace(String),

    /// A transition callback reported a failure.
    #[error("callback for '{namespace}' failed: {source}")]
    Callback {
        namespace: String,
        #[source]
        source: CallbackError,
    },

    /// The resize listener is already running.
    #[error("resize listener already attached")]
    AlreadyListening,

    /// A declarative manifest could not be parsed.
    #[error("invalid manifest: {0}")]
    Manifest(String),
}

impl BreakpointError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            BreakpointError::Validation(_) => error_code::VALIDATION_FAILED,
            BreakpointError::DuplicateNamespace(_) => error_code::ALREADY_EXISTS,
            BreakpointError::Callback { .. } => error_code::CALLBACK_FAILED,
            BreakpointError::AlreadyListening => error_code::ALREADY_LISTENING,
            BreakpointError::Manifest(_) => error_code::INVALID_MANIFEST,
        }
    }
}

impl From<serde_json::Error> for BreakpointError {
    fn from(e: serde_json::Error) -> Self {
        BreakpointError::Manifest(e.to_string())
    }
}
