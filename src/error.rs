//! Error types for dashkit
//!
//! Two families of errors exist:
//! - configuration errors, raised while an application is being assembled
//!   and fatal to startup
//! - routing/argument errors, raised while serving and recovered by
//!   rendering an error payload in place of the requested content

/// Main dashkit error type
#[derive(Debug, thiserror::Error)]
pub enum DashError {
    /// A module or registry was created without an owner name
    #[error("missing unique name for {0}")]
    MissingName(&'static str),

    /// A name contains characters that cannot appear in a component id
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The same global id was issued twice
    #[error("duplicate id '{0}'")]
    DuplicateId(String),

    /// A navigation shell already holds a page with this name
    #[error("duplicate page '{0}'")]
    DuplicatePage(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// A logical name was resolved before being registered
    #[error("unknown name '{name}' in '{owner}'")]
    UnknownName { owner: String, name: String },

    /// Navigation to a page that does not exist
    #[error("unknown page '{0}'")]
    UnknownPage(String),

    /// Callback invoked with the wrong number of positional arguments
    #[error("expected {expected} callback arguments, got {actual}")]
    ArgumentCountMismatch { expected: usize, actual: usize },

    /// Callback outputs do not cover the declared outputs exactly
    #[error("expected {expected} callback outputs, got {actual}")]
    OutputCountMismatch { expected: usize, actual: usize },

    /// Callback outputs name a pair that is undeclared, duplicated or missing
    #[error("callback output '{pair}' is {problem}")]
    OutputMismatch { pair: String, problem: &'static str },

    /// No callback is registered for the requested handle or outputs
    #[error("no callback registered for {0}")]
    UnknownCallback(String),

    /// A callback handler reported a failure
    #[error("callback failed: {0}")]
    Callback(String),

    /// Export to an external format failed
    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DashError {
    /// Errors that are replaced by a visible error payload instead of
    /// aborting the running server
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DashError::UnknownName { .. }
                | DashError::UnknownPage(_)
                | DashError::ArgumentCountMismatch { .. }
                | DashError::OutputCountMismatch { .. }
                | DashError::OutputMismatch { .. }
                | DashError::UnknownCallback(_)
                | DashError::Callback(_)
        )
    }

    /// Errors raised while assembling an application
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DashError::MissingName(_)
                | DashError::InvalidName { .. }
                | DashError::DuplicateId(_)
                | DashError::DuplicatePage(_)
                | DashError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
