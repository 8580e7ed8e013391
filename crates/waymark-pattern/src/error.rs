//! Error types for waymark-pattern

use thiserror::Error;

/// Result type alias for pattern operations
pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while compiling or reversing a pattern
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// A `{` without its closing `}`
    #[error("Unclosed parameter in pattern '{pattern}' at byte {position}")]
    Unclosed { pattern: String, position: usize },

    /// A `}` outside of any parameter
    #[error("Unexpected '}}' in pattern '{pattern}' at byte {position}")]
    UnexpectedBrace { pattern: String, position: usize },

    /// Parameter names must look like identifiers
    #[error("Invalid parameter name '{name}' in pattern '{pattern}'")]
    InvalidName { pattern: String, name: String },

    /// The same parameter name used twice
    #[error("Duplicate parameter '{name}' in pattern '{pattern}'")]
    DuplicateParameter { pattern: String, name: String },

    /// Optional parameters must form a trailing run
    #[error("Optional parameter '{optional}' is followed by required parameter '{required}' in pattern '{pattern}'")]
    OptionalBeforeRequired {
        pattern: String,
        optional: String,
        required: String,
    },

    /// Inline or `where` constraint that is not a valid regex
    #[error("Invalid constraint for parameter '{name}': {source}")]
    InvalidConstraint {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// The assembled matcher failed to compile
    #[error("Invalid matcher for pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Reverse generation without a value for a required parameter
    #[error("Missing required parameter '{name}' for pattern '{pattern}'")]
    MissingParameter { pattern: String, name: String },
}
