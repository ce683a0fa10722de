//! Typed errors for the post pipeline and its collaborators.

use thiserror::Error;

/// Failures reported by an article generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Missing API key or invalid client settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the generation API
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API answered but produced no text
    #[error("Generation API returned no text")]
    EmptyResponse,

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Reasons a post could not be assembled.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Generated article is empty")]
    GenerationEmpty,

    #[error("Generated article is too short ({length} characters, minimum {minimum})")]
    GenerationTooShort { length: usize, minimum: usize },

    #[error("No article generator is configured")]
    GeneratorUnavailable,

    #[error("Article generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Violations of the post collection's rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("A post with id '{0}' already exists")]
    DuplicateId(String),

    #[error("No post at index {index} (collection has {len} posts)")]
    IndexOutOfRange { index: usize, len: usize },
}
