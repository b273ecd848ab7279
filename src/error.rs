use thiserror::Error;

use crate::domain::Skill;

#[derive(Error, Debug, Clone)]
pub enum AIError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Mock client error: {0}")]
    Mock(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing Gemini API key")]
    MissingKey,
}

#[derive(Error, Debug, Clone)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    /// The request or response body could not be reused or read; a fresh request usually succeeds.
    #[error("Body already consumed: {0}")]
    BodyConsumed(String),
    #[error("Gemini error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum JsonRecoveryError {
    #[error("No JSON in model response")]
    NoJsonFound,
    #[error("JSON parse error: {source}. Candidate: {candidate}")]
    Parse {
        #[source]
        source: serde_json::Error,
        candidate: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Schema mismatch for {skill} content: {reason}")]
    SchemaMismatch { skill: Skill, reason: String },
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("Model output was not recoverable JSON: {0}")]
    Json(#[from] JsonRecoveryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Model returned no usable lessons")]
    EmptySection,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored value is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
