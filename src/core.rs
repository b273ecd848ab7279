//! Model-calling core: the low-level client trait, an explicit retry policy, and
//! `ModelClient`, which applies the policy.

use std::collections::HashSet;
use std::fmt::Debug;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::error::{AIError, ConfigError, GeminiError};

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which sends one prompt and returns the raw
/// completion text. Retrying happens in `ModelClient`.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// The only method that implementations must provide
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}

/// Coarse classification of client failures, used by `RetryPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingKey,
    BodyConsumed,
    Http,
    Upstream,
    RateLimit,
    Authentication,
    Decode,
    Mock,
}

impl AIError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AIError::Config(ConfigError::MissingKey) => ErrorKind::MissingKey,
            AIError::Gemini(GeminiError::BodyConsumed(_)) => ErrorKind::BodyConsumed,
            AIError::Gemini(GeminiError::Http(_)) => ErrorKind::Http,
            AIError::Gemini(GeminiError::Upstream { .. }) => ErrorKind::Upstream,
            AIError::Gemini(GeminiError::RateLimit) => ErrorKind::RateLimit,
            AIError::Gemini(GeminiError::Authentication) => ErrorKind::Authentication,
            AIError::Gemini(GeminiError::Decode(_)) => ErrorKind::Decode,
            AIError::Mock(_) => ErrorKind::Mock,
        }
    }

    #[must_use]
    pub fn is_missing_key(&self) -> bool {
        self.kind() == ErrorKind::MissingKey
    }
}

/// How many times a prompt may be sent, and which failures earn another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub retryable: HashSet<ErrorKind>,
}

impl Default for RetryPolicy {
    /// One extra attempt, only for the transient body-reuse failure.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retryable: HashSet::from([ErrorKind::BodyConsumed]),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, nothing retried.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            retryable: HashSet::new(),
        }
    }

    #[must_use]
    pub fn should_retry(&self, error: &AIError, attempt: usize) -> bool {
        attempt < self.max_attempts && self.retryable.contains(&error.kind())
    }
}

/// Wraps a `LowLevelClient` with a retry policy.
#[derive(Debug, Clone)]
pub struct ModelClient<C: LowLevelClient> {
    client: C,
    policy: RetryPolicy,
}

impl<C: LowLevelClient> ModelClient<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        info!(max_attempts = policy.max_attempts, "Creating new ModelClient");
        Self { client, policy }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Send a prompt and return the completion text, retrying per policy.
    #[instrument(target = "lesson_forge::model", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn send(&self, prompt: &str) -> Result<String, AIError> {
        let mut attempt = 1;
        loop {
            match self.client.ask_raw(prompt.to_string()).await {
                Ok(text) => {
                    debug!(attempt, response_len = text.len(), "model call succeeded");
                    return Ok(text);
                }
                Err(e) if self.policy.should_retry(&e, attempt) => {
                    warn!(attempt, error = %e, "transient model failure; retrying with a fresh request");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "model call failed");
                    return Err(e);
                }
            }
        }
    }
}
