use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::gemini::{GeminiClient, GeminiConfig};
use crate::clients::mock::{MockClient, MockHandle, MockResponse};
use crate::config::Settings;
use crate::core::LowLevelClient;
use crate::error::AIError;

/// Which backend a `FlexibleClient` should wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientType {
    Gemini,
    Mock,
}

impl ClientType {
    /// Parse client type from string (case insensitive)
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown client type: '{}'. Supported: gemini, mock", s)),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::Gemini => write!(f, "Gemini"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

/// Client chosen at runtime that can be swapped in place, e.g. after a key is saved.
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<Mutex<Box<dyn LowLevelClient>>>,
}

impl FlexibleClient {
    /// Create a new FlexibleClient wrapping the given client
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub fn gemini(config: GeminiConfig) -> Self {
        Self::new(Box::new(GeminiClient::new(config)))
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        Self::mock_with_responses(Vec::new())
    }

    pub fn mock_with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::with_responses(responses);
        (Self::new(Box::new(mock_client)), handle)
    }

    /// Gemini, keyed from the environment or the stored settings.
    ///
    /// Without a key the client is still Gemini: every call fails with
    /// `ConfigError::MissingKey` before any I/O, so sections fall back to
    /// built-in lessons and grading asks the user to add a key.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_type(ClientType::Gemini, settings)
    }

    pub fn from_type(client_type: ClientType, settings: &Settings) -> Self {
        match client_type {
            ClientType::Gemini => {
                let config = GeminiConfig::from_settings(settings);
                if config.has_key() {
                    info!(model = %config.model.id(), "Using Gemini client");
                } else {
                    warn!("No Gemini API key configured; serving built-in lessons until one is saved");
                }
                Self::gemini(config)
            }
            ClientType::Mock => {
                info!("Using offline mock client");
                Self::mock().0
            }
        }
    }

    /// Replace the wrapped client for all clones of this handle.
    pub fn replace(&self, client: Box<dyn LowLevelClient>) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        *inner = client;
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        // Clone the client to avoid holding the mutex across await
        let client = {
            let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            inner.as_ref().clone_box()
        };

        client.ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
