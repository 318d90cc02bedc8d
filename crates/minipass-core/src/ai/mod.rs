//! Pluggable local AI backend abstraction
//!
//! The chatbot delegates SQL generation to a local LLM server. The backend
//! is abstracted behind the `AiBackend` trait so the chat pipeline can be
//! exercised in tests with canned responses.
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for AI backends
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Generate a single SQL SELECT statement for a natural-language question
    ///
    /// Returns the model's raw completion; the caller extracts and validates
    /// the SQL before anything touches the database.
    async fn generate_sql(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;
}

/// Concrete backend wrapper providing Clone + compile-time dispatch
#[derive(Clone)]
pub enum AiClient {
    Ollama(OllamaBackend),
    Mock(MockBackend),
}

impl AiClient {
    /// Create from environment variables
    ///
    /// Returns None when no backend is configured.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());
        match backend.as_str() {
            "mock" => Some(AiClient::Mock(MockBackend::new())),
            _ => OllamaBackend::from_env().map(AiClient::Ollama),
        }
    }

    /// Server host description (for logging)
    pub fn host(&self) -> String {
        match self {
            AiClient::Ollama(backend) => backend.host().to_string(),
            AiClient::Mock(_) => "mock".to_string(),
        }
    }

    /// Model name (for logging)
    pub fn model(&self) -> String {
        match self {
            AiClient::Ollama(backend) => backend.model().to_string(),
            AiClient::Mock(_) => "mock".to_string(),
        }
    }
}

#[async_trait]
impl AiBackend for AiClient {
    async fn generate_sql(&self, prompt: &str) -> Result<String> {
        match self {
            AiClient::Ollama(backend) => backend.generate_sql(prompt).await,
            AiClient::Mock(backend) => backend.generate_sql(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AiClient::Ollama(backend) => backend.health_check().await,
            AiClient::Mock(backend) => backend.health_check().await,
        }
    }
}
