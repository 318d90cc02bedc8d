//! Mock backend for testing
//!
//! Returns configurable canned completions so the chat pipeline can be
//! tested without a running LLM server.

use async_trait::async_trait;

use super::AiBackend;
use crate::error::{Error, Result};

/// Mock AI backend
#[derive(Clone)]
pub struct MockBackend {
    /// Completion to return from generate_sql
    pub completion: String,
    /// Whether health_check should return true
    pub healthy: bool,
    /// When true, generate_sql returns an error
    pub failing: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a mock that answers with a harmless count query
    pub fn new() -> Self {
        Self {
            completion: "SELECT COUNT(*) AS passport_count FROM passports".to_string(),
            healthy: true,
            failing: false,
        }
    }

    /// Create a mock that returns the given completion
    pub fn with_completion(completion: &str) -> Self {
        Self {
            completion: completion.to_string(),
            healthy: true,
            failing: false,
        }
    }

    /// Create a mock whose generation always fails
    pub fn failing() -> Self {
        Self {
            completion: String::new(),
            healthy: false,
            failing: true,
        }
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    async fn generate_sql(&self, _prompt: &str) -> Result<String> {
        if self.failing {
            return Err(Error::Chat("Mock backend failure".to_string()));
        }
        Ok(self.completion.clone())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}
