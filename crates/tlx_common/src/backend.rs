//! Model backends for intent decision
//!
//! The decider only sees the `ModelBackend` capability: a system prompt and
//! a user message in, raw text out. Backends are injected at construction.

use crate::error::BackendError;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "tinyllama:latest";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Text completion capability
pub trait ModelBackend: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> Result<String, BackendError>;
}

/// Offline backend for demos and tests.
///
/// Returns `forced` verbatim when set; otherwise maps a few fixed phrasings
/// to intent JSON.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    forced: Option<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forced(json: impl Into<String>) -> Self {
        Self {
            forced: Some(json.into()),
        }
    }

    fn heuristic(user: &str) -> serde_json::Value {
        let u = user.trim().to_lowercase();
        let rest = |prefix: &str| u.strip_prefix(prefix).map(|r| r.trim().to_string());

        if let Some(pkg) = rest("install ") {
            return json!({"intent": "InstallPackage", "package": pkg});
        }
        if let Some(pkg) = rest("remove ").or_else(|| rest("uninstall ")) {
            return json!({"intent": "RemovePackage", "package": pkg});
        }
        if let Some((_, query)) = u.split_once("search for ") {
            return json!({"intent": "SearchPackage", "query": query.trim()});
        }
        if let Some(query) = rest("search ") {
            return json!({"intent": "SearchPackage", "query": query});
        }
        if let Some(cmd) = rest("explain ") {
            return json!({"intent": "ExplainCommand", "command": cmd});
        }
        if let Some((_, segment)) = u.split_once("what does") {
            let segment = segment.replace('?', "");
            let segment = segment.trim();
            let segment = segment.strip_suffix(" do").unwrap_or(segment);
            let cmd = segment.split_whitespace().next().unwrap_or("ls");
            return json!({"intent": "ExplainCommand", "command": cmd});
        }
        if u.contains("update") && !u.contains("upgrade") {
            return json!({"intent": "UpdateSystem"});
        }
        if u.contains("upgrade") {
            return json!({"intent": "UpgradeSystem"});
        }
        if u.contains("distro") || u.contains("distribution") {
            return json!({"intent": "DetectDistro"});
        }
        json!({"intent": "ExplainCommand", "command": "ls"})
    }
}

impl ModelBackend for FakeBackend {
    fn complete(&self, _system: &str, user: &str) -> Result<String, BackendError> {
        match &self.forced {
            Some(forced) => Ok(forced.clone()),
            None => Ok(Self::heuristic(user).to_string()),
        }
    }
}

/// Ollama HTTP backend (`/api/generate`, non-streaming)
pub struct OllamaBackend {
    endpoint: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl OllamaBackend {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ModelBackend for OllamaBackend {
    fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = json!({
            "model": self.model,
            "system": system,
            "prompt": user,
            "stream": false,
        });

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else {
                BackendError::Http(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(BackendError::Http(format!(
                "HTTP {} from Ollama",
                response.status()
            )));
        }

        let value: serde_json::Value = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        value
            .get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| BackendError::InvalidResponse("missing 'response' field".to_string()))
    }
}
