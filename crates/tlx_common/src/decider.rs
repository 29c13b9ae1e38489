//! Intent decider - natural language to a typed `Intent` via a model backend

use crate::backend::ModelBackend;
use crate::error::IntentError;
use crate::intent::{parse_intent, truncate_chars, Intent, IntentKind};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

const SYSTEM_INSTRUCTION: &str = "You are an intent classification engine for a Linux assistant. \
     Output EXACTLY ONE JSON object matching one of these intents: {intents}. \
     NO prose, NO extra lines, NO markdown fences. Just JSON.";

/// Max characters of raw model output kept in `InvalidJson`
const RAW_EXCERPT_CHARS: usize = 200;

fn few_shots() -> Vec<(&'static str, Value)> {
    vec![
        ("install htop", json!({"intent": "InstallPackage", "package": "htop"})),
        ("remove neovim", json!({"intent": "RemovePackage", "package": "neovim"})),
        ("what does ls do?", json!({"intent": "ExplainCommand", "command": "ls"})),
        ("update my system", json!({"intent": "UpdateSystem"})),
        ("upgrade everything", json!({"intent": "UpgradeSystem"})),
        ("search for curl", json!({"intent": "SearchPackage", "query": "curl"})),
        ("what distro am i on", json!({"intent": "DetectDistro"})),
    ]
}

/// Strict single-object instruction followed by few-shot examples
pub fn build_system_prompt() -> String {
    let intents: Vec<&str> = IntentKind::ALL.iter().map(|k| k.as_str()).collect();
    let mut sections = vec![
        SYSTEM_INSTRUCTION.replace("{intents}", &intents.join(" | ")),
        "Examples:".to_string(),
    ];
    for (user, expected) in few_shots() {
        sections.push(format!("User: {}\nJSON: {}", user, expected));
    }
    sections.join("\n\n")
}

pub struct IntentDecider {
    backend: Box<dyn ModelBackend>,
    system_prompt: String,
    object_start: Regex,
}

impl IntentDecider {
    pub fn new(backend: Box<dyn ModelBackend>) -> Result<Self> {
        let object_start =
            Regex::new(r#"\{\s*""#).context("Failed to compile JSON pattern")?;
        Ok(Self {
            backend,
            system_prompt: build_system_prompt(),
            object_start,
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Ask the backend for one intent and validate it
    pub fn decide(&self, user_text: &str) -> Result<Intent> {
        let raw = self.backend.complete(&self.system_prompt, user_text)?;
        if raw.trim().is_empty() {
            return Err(IntentError::EmptyOutput.into());
        }
        debug!("Model output: {}", raw);

        let value = self
            .extract_json(&raw)
            .ok_or_else(|| IntentError::InvalidJson {
                raw: truncate_chars(&raw, RAW_EXCERPT_CHARS),
            })?;
        Ok(parse_intent(&value)?)
    }

    /// The whole trimmed text when it is JSON, else the first complete
    /// object that starts at a `{"` in the surrounding prose
    fn extract_json(&self, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Some(value);
        }
        self.object_start.find_iter(trimmed).find_map(|m| {
            serde_json::Deserializer::from_str(&trimmed[m.start()..])
                .into_iter::<Value>()
                .next()?
                .ok()
        })
    }
}
