//! Intent model and parsing
//!
//! An intent is the structured form of what the user asked for. Intents arrive
//! as JSON objects tagged by an `"intent"` key, either from the rule-based CLI
//! flags or from a model backend via the intent decider.
//!
//! Parsing is strict: unknown tags, missing fields and empty required strings
//! are errors, never coerced into a default intent.

use crate::error::IntentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A validated user intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent")]
pub enum Intent {
    DetectDistro,
    SearchPackage {
        query: String,
    },
    InstallPackage {
        package: String,
        #[serde(default)]
        assume_yes: bool,
    },
    RemovePackage {
        package: String,
        #[serde(default)]
        assume_yes: bool,
    },
    UpdateSystem,
    UpgradeSystem,
    ExplainCommand {
        command: String,
    },
    TroubleshootError {
        error_text: String,
    },
}

/// Variant tag of an `Intent`, also used as `intent_type` in the history store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    DetectDistro,
    SearchPackage,
    InstallPackage,
    RemovePackage,
    UpdateSystem,
    UpgradeSystem,
    ExplainCommand,
    TroubleshootError,
}

impl IntentKind {
    pub const ALL: [IntentKind; 8] = [
        IntentKind::DetectDistro,
        IntentKind::SearchPackage,
        IntentKind::InstallPackage,
        IntentKind::RemovePackage,
        IntentKind::UpdateSystem,
        IntentKind::UpgradeSystem,
        IntentKind::ExplainCommand,
        IntentKind::TroubleshootError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::DetectDistro => "DetectDistro",
            IntentKind::SearchPackage => "SearchPackage",
            IntentKind::InstallPackage => "InstallPackage",
            IntentKind::RemovePackage => "RemovePackage",
            IntentKind::UpdateSystem => "UpdateSystem",
            IntentKind::UpgradeSystem => "UpgradeSystem",
            IntentKind::ExplainCommand => "ExplainCommand",
            IntentKind::TroubleshootError => "TroubleshootError",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Whether a plan for this intent can change system state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            IntentKind::InstallPackage
                | IntentKind::RemovePackage
                | IntentKind::UpdateSystem
                | IntentKind::UpgradeSystem
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::DetectDistro => IntentKind::DetectDistro,
            Intent::SearchPackage { .. } => IntentKind::SearchPackage,
            Intent::InstallPackage { .. } => IntentKind::InstallPackage,
            Intent::RemovePackage { .. } => IntentKind::RemovePackage,
            Intent::UpdateSystem => IntentKind::UpdateSystem,
            Intent::UpgradeSystem => IntentKind::UpgradeSystem,
            Intent::ExplainCommand { .. } => IntentKind::ExplainCommand,
            Intent::TroubleshootError { .. } => IntentKind::TroubleshootError,
        }
    }

    pub fn install(package: impl Into<String>) -> Self {
        Intent::InstallPackage {
            package: package.into(),
            assume_yes: false,
        }
    }

    pub fn remove(package: impl Into<String>) -> Self {
        Intent::RemovePackage {
            package: package.into(),
            assume_yes: false,
        }
    }

    pub fn search(query: impl Into<String>) -> Self {
        Intent::SearchPackage {
            query: query.into(),
        }
    }

    pub fn explain(command: impl Into<String>) -> Self {
        Intent::ExplainCommand {
            command: command.into(),
        }
    }

    /// Parse a JSON string into a validated intent
    pub fn from_json_str(s: &str) -> Result<Self, IntentError> {
        let value: Value = serde_json::from_str(s).map_err(|_| IntentError::InvalidJson {
            raw: truncate_chars(s, 200),
        })?;
        parse_intent(&value)
    }

    /// Check field-level constraints that serde cannot express
    pub fn validate(&self) -> Result<(), IntentError> {
        let required = match self {
            Intent::SearchPackage { query } => Some(("query", query)),
            Intent::InstallPackage { package, .. } | Intent::RemovePackage { package, .. } => {
                Some(("package", package))
            }
            Intent::ExplainCommand { command } => Some(("command", command)),
            Intent::TroubleshootError { error_text } => Some(("error_text", error_text)),
            Intent::DetectDistro | Intent::UpdateSystem | Intent::UpgradeSystem => None,
        };

        match required {
            Some((field, value)) if value.trim().is_empty() => Err(IntentError::Invalid {
                intent: self.kind().to_string(),
                reason: format!("field '{}' must not be empty", field),
            }),
            _ => Ok(()),
        }
    }
}

/// Parse a JSON value of the form `{"intent": "Name", ...fields}`
pub fn parse_intent(value: &Value) -> Result<Intent, IntentError> {
    let obj = value
        .as_object()
        .ok_or_else(|| IntentError::NotAnObject(json_type_name(value).to_string()))?;

    let name = match obj.get("intent") {
        Some(Value::String(s)) if !s.is_empty() => s.as_str(),
        Some(Value::Null) | Some(Value::String(_)) | None => return Err(IntentError::MissingTag),
        Some(other) => {
            return Err(IntentError::UnknownIntent {
                name: other.to_string(),
                allowed: allowed_names(),
            })
        }
    };

    if IntentKind::from_name(name).is_none() {
        return Err(IntentError::UnknownIntent {
            name: name.to_string(),
            allowed: allowed_names(),
        });
    }

    let intent: Intent =
        serde_json::from_value(value.clone()).map_err(|e| IntentError::Invalid {
            intent: name.to_string(),
            reason: e.to_string(),
        })?;
    intent.validate()?;
    Ok(intent)
}

fn allowed_names() -> Vec<String> {
    let mut names: Vec<String> = IntentKind::ALL.iter().map(|k| k.to_string()).collect();
    names.sort();
    names
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
