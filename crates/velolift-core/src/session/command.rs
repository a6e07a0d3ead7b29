use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Wire names accepted in the `command` field.
pub const COMMANDS: &[&str] = &[
    "reset",
    "recalibrate",
    "abandon_rep",
    "get_summary",
    "start_set",
    "get_set",
    "start_workout",
    "end_workout",
    "get_workout",
];

/// Client request to a lifting session, tagged by `"command"`.
///
/// `start_set` fields are kept as raw JSON so that malformed values fall back
/// to defaults instead of rejecting the whole command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    Reset,
    Recalibrate,
    AbandonRep,
    GetSummary,
    StartSet {
        #[serde(default)]
        exercise: Option<Value>,
        #[serde(default)]
        weight: Option<Value>,
        #[serde(default)]
        unit: Option<Value>,
    },
    GetSet,
    StartWorkout {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    EndWorkout,
    GetWorkout,
}

impl SessionCommand {
    /// Parse one JSON command message.
    ///
    /// # Errors
    ///
    /// `InvalidCommand` for a missing or unknown command name,
    /// `MalformedCommand` when the payload does not fit the named command.
    pub fn parse(json: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ValidationError::MalformedCommand(e.to_string()))?;
        let name = value
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::InvalidCommand("<missing>".into()))?;
        if !COMMANDS.contains(&name) {
            tracing::warn!(command = name, "unknown session command");
            return Err(ValidationError::InvalidCommand(name.into()));
        }
        serde_json::from_value(value).map_err(|e| ValidationError::MalformedCommand(e.to_string()))
    }

    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Reset => "reset",
            SessionCommand::Recalibrate => "recalibrate",
            SessionCommand::AbandonRep => "abandon_rep",
            SessionCommand::GetSummary => "get_summary",
            SessionCommand::StartSet { .. } => "start_set",
            SessionCommand::GetSet => "get_set",
            SessionCommand::StartWorkout { .. } => "start_workout",
            SessionCommand::EndWorkout => "end_workout",
            SessionCommand::GetWorkout => "get_workout",
        }
    }
}
