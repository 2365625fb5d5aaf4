use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{Line, RuntimeState},
    error::ModelError,
};

/// Cosmetic display configuration, passed through to renderers untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplaySettings(pub Map<String, Value>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiCommand {
    Minimize,
    Maximize,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    Controller,
    Display,
}

/// Full-state push from the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub d: Line,
    pub r: RuntimeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<DisplaySettings>,
}

impl SyncPayload {
    /// Rejects payloads a display could not render: an empty line or a
    /// runtime index past the end of it.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.d.validate()?;
        self.d.check_index(self.r.idx)
    }
}

/// Everything that travels over the shared channel. Every participant sees
/// every message and picks out the kinds it cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PidsMessage {
    Sync(SyncPayload),
    RequestState,
    RemoteKey { code: String },
    UiCommand { cmd: UiCommand, src: CommandSource },
}

impl PidsMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PidsMessage::Sync(_) => "sync",
            PidsMessage::RequestState => "request_state",
            PidsMessage::RemoteKey { .. } => "remote_key",
            PidsMessage::UiCommand { .. } => "ui_command",
        }
    }
}
