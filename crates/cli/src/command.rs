use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use simtree_graph::{build_from_request, reconnect_from_request, validate_from_request};
use simtree_protocol::{BuildRequest, ReconnectRequest, ValidateRequest, PROTOCOL_SCHEMA_VERSION};

use crate::config::EngineConfig;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Build,
    Reconnect,
    Validate,
    Schema,
}

impl CommandAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Build => "build",
            CommandAction::Reconnect => "reconnect",
            CommandAction::Validate => "validate",
            CommandAction::Schema => "schema",
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    pub protocol_version: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl CommandResponse {
    pub fn is_error(&self) -> bool {
        matches!(self.status, CommandStatus::Error)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Error,
            message: Some(message.into()),
            data: Value::Null,
            meta: ResponseMeta {
                protocol_version: PROTOCOL_SCHEMA_VERSION,
                ..ResponseMeta::default()
            },
        }
    }
}

pub fn execute(request: CommandRequest, config: &EngineConfig) -> Result<CommandResponse> {
    let started = Instant::now();
    let action = request.action;
    log::debug!("Executing {} command", action.as_str());

    let data = match action {
        CommandAction::Build => {
            let payload: BuildRequest = parse_payload(request.payload, action)?;
            serde_json::to_value(build_from_request(&payload, &config.build)?)?
        }
        CommandAction::Reconnect => {
            let payload: ReconnectRequest = parse_payload(request.payload, action)?;
            serde_json::to_value(reconnect_from_request(&payload)?)?
        }
        CommandAction::Validate => {
            let payload: ValidateRequest = parse_payload(request.payload, action)?;
            serde_json::to_value(validate_from_request(&payload)?)?
        }
        CommandAction::Schema => simtree_protocol::schemas(),
    };

    Ok(CommandResponse {
        status: CommandStatus::Ok,
        message: None,
        data,
        meta: ResponseMeta {
            action: Some(action.as_str()),
            protocol_version: PROTOCOL_SCHEMA_VERSION,
            duration_ms: duration_ms(started.elapsed()),
        },
    })
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn parse_payload<T: DeserializeOwned>(payload: Value, action: CommandAction) -> Result<T> {
    serde_json::from_value(payload)
        .with_context(|| format!("Invalid payload for action '{}'", action.as_str()))
}
