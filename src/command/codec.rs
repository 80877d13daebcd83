//! Command channel wire format
//!
//! # Protocol Specification
//!
//! Requests travel client → server as a single text line:
//!
//! ```text
//! ┌──────────────┬───┬──────┬───┬──────┬────┐
//! │ COMMAND_NAME │ # │ arg1 │ # │ arg2 │ \n │
//! └──────────────┴───┴──────┴───┴──────┴────┘
//! ```
//!
//! - **Delimiter**: `#` between the name and each argument
//! - **Terminator**: `\n` (a trailing `\r` is tolerated on receive)
//! - **Arguments**: plain text; `#`, `\r` and `\n` are therefore forbidden
//!   inside an argument and rejected at encode time
//!
//! Responses travel server → client as one JSON object per line:
//!
//! ```text
//! {"status":"success","message":"Stopped"}
//! {"status":"success","data":42.7}
//! {"status":"error","message":"Unknown command: FOO"}
//! ```
//!
//! `message` and `data` are optional and omitted when absent. A response
//! line that is not valid JSON is wrapped as a success carrying the raw
//! text as `data`, so older firmware that answers in plain text still
//! works.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Outcome marker for a command response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// One command response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn success_data(data: serde_json::Value) -> Self {
        Self {
            status: Status::Success,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Encode a request line, terminator included
///
/// Rejects names or arguments containing the field delimiter or line
/// terminators, which would desynchronize the stream on the far side.
pub fn encode_request(name: &str, args: &[String]) -> Result<String> {
    validate_field(name)?;
    for arg in args {
        validate_field(arg)?;
    }

    let mut line = String::from(name);
    for arg in args {
        line.push('#');
        line.push_str(arg);
    }
    line.push('\n');
    Ok(line)
}

fn validate_field(field: &str) -> Result<()> {
    if field.contains('#') || field.contains('\n') || field.contains('\r') {
        return Err(Error::Protocol(format!(
            "Invalid characters in command field: {:?}",
            field
        )));
    }
    Ok(())
}

/// Split one received line into command name and arguments
///
/// Surrounding whitespace (including `\r`) is trimmed first. An empty or
/// whitespace-only line yields an empty name.
pub fn split_request(line: &str) -> (&str, Vec<&str>) {
    let trimmed = line.trim();
    let mut parts = trimmed.split('#');
    let name = parts.next().unwrap_or("");
    (name, parts.collect())
}

/// Encode a response as one JSON line
pub fn encode_response(response: &Response) -> Result<String> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    Ok(line)
}

/// Decode a response line
///
/// Non-JSON text is not an error: it becomes a success response with the
/// raw text as `data`.
pub fn decode_response(line: &str) -> Response {
    let trimmed = line.trim();
    match serde_json::from_str(trimmed) {
        Ok(response) => response,
        Err(_) => Response {
            status: Status::Success,
            message: None,
            data: Some(serde_json::Value::String(trimmed.to_string())),
        },
    }
}
