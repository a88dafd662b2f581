// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message types exchanged with the CMake server.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no type")]
    MissingType,
}

/// Request sent to the server: `{ "type": <kind>, "cookie": <cookie>, ...params }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub kind: String,
    pub cookie: String,
    pub params: Map<String, Value>,
}

impl Request {
    pub fn new(kind: impl Into<String>, cookie: impl Into<String>, params: Map<String, Value>) -> Self {
        Self { kind: kind.into(), cookie: cookie.into(), params }
    }

    fn to_value(&self) -> Value {
        let mut object = self.params.clone();
        object.insert("type".into(), Value::String(self.kind.clone()));
        object.insert("cookie".into(), Value::String(self.cookie.clone()));
        Value::Object(object)
    }
}

/// Successful reply; everything besides the correlation fields is the result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(deserialize_with = "cookie_string")]
    pub cookie: String,
    #[serde(default)]
    pub in_reply_to: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    #[serde(deserialize_with = "cookie_string")]
    pub cookie: String,
    #[serde(default)]
    pub in_reply_to: String,
    pub error_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_experimental: bool,
}

/// First message from the server, listing the protocol versions it speaks
/// in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub supported_protocol_versions: Vec<ProtocolVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    #[serde(deserialize_with = "cookie_string")]
    pub cookie: String,
    pub in_reply_to: String,
    pub progress_message: String,
    pub progress_minimum: i64,
    pub progress_current: i64,
    pub progress_maximum: i64,
}

/// Unsolicited server-side event such as `dirty` or `fileChange`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Human-readable `message` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(default, deserialize_with = "cookie_string")]
    pub cookie: String,
    #[serde(default)]
    pub in_reply_to: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Every message kind that can travel over the connection.
///
/// `Reply` and `Error` answer a request by cookie; `Hello`, `Progress`,
/// `Signal` and `Message` are notifications. Any other `type` is a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Reply(Reply),
    Error(ErrorReply),
    Hello(Hello),
    Progress(Progress),
    Signal(Signal),
    Message(Notice),
}

/// Notification types a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Hello,
    Progress,
    Signal,
    Message,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::Hello,
        NotificationKind::Progress,
        NotificationKind::Signal,
        NotificationKind::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Hello => "hello",
            NotificationKind::Progress => "progress",
            NotificationKind::Signal => "signal",
            NotificationKind::Message => "message",
        }
    }
}

impl Message {
    /// Decode one frame payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let Value::Object(mut object) = value else {
            return Err(WireError::NotAnObject);
        };
        let kind = match object.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(WireError::MissingType),
        };
        let message = match kind.as_str() {
            "reply" => {
                object.remove("type");
                Message::Reply(serde_json::from_value(Value::Object(object))?)
            }
            "error" => Message::Error(serde_json::from_value(Value::Object(object))?),
            "hello" => Message::Hello(serde_json::from_value(Value::Object(object))?),
            "progress" => Message::Progress(serde_json::from_value(Value::Object(object))?),
            "signal" => {
                object.remove("type");
                Message::Signal(serde_json::from_value(Value::Object(object))?)
            }
            "message" => Message::Message(serde_json::from_value(Value::Object(object))?),
            _ => {
                object.remove("type");
                let cookie = match object.remove("cookie") {
                    Some(Value::String(s)) => s,
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                };
                Message::Request(Request { kind, cookie, params: object })
            }
        };
        Ok(message)
    }

    /// Encode to the JSON payload placed inside a frame.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(&self.to_value()?)?)
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        let (kind, mut value) = match self {
            Message::Request(request) => return Ok(request.to_value()),
            Message::Reply(m) => ("reply", serde_json::to_value(m)?),
            Message::Error(m) => ("error", serde_json::to_value(m)?),
            Message::Hello(m) => ("hello", serde_json::to_value(m)?),
            Message::Progress(m) => ("progress", serde_json::to_value(m)?),
            Message::Signal(m) => ("signal", serde_json::to_value(m)?),
            Message::Message(m) => ("message", serde_json::to_value(m)?),
        };
        let Value::Object(object) = &mut value else {
            return Err(WireError::NotAnObject);
        };
        object.insert("type".into(), Value::String(kind.into()));
        Ok(value)
    }

    /// The `type` field as it appears on the wire.
    pub fn kind(&self) -> &str {
        match self {
            Message::Request(r) => &r.kind,
            Message::Reply(_) => "reply",
            Message::Error(_) => "error",
            Message::Hello(_) => "hello",
            Message::Progress(_) => "progress",
            Message::Signal(_) => "signal",
            Message::Message(_) => "message",
        }
    }

    /// Notification kind, or `None` for requests and replies.
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        match self {
            Message::Hello(_) => Some(NotificationKind::Hello),
            Message::Progress(_) => Some(NotificationKind::Progress),
            Message::Signal(_) => Some(NotificationKind::Signal),
            Message::Message(_) => Some(NotificationKind::Message),
            Message::Request(_) | Message::Reply(_) | Message::Error(_) => None,
        }
    }
}

/// Cookies are sent as strings; accept numbers too since the server echoes
/// whatever it received.
fn cookie_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("invalid cookie: {}", other))),
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
