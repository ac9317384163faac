use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::IngestError;

/// One structured log record submitted by an agent.
///
/// Decoding is permissive: unknown fields are ignored, missing or `null`
/// fields fall back to empty strings, and a `null` body is an empty event.
/// Any caller-supplied `timestamp` is replaced with the server receipt time
/// by [`LogEvent::stamp`] before the event is persisted.
#[derive(Clone, Default, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub tenant_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub level: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogEvent {
    pub fn from_bytes(bytes: &[u8]) -> Result<LogEvent, IngestError> {
        tracing::debug!(len = bytes.len(), "decoding new event");

        let event = serde_json::from_slice::<Option<LogEvent>>(bytes)?;
        Ok(event.unwrap_or_default())
    }

    pub fn stamp(&mut self, received_at: DateTime<Utc>) {
        self.timestamp = Some(received_at);
    }

    /// Enforces level membership and the message length cap. Only called
    /// when strict validation is enabled.
    pub fn validate(&self, max_message_length: usize) -> Result<(), IngestError> {
        self.level.parse::<Level>()?;

        let length = self.message_len();
        if length > max_message_length {
            return Err(IngestError::MessageTooLong {
                length,
                max: max_message_length,
            });
        }

        Ok(())
    }

    /// Message length in characters, the unit used by validation and excerpts.
    pub fn message_len(&self) -> usize {
        self.message.chars().count()
    }

    /// Excerpt echoed to the diagnostic log, `None` when the limit is 0.
    pub fn diagnostic_excerpt(&self, limit: usize) -> Option<&str> {
        (limit > 0).then(|| self.message_excerpt(limit))
    }

    /// Message prefix safe to echo to the diagnostic log.
    pub fn message_excerpt(&self, limit: usize) -> &str {
        match self.message.char_indices().nth(limit) {
            Some((idx, _)) => &self.message[..idx],
            None => &self.message,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl FromStr for Level {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            _ => Err(IngestError::InvalidLevel(s.to_owned())),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}
