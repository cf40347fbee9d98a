//! Payload and command types exchanged with the host

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{PluginError, PluginResult};

/// Host-assigned identifier of a logical stream
pub type ChannelId = i64;

/// Opaque auxiliary bundle that may accompany a command
pub type Aux = Option<Value>;

// ============================================================================
// Payload
// ============================================================================

/// Flags attached to a payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayloadFlags(u32);

impl PayloadFlags {
    /// No flags set
    pub const NONE: PayloadFlags = PayloadFlags(0);
    /// Last payload of a response
    pub const FINAL: PayloadFlags = PayloadFlags(1 << 0);
    /// Payload carries an error report
    pub const ERROR: PayloadFlags = PayloadFlags(1 << 1);

    /// Raw bit representation
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Build flags from raw bits
    pub fn from_bits(bits: u32) -> Self {
        PayloadFlags(bits)
    }

    /// Check whether all bits of `other` are set
    pub fn contains(self, other: PayloadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_final(self) -> bool {
        self.contains(PayloadFlags::FINAL)
    }

    pub fn is_error(self) -> bool {
        self.contains(PayloadFlags::ERROR)
    }
}

impl BitOr for PayloadFlags {
    type Output = PayloadFlags;

    fn bitor(self, rhs: PayloadFlags) -> PayloadFlags {
        PayloadFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PayloadFlags {
    fn bitor_assign(&mut self, rhs: PayloadFlags) {
        self.0 |= rhs.0;
    }
}

/// Data carried by a payload
///
/// The host does not interpret payload data; these variants cover what the
/// plugin actually sends and receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayloadData {
    /// UTF-8 text (chat input/output)
    Text(String),
    /// A channel id (reply to a stream-open request)
    Channel(ChannelId),
    /// Structured data
    Json(Value),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl PayloadData {
    /// Get the data as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadData::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the data as a channel id, if it is one
    pub fn as_channel(&self) -> Option<ChannelId> {
        match self {
            PayloadData::Channel(id) => Some(*id),
            _ => None,
        }
    }

    /// Interpret the data as JSON
    ///
    /// Text and bytes are parsed; structured data is returned as-is.
    pub fn to_json(&self) -> PluginResult<Value> {
        match self {
            PayloadData::Json(v) => Ok(v.clone()),
            PayloadData::Text(s) => Ok(serde_json::from_str(s)?),
            PayloadData::Bytes(b) => Ok(serde_json::from_slice(b)?),
            PayloadData::Channel(id) => Ok(Value::from(*id)),
        }
    }
}

impl fmt::Display for PayloadData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadData::Text(s) => write!(f, "{}", s),
            PayloadData::Channel(id) => write!(f, "{}", id),
            PayloadData::Json(v) => write!(f, "{}", v),
            PayloadData::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for PayloadData {
    fn from(s: &str) -> Self {
        PayloadData::Text(s.to_string())
    }
}

impl From<String> for PayloadData {
    fn from(s: String) -> Self {
        PayloadData::Text(s)
    }
}

impl From<Value> for PayloadData {
    fn from(v: Value) -> Self {
        PayloadData::Json(v)
    }
}

/// A unit of data addressed to a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Channel the payload is delivered to
    pub receiver_channel_id: ChannelId,
    /// The data
    pub data: PayloadData,
    /// Flags (final, error)
    pub flags: PayloadFlags,
}

impl Payload {
    /// Create a payload without flags
    pub fn new(receiver_channel_id: ChannelId, data: impl Into<PayloadData>) -> Self {
        Self {
            receiver_channel_id,
            data: data.into(),
            flags: PayloadFlags::NONE,
        }
    }

    /// Create the last payload of a response
    pub fn final_(receiver_channel_id: ChannelId, data: impl Into<PayloadData>) -> Self {
        Self::new(receiver_channel_id, data).with_flags(PayloadFlags::FINAL)
    }

    /// Create an error-flagged final payload
    pub fn error(receiver_channel_id: ChannelId, message: impl Into<String>) -> Self {
        Self::new(receiver_channel_id, PayloadData::Text(message.into()))
            .with_flags(PayloadFlags::FINAL | PayloadFlags::ERROR)
    }

    /// Add flags
    pub fn with_flags(mut self, flags: PayloadFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A command addressed to a plugin (or to the host itself)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeCommand {
    /// Channel the sender listens on for the response
    pub sender_channel_id: ChannelId,
    /// Name of the receiving plugin, or `"host"`
    pub to: String,
    /// Raw command text, a JSON object with a `name` field
    pub data: String,
    /// Auxiliary bundle
    pub aux: Aux,
}

impl InvokeCommand {
    /// Create a command from a JSON body
    pub fn new(sender_channel_id: ChannelId, to: impl Into<String>, body: &Value) -> Self {
        Self {
            sender_channel_id,
            to: to.into(),
            data: body.to_string(),
            aux: None,
        }
    }

    /// Attach an auxiliary bundle
    pub fn with_aux(mut self, aux: Value) -> Self {
        self.aux = Some(aux);
        self
    }
}

/// Host request to terminate a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopStreamCommand {
    /// The channel whose stream ends
    pub stream_channel_id: ChannelId,
    /// Name of the receiving plugin
    pub to: String,
}

/// A decoded command: its name plus the full JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command name, used for handler lookup
    pub name: String,
    /// The complete decoded body (including `name`)
    pub body: Value,
}

impl Command {
    /// Decode raw command text
    ///
    /// The text must be a JSON object with a string `name` field.
    pub fn decode(raw: &str) -> PluginResult<Self> {
        let body: Value = serde_json::from_str(raw)
            .map_err(|e| PluginError::malformed(format!("invalid JSON: {}", e)))?;

        if !body.is_object() {
            return Err(PluginError::malformed("command is not a JSON object"));
        }

        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::malformed("missing 'name' or 'name' is not a string"))?
            .to_string();

        Ok(Self { name, body })
    }

    /// Get a field of the body
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}
