//! Message schema for relayable chat messages.
//!
//! [`TelegramMessage`] is the record shape the built-in destination delivers.
//! [`Message`] is the tagged union accepted at the submission boundary: either
//! an already typed message or a raw JSON payload that the destination decodes
//! against its own schema.

use serde::{Deserialize, Serialize};

/// A chat message in the shape of the Bot API `sendMessage` call.
///
/// `text` is required when decoding; every other field falls back to its
/// zero value. The two `disable_*` flags accept JSON booleans or integers and
/// are always serialized as `0` or `1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramMessage {
    /// Message body.
    pub text: String,

    /// Formatting mode (`MarkdownV2`, `HTML`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,

    /// Suppress link previews.
    #[serde(default, with = "flag")]
    pub disable_web_page_preview: bool,

    /// Deliver silently.
    #[serde(default, with = "flag")]
    pub disable_notifications: bool,

    /// Identifier of the message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

impl TelegramMessage {
    /// Creates a plain text message with all flags cleared.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// A message as handed to [`Destination::submit`].
///
/// [`Destination::submit`]: crate::destination::Destination::submit
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Message {
    /// A typed message for the built-in chat-relay destination.
    Telegram(TelegramMessage),

    /// An undecoded JSON payload, validated by the receiving destination.
    Json(serde_json::Value),
}

impl Message {
    /// Short name of the message shape, used in error reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Telegram(_) => "telegram",
            Self::Json(_) => "json",
        }
    }

    /// Decodes `value` into the same shape as `self`.
    ///
    /// Intended to be called on [`Destination::empty_message`] so that a
    /// front end can decode payloads without knowing the destination type.
    ///
    /// # Errors
    ///
    /// Returns the serde error when `value` does not fit the schema.
    ///
    /// [`Destination::empty_message`]: crate::destination::Destination::empty_message
    pub fn decode(&self, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        match self {
            Self::Telegram(_) => serde_json::from_value(value).map(Self::Telegram),
            Self::Json(_) => Ok(Self::Json(value)),
        }
    }
}

impl From<TelegramMessage> for Message {
    fn from(message: TelegramMessage) -> Self {
        Self::Telegram(message)
    }
}

/// Serde adapter for `0`/`1` integer flags.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Int(i64),
    }

    // serde's `with` requires `&T`
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bool(b) => b,
            Repr::Int(i) => i != 0,
        })
    }
}
