//! Command senders and reply messages

use std::fmt;

/// Prepended by [`CommandSender::reply_prefixed`]
pub const MESSAGE_PREFIX: &str = "[flare] ";

/// Coarse presentation hint for a reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Plain,
    Info,
    Highlight,
    Success,
    Warning,
    Error,
}

/// A single line sent back to a sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub tone: Tone,
}

impl Message {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Info)
    }

    pub fn highlight(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Highlight)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Success)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Warning)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Error)
    }

    /// Same message with [`MESSAGE_PREFIX`] in front
    pub fn prefixed(&self) -> Self {
        Self::new(format!("{MESSAGE_PREFIX}{}", self.text), self.tone)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::plain(text)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Whoever issued a command
///
/// The platform never inspects a sender beyond these capabilities.
pub trait CommandSender: Send + Sync {
    /// Display name, used for activity records and logs
    fn name(&self) -> String;

    /// Whether the sender holds the permission `node`
    fn has_permission(&self, node: &str) -> bool;

    /// Deliver a message to the sender
    fn reply(&self, message: Message);

    /// Deliver a message with the platform prefix
    fn reply_prefixed(&self, message: Message) {
        self.reply(message.prefixed());
    }
}
