use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A conversation the client can display: the broadcast room or a private
/// chat with one origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "origin", rename_all = "snake_case")]
pub enum ConversationId {
    Broadcast,
    Origin(String),
}

impl ConversationId {
    pub fn origin(name: impl Into<String>) -> Self {
        Self::Origin(name.into())
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, ConversationId::Broadcast)
    }

    /// Destination string expected by the message endpoint; empty for broadcast.
    pub fn destination(&self) -> &str {
        match self {
            ConversationId::Broadcast => "",
            ConversationId::Origin(origin) => origin,
        }
    }

    /// The message log backing this conversation.
    pub fn stream(&self) -> StreamKey {
        match self {
            ConversationId::Broadcast => StreamKey::Broadcast,
            ConversationId::Origin(origin) => StreamKey::Private(origin.clone()),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationId::Broadcast => f.write_str("#broadcast"),
            ConversationId::Origin(origin) => write!(f, "@{origin}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Broadcast,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn rumor(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            kind: MessageKind::Broadcast,
        }
    }

    pub fn private(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: origin.into(),
            text: text.into(),
            kind: MessageKind::Private,
        }
    }
}

/// One append-only message log with its own read cursor.
///
/// Every conversation is exactly one log: all rumors in server order for
/// broadcast, and the messages from one origin for a private conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKey {
    Broadcast,
    Private(String),
}

impl StreamKey {
    pub fn conversation(&self) -> ConversationId {
        match self {
            StreamKey::Broadcast => ConversationId::Broadcast,
            StreamKey::Private(origin) => ConversationId::Origin(origin.clone()),
        }
    }

    pub fn belongs_to(&self, conversation: &ConversationId) -> bool {
        match (self, conversation) {
            (StreamKey::Broadcast, ConversationId::Broadcast) => true,
            (StreamKey::Private(origin), ConversationId::Origin(other)) => origin == other,
            _ => false,
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKey::Broadcast => f.write_str("broadcast"),
            StreamKey::Private(origin) => write!(f, "private:{origin}"),
        }
    }
}

/// A reputation value, always within `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ReputationScore(f32);

impl ReputationScore {
    pub const MIN: f32 = -1.0;
    pub const MAX: f32 = 1.0;

    /// Clamps finite values into range; NaN and infinities carry no score.
    pub fn new(value: f32) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self(value.clamp(Self::MIN, Self::MAX)))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

pub type ReputationTable = HashMap<String, ReputationScore>;

/// Latest reputation tables as served; replaced as a whole on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReputationSnapshot {
    pub signature: ReputationTable,
    pub contribution: ReputationTable,
}

impl ReputationSnapshot {
    pub fn signature_of(&self, id: &str) -> Option<ReputationScore> {
        self.signature.get(id).copied()
    }

    pub fn contribution_of(&self, id: &str) -> Option<ReputationScore> {
        self.contribution.get(id).copied()
    }
}
