use crate::model::{ConversationId, Message, ReputationSnapshot};

/// What the rendering layer has to do after an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The rendering surface for `conversation` must be emptied before the
    /// next `Messages` event for it.
    Cleared(ConversationId),
    /// New messages to append, in order.
    Messages {
        conversation: ConversationId,
        messages: Vec<Message>,
    },
    PeerAdded(String),
    OriginAdded(String),
    ReputationsReplaced(ReputationSnapshot),
}
