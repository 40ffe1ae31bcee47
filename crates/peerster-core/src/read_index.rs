use crate::model::{ConversationId, StreamKey};
use std::collections::HashMap;

/// How many messages of each stream have already been handed to the renderer.
#[derive(Debug, Clone, Default)]
pub struct ReadIndexTracker {
    indices: HashMap<StreamKey, usize>,
}

impl ReadIndexTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero for streams never emitted.
    pub fn index_for(&self, stream: &StreamKey) -> usize {
        self.indices.get(stream).copied().unwrap_or(0)
    }

    /// Moves the cursor forward. The caller has already bounded `by` against
    /// the stream length.
    pub fn advance(&mut self, stream: &StreamKey, by: usize) {
        if by == 0 {
            return;
        }
        *self.indices.entry(stream.clone()).or_insert(0) += by;
    }

    /// Lowers the cursor to `index`; used when a stream turns out shorter than
    /// what was already emitted.
    pub fn clamp(&mut self, stream: &StreamKey, index: usize) {
        if let Some(current) = self.indices.get_mut(stream) {
            *current = (*current).min(index);
        }
    }

    pub fn reset_all(&mut self) {
        self.indices.clear();
    }

    /// Forgets every cursor belonging to `conversation`.
    pub fn reset_conversation(&mut self, conversation: &ConversationId) {
        self.indices
            .retain(|stream, _| !stream.belongs_to(conversation));
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
