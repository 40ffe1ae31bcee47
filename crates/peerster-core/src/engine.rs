use crate::event::SyncEvent;
use crate::merger::merge_and_emit;
use crate::model::ConversationId;
use crate::read_index::ReadIndexTracker;
use crate::store::{EntityStore, SnapshotReport};
use crate::wire::CollectionSnapshot;
use tracing::debug;

/// Which conversation is on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    NoActiveConversation,
    Active(ConversationId),
}

/// Turns full snapshots into an append-only render stream for the active
/// conversation.
///
/// All mutation happens through `&mut self`; the owner serializes snapshot
/// application and conversation switches.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    store: EntityStore,
    read_index: ReadIndexTracker,
    view: ViewState,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn active(&self) -> Option<&ConversationId> {
        match &self.view {
            ViewState::Active(conversation) => Some(conversation),
            ViewState::NoActiveConversation => None,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Switches the view. Re-selecting the active conversation does nothing;
    /// any other selection clears the surface and replays the full history.
    pub fn select_conversation(&mut self, conversation: ConversationId) -> Vec<SyncEvent> {
        if let ViewState::Active(current) = &self.view {
            if *current == conversation {
                return Vec::new();
            }
            self.read_index.reset_conversation(current);
        }
        self.read_index.reset_conversation(&conversation);
        debug!(event = "conversation_selected", conversation = %conversation);
        self.view = ViewState::Active(conversation.clone());

        let mut events = vec![SyncEvent::Cleared(conversation.clone())];
        events.extend(self.emit_for(&conversation));
        events
    }

    /// Routes one polled snapshot into the store and emits whatever became
    /// visible.
    pub fn apply(&mut self, snapshot: CollectionSnapshot) -> Vec<SyncEvent> {
        match snapshot {
            CollectionSnapshot::Rumors(records) => {
                let report = self.store.apply_rumor_snapshot(records);
                debug!(
                    event = "rumor_snapshot_applied",
                    grown = report.grown.len(),
                    stale = report.stale.len()
                );
                self.emit_after(&report, ConversationId::is_broadcast)
            }
            CollectionSnapshot::PrivateMessages(records) => {
                let report = self.store.apply_private_snapshot(records);
                debug!(
                    event = "private_snapshot_applied",
                    grown = report.grown.len(),
                    stale = report.stale.len()
                );
                self.emit_after(&report, |conversation| !conversation.is_broadcast())
            }
            CollectionSnapshot::Peers(peers) => self
                .store
                .apply_peer_list(peers)
                .into_iter()
                .map(SyncEvent::PeerAdded)
                .collect(),
            CollectionSnapshot::Origins(origins) => self
                .store
                .apply_origin_list(origins)
                .into_iter()
                .map(SyncEvent::OriginAdded)
                .collect(),
            CollectionSnapshot::Reputations(snapshot) => {
                self.store.apply_reputation_table(snapshot.clone());
                vec![SyncEvent::ReputationsReplaced(snapshot)]
            }
        }
    }

    /// Emits what a message snapshot made visible.
    ///
    /// A diverged log in the active conversation invalidates what is already
    /// on screen, so that conversation is cleared and replayed. Cursors of
    /// hidden streams drop back to the shared prefix.
    fn emit_after(
        &mut self,
        report: &SnapshotReport,
        shows: impl Fn(&ConversationId) -> bool,
    ) -> Vec<SyncEvent> {
        let active = self.active().filter(|active| shows(*active)).cloned();
        let mut rebuild = false;
        for (stream, shared) in &report.diverged {
            if active.as_ref().is_some_and(|active| stream.belongs_to(active)) {
                rebuild = true;
            } else {
                self.read_index.clamp(stream, *shared);
            }
        }
        let Some(active) = active else {
            return Vec::new();
        };
        if !rebuild {
            return self.emit_for(&active).into_iter().collect();
        }
        debug!(event = "conversation_rebuilt", conversation = %active);
        self.read_index.reset_conversation(&active);
        let mut events = vec![SyncEvent::Cleared(active.clone())];
        events.extend(self.emit_for(&active));
        events
    }

    fn emit_for(&mut self, conversation: &ConversationId) -> Option<SyncEvent> {
        let stream = conversation.stream();
        let sequence = self.store.sequence(&stream);
        let messages = merge_and_emit(&mut self.read_index, &stream, sequence);
        if messages.is_empty() {
            return None;
        }
        Some(SyncEvent::Messages {
            conversation: conversation.clone(),
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReputationScore, ReputationSnapshot, StreamKey};
    use crate::wire::{PrivateRecord, RumorRecord};

    fn rumors(entries: &[(&str, &str)]) -> CollectionSnapshot {
        CollectionSnapshot::Rumors(
            entries
                .iter()
                .map(|(sender, text)| RumorRecord {
                    sender_name: sender.to_string(),
                    text: text.to_string(),
                })
                .collect(),
        )
    }

    fn private(entries: &[(&str, &str)]) -> CollectionSnapshot {
        CollectionSnapshot::PrivateMessages(
            entries
                .iter()
                .map(|(origin, text)| PrivateRecord {
                    origin: origin.to_string(),
                    dest: String::new(),
                    text: text.to_string(),
                })
                .collect(),
        )
    }

    fn emitted_texts(events: &[SyncEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                SyncEvent::Messages { messages, .. } => Some(messages),
                _ => None,
            })
            .flatten()
            .map(|message| message.text.clone())
            .collect()
    }

    #[test]
    fn nothing_is_emitted_before_a_conversation_is_selected() {
        let mut engine = SyncEngine::new();
        assert!(engine.apply(rumors(&[("alice", "a1")])).is_empty());
        assert_eq!(engine.view(), &ViewState::NoActiveConversation);

        let events = engine.select_conversation(ConversationId::Broadcast);
        assert_eq!(events[0], SyncEvent::Cleared(ConversationId::Broadcast));
        assert_eq!(emitted_texts(&events), vec!["a1"]);
    }

    #[test]
    fn broadcast_follows_server_order_when_senders_alternate() {
        let mut engine = SyncEngine::new();
        engine.apply(rumors(&[("bob", "b1"), ("alice", "a1"), ("bob", "b2")]));
        let events = engine.select_conversation(ConversationId::Broadcast);
        assert_eq!(emitted_texts(&events), vec!["b1", "a1", "b2"]);

        let events = engine.apply(rumors(&[
            ("bob", "b1"),
            ("alice", "a1"),
            ("bob", "b2"),
            ("alice", "a2"),
            ("bob", "b3"),
        ]));
        assert_eq!(emitted_texts(&events), vec!["a2", "b3"]);
    }

    #[test]
    fn changed_history_in_active_conversation_is_replayed() {
        let mut engine = SyncEngine::new();
        engine.select_conversation(ConversationId::origin("alice"));
        engine.apply(private(&[("alice", "m1"), ("alice", "m2")]));

        let events = engine.apply(private(&[("alice", "m1"), ("alice", "x2")]));
        assert_eq!(events[0], SyncEvent::Cleared(ConversationId::origin("alice")));
        assert_eq!(emitted_texts(&events), vec!["m1", "x2"]);
        assert!(engine
            .apply(private(&[("alice", "m1"), ("alice", "x2")]))
            .is_empty());
    }

    #[test]
    fn changed_history_in_hidden_conversation_clamps_its_cursor() {
        let mut engine = SyncEngine::new();
        engine.select_conversation(ConversationId::Broadcast);
        engine.apply(rumors(&[("bob", "b1"), ("bob", "b2")]));
        engine.select_conversation(ConversationId::origin("carol"));

        engine.apply(rumors(&[("bob", "b1"), ("bob", "x2"), ("bob", "b3")]));
        let back = engine.select_conversation(ConversationId::Broadcast);
        assert_eq!(emitted_texts(&back), vec!["b1", "x2", "b3"]);
        assert_eq!(engine.read_index.index_for(&StreamKey::Broadcast), 3);
    }

    #[test]
    fn private_snapshot_does_not_emit_into_broadcast_view() {
        let mut engine = SyncEngine::new();
        engine.select_conversation(ConversationId::Broadcast);
        assert!(engine.apply(private(&[("carol", "secret")])).is_empty());
        let events = engine.select_conversation(ConversationId::origin("carol"));
        assert_eq!(emitted_texts(&events), vec!["secret"]);
    }

    #[test]
    fn reselecting_same_conversation_is_a_no_op() {
        let mut engine = SyncEngine::new();
        engine.apply(private(&[("carol", "c1")]));
        let first = engine.select_conversation(ConversationId::origin("carol"));
        assert_eq!(emitted_texts(&first), vec!["c1"]);
        assert!(engine
            .select_conversation(ConversationId::origin("carol"))
            .is_empty());
    }

    #[test]
    fn unknown_conversation_clears_and_emits_nothing() {
        let mut engine = SyncEngine::new();
        let events = engine.select_conversation(ConversationId::origin("ghost"));
        assert_eq!(events, vec![SyncEvent::Cleared(ConversationId::origin("ghost"))]);
        let events = engine.apply(private(&[("ghost", "boo")]));
        assert_eq!(emitted_texts(&events), vec!["boo"]);
    }

    #[test]
    fn global_lists_emit_independently_of_view() {
        let mut engine = SyncEngine::new();
        let events = engine.apply(CollectionSnapshot::Peers(vec![
            "1.1.1.1:1".to_string(),
            "1.1.1.1:1".to_string(),
        ]));
        assert_eq!(events, vec![SyncEvent::PeerAdded("1.1.1.1:1".to_string())]);
        let events = engine.apply(CollectionSnapshot::Origins(vec!["dave".to_string()]));
        assert_eq!(events, vec![SyncEvent::OriginAdded("dave".to_string())]);

        let mut reputations = ReputationSnapshot::default();
        reputations
            .contribution
            .insert("dave".to_string(), ReputationScore::new(0.5).expect("score"));
        let events = engine.apply(CollectionSnapshot::Reputations(reputations.clone()));
        assert_eq!(events, vec![SyncEvent::ReputationsReplaced(reputations)]);
    }
}
