use crate::model::{ConversationId, Message, ReputationSnapshot, StreamKey};
use crate::wire::{PrivateRecord, RumorRecord};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// What a message snapshot did to the stored logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Streams whose stored log grew (or appeared).
    pub grown: Vec<StreamKey>,
    /// Streams whose incoming log was shorter than the stored one and was ignored.
    pub stale: Vec<StreamKey>,
    /// Streams whose stored log was replaced because an already known message
    /// changed, with the length of the prefix both logs still share.
    pub diverged: Vec<(StreamKey, usize)>,
}

/// Append-only set of identifiers that remembers first-seen order.
#[derive(Debug, Clone, Default)]
pub struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    /// Appends unseen identifiers and returns them in the order they were added.
    pub fn extend<I>(&mut self, incoming: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = Vec::new();
        for item in incoming {
            if self.seen.insert(item.clone()) {
                self.items.push(item.clone());
                added.push(item);
            }
        }
        added
    }

    pub fn contains(&self, item: &str) -> bool {
        self.seen.contains(item)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Replaces `known` with `incoming` unless that would shorten it.
fn merge_log(
    stream: StreamKey,
    known: &mut Vec<Message>,
    incoming: Vec<Message>,
    report: &mut SnapshotReport,
) {
    if incoming.len() < known.len() {
        warn!(
            event = "store_sequence_stale",
            stream = %stream,
            known = known.len(),
            incoming = incoming.len()
        );
        report.stale.push(stream);
        return;
    }
    let shared = known
        .iter()
        .zip(&incoming)
        .take_while(|(stored, fresh)| stored == fresh)
        .count();
    if shared < known.len() {
        warn!(
            event = "store_sequence_diverged",
            stream = %stream,
            known = known.len(),
            incoming = incoming.len(),
            shared
        );
        report.diverged.push((stream.clone(), shared));
    }
    let grew = incoming.len() > known.len();
    *known = incoming;
    if grew {
        report.grown.push(stream);
    }
}

/// Splits private records into one log per origin, keeping array order
/// within each log and first-seen order across them.
fn group_by_origin(records: Vec<PrivateRecord>) -> Vec<(String, Vec<Message>)> {
    let mut grouped: Vec<(String, Vec<Message>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        let message = Message::private(record.origin.clone(), record.text);
        match index.get(&record.origin) {
            Some(&slot) => grouped[slot].1.push(message),
            None => {
                index.insert(record.origin.clone(), grouped.len());
                grouped.push((record.origin, vec![message]));
            }
        }
    }
    grouped
}

/// Latest known state of every polled collection.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    rumors: Vec<Message>,
    private: HashMap<String, Vec<Message>>,
    peers: OrderedSet,
    origins: OrderedSet,
    reputations: ReputationSnapshot,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole array is the broadcast log; senders are never regrouped.
    pub fn apply_rumor_snapshot(&mut self, records: Vec<RumorRecord>) -> SnapshotReport {
        let incoming = records
            .into_iter()
            .map(|record| Message::rumor(record.sender_name, record.text))
            .collect();
        let mut report = SnapshotReport::default();
        merge_log(StreamKey::Broadcast, &mut self.rumors, incoming, &mut report);
        report
    }

    /// Origins missing from the snapshot keep their stored log.
    pub fn apply_private_snapshot(&mut self, records: Vec<PrivateRecord>) -> SnapshotReport {
        let mut report = SnapshotReport::default();
        for (origin, incoming) in group_by_origin(records) {
            let known = self.private.entry(origin.clone()).or_default();
            merge_log(StreamKey::Private(origin), known, incoming, &mut report);
        }
        report
    }

    /// Returns the peers seen for the first time.
    pub fn apply_peer_list(&mut self, peers: Vec<String>) -> Vec<String> {
        self.peers.extend(peers)
    }

    /// Returns the origins seen for the first time.
    pub fn apply_origin_list(&mut self, origins: Vec<String>) -> Vec<String> {
        self.origins.extend(origins)
    }

    pub fn apply_reputation_table(&mut self, snapshot: ReputationSnapshot) {
        self.reputations = snapshot;
    }

    pub fn sequence(&self, stream: &StreamKey) -> &[Message] {
        match stream {
            StreamKey::Broadcast => &self.rumors,
            StreamKey::Private(origin) => {
                self.private.get(origin).map(Vec::as_slice).unwrap_or(&[])
            }
        }
    }

    /// Full stored history of a conversation in server order.
    pub fn messages_for(&self, conversation: &ConversationId) -> Vec<Message> {
        self.sequence(&conversation.stream()).to_vec()
    }

    pub fn peers(&self) -> &OrderedSet {
        &self.peers
    }

    pub fn origins(&self) -> &OrderedSet {
        &self.origins
    }

    pub fn reputations(&self) -> &ReputationSnapshot {
        &self.reputations
    }
}
