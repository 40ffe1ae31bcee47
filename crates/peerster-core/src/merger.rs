use crate::model::{Message, StreamKey};
use crate::read_index::ReadIndexTracker;
use tracing::warn;

/// Returns the not-yet-emitted suffix of `sequence` and advances the stream's
/// read index past it.
///
/// Feeding the same sequence again yields nothing. A sequence shorter than
/// the read index clamps the index down instead of failing.
pub fn merge_and_emit(
    tracker: &mut ReadIndexTracker,
    stream: &StreamKey,
    sequence: &[Message],
) -> Vec<Message> {
    let mut read = tracker.index_for(stream);
    if sequence.len() < read {
        warn!(
            event = "read_index_regression",
            stream = %stream,
            read_index = read,
            sequence_len = sequence.len()
        );
        tracker.clamp(stream, sequence.len());
        read = sequence.len();
    }
    let delta = sequence[read..].to_vec();
    tracker.advance(stream, delta.len());
    delta
}
