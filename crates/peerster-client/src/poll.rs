use crate::http::FetchError;
use peerster_core::{CollectionKind, CollectionSnapshot};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Anything that can produce a full snapshot of one collection.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(
        &self,
        kind: CollectionKind,
    ) -> impl Future<Output = Result<Option<CollectionSnapshot>, FetchError>> + Send;
}

/// Completion of one fetch, delivered back to the session loop.
#[derive(Debug)]
pub struct FetchOutcome {
    pub kind: CollectionKind,
    pub result: Result<Option<CollectionSnapshot>, FetchError>,
}

/// Issues one fetch task per collection kind on every tick.
///
/// A kind whose previous fetch has not been handed back through
/// [`PollScheduler::complete`] is skipped, so responses for one kind are
/// always processed in issue order.
pub struct PollScheduler<S> {
    source: Arc<S>,
    outcomes: mpsc::Sender<FetchOutcome>,
    in_flight: BTreeSet<CollectionKind>,
}

impl<S: SnapshotSource> PollScheduler<S> {
    pub fn new(source: Arc<S>, outcomes: mpsc::Sender<FetchOutcome>) -> Self {
        Self {
            source,
            outcomes,
            in_flight: BTreeSet::new(),
        }
    }

    /// Returns how many fetches were issued.
    pub fn tick(&mut self) -> usize {
        let mut issued = 0;
        for kind in CollectionKind::ALL {
            if !self.in_flight.insert(kind) {
                debug!(event = "poll_skipped_in_flight", kind = %kind);
                continue;
            }
            let source = Arc::clone(&self.source);
            let outcomes = self.outcomes.clone();
            tokio::spawn(async move {
                // A panicking fetch must still hand its kind back.
                let fetch = tokio::spawn(async move { source.fetch(kind).await });
                let result = match fetch.await {
                    Ok(result) => result,
                    Err(err) => Err(FetchError::Task(err)),
                };
                let _ = outcomes.send(FetchOutcome { kind, result }).await;
            });
            issued += 1;
        }
        issued
    }

    pub fn complete(&mut self, kind: CollectionKind) {
        self.in_flight.remove(&kind);
    }

    #[cfg(test)]
    pub fn is_in_flight(&self, kind: CollectionKind) -> bool {
        self.in_flight.contains(&kind)
    }
}
