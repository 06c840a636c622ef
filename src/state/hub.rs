//! Per-group-code broadcast hub for outbound match snapshots. Subscribers
//! (the outgoing transport) attach by group code; the scheduler publishes a
//! snapshot whenever a match's event number advances.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::dto::snapshot::MatchSnapshot;

/// Broadcast hub fanning snapshots out to all subscribers of a group code.
pub struct SnapshotHub {
    capacity: usize,
    channels: DashMap<String, broadcast::Sender<Arc<MatchSnapshot>>>,
}

impl SnapshotHub {
    /// Construct a hub whose per-group channels buffer `capacity` snapshots.
    /// Slow subscribers skip intermediate snapshots rather than stall the
    /// scheduler.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: DashMap::new(),
        }
    }

    /// Register a subscriber for a group code, creating the channel on first
    /// use so subscribers may attach before the match exists.
    pub fn subscribe(&self, group_code: &str) -> broadcast::Receiver<Arc<MatchSnapshot>> {
        self.sender(group_code).subscribe()
    }

    /// Subscribe as a stream, for transports that forward snapshots from a
    /// polling loop.
    pub fn stream(&self, group_code: &str) -> BroadcastStream<Arc<MatchSnapshot>> {
        BroadcastStream::new(self.subscribe(group_code))
    }

    /// Publish a snapshot to every subscriber of the group code. Delivery is
    /// fire-and-forget; having no subscriber is not an error.
    pub fn publish(&self, group_code: &str, snapshot: Arc<MatchSnapshot>) {
        let _ = self.sender(group_code).send(snapshot);
    }

    /// Drop the channel for a removed match, disconnecting its subscribers.
    pub fn remove(&self, group_code: &str) {
        self.channels.remove(group_code);
    }

    fn sender(&self, group_code: &str) -> broadcast::Sender<Arc<MatchSnapshot>> {
        self.channels
            .entry(group_code.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}
