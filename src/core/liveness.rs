// src/core/liveness.rs

//! Per-connection liveness tracking.
//!
//! Every accepted connection gets an entry stamped with its last heartbeat.
//! The prune task periodically collects entries that have been silent too
//! long and evicts them; eviction is not journaled.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

#[derive(Debug)]
struct ConnectionEntry {
    last_heartbeat: Instant,
    kill_tx: broadcast::Sender<()>,
}

/// The process-wide connection table, keyed by connection id.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    connections: DashMap<u64, ConnectionEntry>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a freshly accepted connection. The returned receiver fires when
    /// the sweep evicts the connection, telling its task to close the socket.
    pub fn register(&self, conn_id: u64) -> broadcast::Receiver<()> {
        let (kill_tx, kill_rx) = broadcast::channel(1);
        self.connections.insert(
            conn_id,
            ConnectionEntry {
                last_heartbeat: Instant::now(),
                kill_tx,
            },
        );
        kill_rx
    }

    /// Refreshes the heartbeat timestamp. Returns false if the connection is
    /// not tracked.
    pub fn touch(&self, conn_id: u64) -> bool {
        match self.connections.get_mut(&conn_id) {
            Some(mut entry) => {
                entry.last_heartbeat = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Untracks a connection without killing it (GOODBYE path).
    pub fn remove(&self, conn_id: u64) {
        self.connections.remove(&conn_id);
    }

    /// Connection ids that have been silent for longer than `dead_after`.
    pub fn expired(&self, dead_after: Duration) -> Vec<u64> {
        let now = Instant::now();
        self.connections
            .iter()
            .filter(|entry| now.duration_since(entry.last_heartbeat) > dead_after)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Evicts a connection: untracks it and fires its kill channel. The send
    /// fails harmlessly when the task already exited on its own.
    pub fn kill(&self, conn_id: u64) {
        if let Some((_, entry)) = self.connections.remove(&conn_id) {
            let _ = entry.kill_tx.send(());
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_refreshes_only_tracked_connections() {
        let tracker = LivenessTracker::new();
        let _rx = tracker.register(1);
        assert!(tracker.touch(1));
        assert!(!tracker.touch(2));
    }

    #[test]
    fn expired_reports_silent_connections() {
        let tracker = LivenessTracker::new();
        let _rx = tracker.register(1);
        assert!(tracker.expired(Duration::from_secs(20)).is_empty());
        assert_eq!(tracker.expired(Duration::from_nanos(0)), vec![1]);
    }

    #[test]
    fn kill_fires_the_connection_channel() {
        let tracker = LivenessTracker::new();
        let mut rx = tracker.register(1);
        tracker.kill(1);
        assert!(rx.try_recv().is_ok());
        assert!(tracker.is_empty());
    }
}
