// src/core/state.rs

//! Defines the central `ServerState` struct, holding all shared server-wide
//! state.

use crate::config::Config;
use crate::core::liveness::LivenessTracker;
use crate::core::store::Store;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared state handed to every connection task and background task.
///
/// A single coarse mutex serializes all Store+Journal mutation; every
/// mutation is O(1) or O(number of users/groups), so contention is not a
/// concern at this server's scale.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    pub store: Mutex<Store>,
    pub liveness: LivenessTracker,
}

impl ServerState {
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            config,
            store: Mutex::new(store),
            liveness: LivenessTracker::new(),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.config.read_timeout_ms)
    }

    pub fn dead_after(&self) -> Duration {
        Duration::from_secs(self.config.dead_after_secs)
    }
}
