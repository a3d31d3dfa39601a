// # Session Store
//
// One lane per user. A lane is an async mutex around that user's optional
// flow session; the engine holds it for the whole handling of a message,
// provider calls included, so a second message from the same user queues
// behind the first instead of racing on the session.
//
// ## Locking
//
// - The lane map is behind a std mutex held only long enough to clone a lane
// - Lanes of different users never contend
// - Lanes are never removed; their number is bounded by the allow list

use crate::flow::FlowSession;
use crate::model::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type Lane = Arc<tokio::sync::Mutex<Option<FlowSession>>>;

/// Exclusive access to one user's session slot
pub type SessionGuard = OwnedMutexGuard<Option<FlowSession>>;

/// Per-user flow sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    lanes: Mutex<HashMap<UserId, Lane>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `user`'s lane and hold it until the guard drops
    pub async fn lock(&self, user: UserId) -> SessionGuard {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            lanes.entry(user).or_default().clone()
        };
        lane.lock_owned().await
    }

    /// Number of users seen so far
    pub fn lanes(&self) -> usize {
        self.lanes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
