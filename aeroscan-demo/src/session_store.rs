//! In-memory per-session state
//!
//! Each interactive session owns one [`ProcessState`]. Sessions are
//! independent: nothing in one session is visible to another, and nothing
//! outlives the process. Sessions left idle longer than the configured TTL
//! are discarded by [`SessionStore::evict_idle`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aeroscan_common::{Error, Result};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::ProcessState;

struct SessionEntry {
    state: ProcessState,
    last_seen: Instant,
}

impl SessionEntry {
    fn touch(&mut self) -> &mut ProcessState {
        self.last_seen = Instant::now();
        &mut self.state
    }
}

/// Token of a running processing script, tagged with the id returned by
/// [`SessionStore::register_task`]
struct TaskEntry {
    task_id: Uuid,
    token: CancellationToken,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    /// Cancellation tokens for running processing scripts
    cancellation_tokens: Arc<RwLock<HashMap<Uuid, TaskEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session at step 1 and return its id
    pub async fn create(&self) -> Uuid {
        let state = ProcessState::new();
        let session_id = state.session_id;
        self.sessions.write().await.insert(
            session_id,
            SessionEntry {
                state,
                last_seen: Instant::now(),
            },
        );
        info!(session_id = %session_id, "Session created");
        session_id
    }

    /// Snapshot of a session's state; counts as activity
    ///
    /// Project data is shared, so the snapshot does not copy records.
    pub async fn get(&self, session_id: Uuid) -> Result<ProcessState> {
        self.sessions
            .write()
            .await
            .get_mut(&session_id)
            .map(|entry| entry.touch().clone())
            .ok_or_else(|| not_found(session_id))
    }

    /// Apply `f` to the session's state under the write lock
    pub async fn update<T, F>(&self, session_id: Uuid, f: F) -> Result<T>
    where
        F: FnOnce(&mut ProcessState) -> Result<T>,
    {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;
        f(entry.touch())
    }

    /// Discard a session, cancelling its processing script if one is running
    pub async fn remove(&self, session_id: Uuid) -> Result<()> {
        self.cancel_task(session_id).await;
        match self.sessions.write().await.remove(&session_id) {
            Some(_) => {
                info!(session_id = %session_id, "Session removed");
                Ok(())
            }
            None => Err(not_found(session_id)),
        }
    }

    /// Remove every session idle for at least `ttl`, cancelling any
    /// processing script it still owns; returns the removed ids
    pub async fn evict_idle(&self, ttl: Duration) -> Vec<Uuid> {
        let expired: Vec<Uuid> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.last_seen.elapsed() >= ttl)
            .map(|(id, _)| *id)
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for session_id in expired {
            // A concurrent delete may have won the race
            if self.remove(session_id).await.is_ok() {
                evicted.push(session_id);
            }
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub async fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remember the token of a newly spawned processing script and return
    /// the task id to pass to [`clear_task`](Self::clear_task)
    ///
    /// A token already registered for the session is cancelled first.
    pub async fn register_task(&self, session_id: Uuid, token: CancellationToken) -> Uuid {
        let task_id = Uuid::new_v4();
        if let Some(previous) = self
            .cancellation_tokens
            .write()
            .await
            .insert(session_id, TaskEntry { task_id, token })
        {
            previous.token.cancel();
        }
        task_id
    }

    /// Cancel the session's processing script; returns whether one was running
    pub async fn cancel_task(&self, session_id: Uuid) -> bool {
        match self.cancellation_tokens.write().await.remove(&session_id) {
            Some(entry) => {
                entry.token.cancel();
                debug!(session_id = %session_id, "Processing task cancelled");
                true
            }
            None => false,
        }
    }

    /// Forget the token once the script has ended on its own
    ///
    /// Only the entry registered under `task_id` is removed; a newer
    /// script registered for the same session keeps its token.
    pub async fn clear_task(&self, session_id: Uuid, task_id: Uuid) {
        let mut tokens = self.cancellation_tokens.write().await;
        if tokens
            .get(&session_id)
            .is_some_and(|entry| entry.task_id == task_id)
        {
            tokens.remove(&session_id);
        }
    }

    pub async fn has_running_task(&self, session_id: Uuid) -> bool {
        self.cancellation_tokens
            .read()
            .await
            .contains_key(&session_id)
    }
}

fn not_found(session_id: Uuid) -> Error {
    Error::NotFound(format!("Session not found: {}", session_id))
}
