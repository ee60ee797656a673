use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::connection_manager::{ConnectionManager, StatusError};
use super::GameServer;
use crate::protocol::{ConnectionId, OperationResult, PlayerIdentity, ServerMessage};

/// A queued player, snapshotted at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingEntry {
    /// Enqueue order; lower values are considered first by the sweep.
    pub sequence: u64,
    pub connection_id: ConnectionId,
    pub identity: PlayerIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Not logged in.")]
    NotLoggedIn,
    #[error("Already in queue.")]
    AlreadyQueued,
    #[error("Already in a match.")]
    InGame,
    #[error("Close your room before entering the queue.")]
    HostingRoom,
    #[error("Matchmaking queue is full.")]
    QueueFull,
    #[error("Not in queue.")]
    NotQueued,
}

impl From<StatusError> for QueueError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::UnknownConnection | StatusError::NotLoggedIn => Self::NotLoggedIn,
            StatusError::AlreadyQueued => Self::AlreadyQueued,
            StatusError::InGame => Self::InGame,
        }
    }
}

/// Greedy pairing over entries in the given order.
///
/// Each outer entry `i` is matched with the first unconsumed `j > i` whose rating
/// differs by at most `max_elo_gap`. Consumed entries are skipped for the rest of
/// the pass and an unmatched outer entry simply stays behind.
pub fn find_compatible_pairs(entries: &[WaitingEntry], max_elo_gap: i32) -> Vec<(usize, usize)> {
    let max_gap = u32::try_from(max_elo_gap).unwrap_or(0);
    let mut consumed = vec![false; entries.len()];
    let mut pairs = Vec::new();

    for (i, outer) in entries.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        let partner = entries
            .iter()
            .enumerate()
            .skip(i + 1)
            .find(|(j, inner)| {
                !consumed[*j] && outer.identity.elo.abs_diff(inner.identity.elo) <= max_gap
            })
            .map(|(j, _)| j);

        if let Some(j) = partner {
            consumed[i] = true;
            consumed[j] = true;
            pairs.push((i, j));
        }
    }

    pairs
}

/// FIFO waiting room for rated matchmaking.
pub(crate) struct MatchmakingQueue {
    entries: Mutex<Vec<WaitingEntry>>,
    next_sequence: AtomicU64,
    capacity: usize,
}

impl MatchmakingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_sequence: AtomicU64::new(0),
            capacity,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn snapshot(&self) -> Vec<WaitingEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn enqueue(
        &self,
        connections: &ConnectionManager,
        connection_id: &ConnectionId,
    ) -> Result<WaitingEntry, QueueError> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity {
            return Err(QueueError::QueueFull);
        }
        let identity = connections.try_mark_queued(connection_id)?;
        let entry = WaitingEntry {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            connection_id: *connection_id,
            identity,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove the connection's entry and clear its queued flag.
    pub async fn dequeue(
        &self,
        connections: &ConnectionManager,
        connection_id: &ConnectionId,
    ) -> bool {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|entry| entry.connection_id != *connection_id);
        let removed = entries.len() != before;
        let was_flagged = connections.clear_queued(connection_id);
        removed || was_flagged
    }

    /// Remove and return every compatible pair found by one greedy pass.
    pub async fn take_compatible_pairs(
        &self,
        max_elo_gap: i32,
    ) -> Vec<(WaitingEntry, WaitingEntry)> {
        let mut entries = self.entries.lock().await;
        let pairs = find_compatible_pairs(&entries, max_elo_gap);
        if pairs.is_empty() {
            return Vec::new();
        }

        let mut slots: Vec<Option<WaitingEntry>> = entries.drain(..).map(Some).collect();
        let taken = pairs
            .iter()
            .filter_map(|&(i, j)| {
                let first = slots.get_mut(i)?.take()?;
                let second = slots.get_mut(j)?.take()?;
                Some((first, second))
            })
            .collect();
        entries.extend(slots.into_iter().flatten());
        taken
    }

    /// Put entries back at their original position. Entries whose connection has
    /// since gone away or logged out are dropped.
    pub async fn requeue(&self, connections: &ConnectionManager, returned: Vec<WaitingEntry>) {
        let mut entries = self.entries.lock().await;
        for entry in returned {
            if !connections.return_to_queue(&entry.connection_id, entry.identity.user_id) {
                continue;
            }
            let position = entries
                .binary_search_by_key(&entry.sequence, |queued| queued.sequence)
                .unwrap_or_else(|position| position);
            entries.insert(position, entry);
        }
    }
}

impl GameServer {
    pub(super) async fn handle_queue_enter(&self, connection_id: &ConnectionId) {
        let reply = match self.enter_queue(connection_id).await {
            Ok(entry) => {
                self.metrics.increment_queue_entries();
                info!(
                    %connection_id,
                    user_id = entry.identity.user_id,
                    elo = entry.identity.elo,
                    "Player entered matchmaking queue"
                );
                OperationResult::success()
            }
            Err(err) => {
                debug!(%connection_id, error = %err, "Queue enter rejected");
                OperationResult::failure(err.to_string())
            }
        };
        self.send_to_connection(connection_id, ServerMessage::QueueEnterRes(reply));
    }

    async fn enter_queue(&self, connection_id: &ConnectionId) -> Result<WaitingEntry, QueueError> {
        let user_id = self
            .connection_manager
            .identity(connection_id)
            .map(|identity| identity.user_id)
            .ok_or(QueueError::NotLoggedIn)?;
        if self.lobbies.is_hosting(user_id) {
            return Err(QueueError::HostingRoom);
        }
        self.matchmaking
            .enqueue(&self.connection_manager, connection_id)
            .await
    }

    pub(super) async fn handle_queue_exit(&self, connection_id: &ConnectionId) {
        let reply = if self
            .matchmaking
            .dequeue(&self.connection_manager, connection_id)
            .await
        {
            info!(%connection_id, "Player left matchmaking queue");
            OperationResult::success()
        } else {
            OperationResult::failure(QueueError::NotQueued.to_string())
        };
        self.send_to_connection(connection_id, ServerMessage::QueueExitRes(reply));
    }

    /// One matchmaking pass. Returns the number of matches started.
    pub async fn run_matchmaking_sweep(&self) -> usize {
        self.metrics.increment_matchmaking_sweeps();
        let pairs = self
            .matchmaking
            .take_compatible_pairs(self.config.max_elo_gap)
            .await;

        let mut started = 0;
        for (first, second) in pairs {
            if self.pair_waiting_entries(first, second).await {
                started += 1;
            }
        }
        if started > 0 {
            debug!(started, "Matchmaking sweep paired players");
        }
        started
    }

    async fn pair_waiting_entries(&self, first: WaitingEntry, second: WaitingEntry) -> bool {
        let connections = &self.connection_manager;
        let promoted_first =
            connections.promote_to_match(&first.connection_id, first.identity.user_id);
        let promoted_second =
            connections.promote_to_match(&second.connection_id, second.identity.user_id);

        let (first_identity, second_identity) = match (promoted_first, promoted_second) {
            (Some(a), Some(b)) => (a, b),
            (a, b) => {
                let mut survivors = Vec::new();
                if a.is_some() {
                    survivors.push(first);
                }
                if b.is_some() {
                    survivors.push(second);
                }
                debug!(
                    survivors = survivors.len(),
                    "Paired player left before promotion; returning survivor to queue"
                );
                self.matchmaking.requeue(connections, survivors).await;
                return false;
            }
        };

        match self
            .start_match(
                (first.connection_id, first_identity),
                (second.connection_id, second_identity),
            )
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    error = %err,
                    first_user = first.identity.user_id,
                    second_user = second.identity.user_id,
                    "Failed to start matched game; returning players to queue"
                );
                self.matchmaking.requeue(connections, vec![first, second]).await;
                false
            }
        }
    }
}
