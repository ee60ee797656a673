use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the battleship server
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub rejected_connections: AtomicU64,
    pub websocket_messages_dropped: AtomicU64,

    // Account metrics
    pub registrations: AtomicU64,
    pub logins: AtomicU64,
    pub login_failures: AtomicU64,

    // Matchmaking and lobby metrics
    pub queue_entries: AtomicU64,
    pub matchmaking_sweeps: AtomicU64,
    pub rooms_created: AtomicU64,
    pub rooms_joined: AtomicU64,

    // Match metrics
    pub matches_created: AtomicU64,
    pub matches_completed: AtomicU64,
    pub moves_processed: AtomicU64,

    // Error metrics
    pub persistence_failures: AtomicU64,
    pub protocol_errors: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub accounts: AccountMetrics,
    pub matchmaking: MatchmakingMetrics,
    pub matches: MatchMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub rejected_connections: u64,
    pub websocket_messages_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountMetrics {
    pub registrations: u64,
    pub logins: u64,
    pub login_failures: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchmakingMetrics {
    pub queue_entries: u64,
    pub sweeps: u64,
    pub rooms_created: u64,
    pub rooms_joined: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MatchMetrics {
    pub matches_created: u64,
    pub matches_completed: u64,
    pub moves_processed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorMetrics {
    pub persistence_failures: u64,
    pub protocol_errors: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Connection metrics
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // Use fetch_update for atomic check-then-decrement to prevent underflow
        let _ =
            self.active_connections
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    current.checked_sub(1)
                });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected_connections(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_websocket_messages_dropped(&self) {
        self.websocket_messages_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    // Account metrics
    pub fn increment_registrations(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_logins(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_login_failures(&self) {
        self.login_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Matchmaking and lobby metrics
    pub fn increment_queue_entries(&self) {
        self.queue_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matchmaking_sweeps(&self) {
        self.matchmaking_sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_joined(&self) {
        self.rooms_joined.fetch_add(1, Ordering::Relaxed);
    }

    // Match metrics
    pub fn increment_matches_created(&self) {
        self.matches_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches_completed(&self) {
        self.matches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_moves_processed(&self) {
        self.moves_processed.fetch_add(1, Ordering::Relaxed);
    }

    // Error metrics
    pub fn increment_persistence_failures(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_protocol_errors(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: load(&self.total_connections),
                active_connections: load(&self.active_connections),
                disconnections: load(&self.disconnections),
                rejected_connections: load(&self.rejected_connections),
                websocket_messages_dropped: load(&self.websocket_messages_dropped),
            },
            accounts: AccountMetrics {
                registrations: load(&self.registrations),
                logins: load(&self.logins),
                login_failures: load(&self.login_failures),
            },
            matchmaking: MatchmakingMetrics {
                queue_entries: load(&self.queue_entries),
                sweeps: load(&self.matchmaking_sweeps),
                rooms_created: load(&self.rooms_created),
                rooms_joined: load(&self.rooms_joined),
            },
            matches: MatchMetrics {
                matches_created: load(&self.matches_created),
                matches_completed: load(&self.matches_completed),
                moves_processed: load(&self.moves_processed),
            },
            errors: ErrorMetrics {
                persistence_failures: load(&self.persistence_failures),
                protocol_errors: load(&self.protocol_errors),
            },
        }
    }
}
