use crate::game::{MatchOutcome, ShotOutcome, DEFAULT_RATING};
use crate::protocol::{MatchId, PlayerResult, UserId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub elo: i32,
    pub wins: u32,
    pub losses: u32,
    pub created_at: DateTime<Utc>,
}

/// Stored match row. `result` stays `IN_PROGRESS` until the match resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    pub result: MatchOutcome,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MatchRecord {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }
}

/// Stored attack. `x` is the column and `y` the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub id: i64,
    pub match_id: MatchId,
    pub player: String,
    pub x: i32,
    pub y: i32,
    pub result: ShotOutcome,
    pub turn_order: u32,
}

/// Attack to append to a match's move log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMove {
    pub match_id: MatchId,
    pub player: String,
    pub x: i32,
    pub y: i32,
    pub result: ShotOutcome,
    pub turn_order: u32,
}

/// Post-match rating and record change for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingUpdate {
    pub user_id: UserId,
    pub new_elo: i32,
    pub result: PlayerResult,
}

/// Typed failures callers may want to tell apart via `anyhow::Error::downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    #[error("username `{0}` already exists")]
    UsernameTaken(String),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("match {0} already has a final result")]
    MatchAlreadyFinished(MatchId),
    #[error("a match cannot be finished as IN_PROGRESS")]
    OutcomeNotFinal,
}

/// Database abstraction trait for accounts, match history and move logs
#[async_trait]
pub trait GameDatabase: Send + Sync {
    /// Initialize the database connection and run migrations
    async fn initialize(&self) -> Result<()>;

    /// Create an account with the default rating. Fails with
    /// [`DatabaseError::UsernameTaken`] on a duplicate username.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>>;

    async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>>;

    /// All accounts ordered by id.
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    async fn update_user_elo(&self, user_id: UserId, elo: i32) -> Result<bool>;

    async fn delete_user(&self, user_id: UserId) -> Result<bool>;

    /// Create an `IN_PROGRESS` match row.
    async fn create_match(&self, player1_id: UserId, player2_id: UserId) -> Result<MatchRecord>;

    async fn get_match(&self, match_id: MatchId) -> Result<Option<MatchRecord>>;

    /// Matches the user took part in, oldest first.
    async fn get_matches_by_user(&self, user_id: UserId) -> Result<Vec<MatchRecord>>;

    async fn update_match_result(&self, match_id: MatchId, result: MatchOutcome) -> Result<bool>;

    /// Store the final result together with every participant's new rating and
    /// win/loss counters. Either all of it is applied or none of it.
    async fn finish_match(
        &self,
        match_id: MatchId,
        result: MatchOutcome,
        ratings: &[RatingUpdate],
    ) -> Result<()>;

    async fn delete_match(&self, match_id: MatchId) -> Result<bool>;

    async fn record_move(&self, new_move: NewMove) -> Result<MoveRecord>;

    /// Moves of a match ordered by `turn_order`.
    async fn get_moves(&self, match_id: MatchId) -> Result<Vec<MoveRecord>>;

    async fn delete_moves_by_match(&self, match_id: MatchId) -> Result<usize>;

    /// Check database health
    async fn health_check(&self) -> bool;
}

/// Database configuration. Only the in-memory backend ships with the server.
#[derive(Debug, Clone, Default)]
pub enum DatabaseConfig {
    #[default]
    InMemory,
}

/// Create database instance based on configuration
pub async fn create_database(config: DatabaseConfig) -> Result<Box<dyn GameDatabase>> {
    match config {
        DatabaseConfig::InMemory => {
            let db = InMemoryDatabase::new();
            db.initialize().await?;
            Ok(Box::new(db))
        }
    }
}

/// In-memory database for tests and single-instance deployments
pub struct InMemoryDatabase {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    /// username -> user id
    usernames: Arc<RwLock<HashMap<String, UserId>>>,
    matches: Arc<RwLock<HashMap<MatchId, MatchRecord>>>,
    moves: Arc<RwLock<HashMap<MatchId, Vec<MoveRecord>>>>,
    next_user_id: AtomicI64,
    next_match_id: AtomicI64,
    next_move_id: AtomicI64,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            usernames: Arc::new(RwLock::new(HashMap::new())),
            matches: Arc::new(RwLock::new(HashMap::new())),
            moves: Arc::new(RwLock::new(HashMap::new())),
            next_user_id: AtomicI64::new(1),
            next_match_id: AtomicI64::new(1),
            next_move_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameDatabase for InMemoryDatabase {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
        // Lock order: usernames before users.
        let mut usernames = self.usernames.write().await;
        if usernames.contains_key(username) {
            return Err(DatabaseError::UsernameTaken(username.to_string()).into());
        }

        let record = UserRecord {
            id: self.next_user_id.fetch_add(1, Ordering::Relaxed),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            elo: DEFAULT_RATING,
            wins: 0,
            losses: 0,
            created_at: Utc::now(),
        };

        self.users.write().await.insert(record.id, record.clone());
        usernames.insert(record.username.clone(), record.id);
        Ok(record)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let Some(user_id) = self.usernames.read().await.get(username).copied() else {
            return Ok(None);
        };
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn update_user_elo(&self, user_id: UserId, elo: i32) -> Result<bool> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(&user_id)
            .map(|user| user.elo = elo)
            .is_some())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<bool> {
        let mut usernames = self.usernames.write().await;
        let removed = self.users.write().await.remove(&user_id);
        match removed {
            Some(user) => {
                usernames.remove(&user.username);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_match(&self, player1_id: UserId, player2_id: UserId) -> Result<MatchRecord> {
        {
            let users = self.users.read().await;
            for user_id in [player1_id, player2_id] {
                if !users.contains_key(&user_id) {
                    return Err(DatabaseError::UserNotFound(user_id).into());
                }
            }
        }

        let record = MatchRecord {
            id: self.next_match_id.fetch_add(1, Ordering::Relaxed),
            player1_id,
            player2_id,
            result: MatchOutcome::InProgress,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.matches.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Option<MatchRecord>> {
        Ok(self.matches.read().await.get(&match_id).cloned())
    }

    async fn get_matches_by_user(&self, user_id: UserId) -> Result<Vec<MatchRecord>> {
        let mut matches: Vec<MatchRecord> = self
            .matches
            .read()
            .await
            .values()
            .filter(|record| record.involves(user_id))
            .cloned()
            .collect();
        matches.sort_by_key(|record| record.id);
        Ok(matches)
    }

    async fn update_match_result(&self, match_id: MatchId, result: MatchOutcome) -> Result<bool> {
        let mut matches = self.matches.write().await;
        let Some(record) = matches.get_mut(&match_id) else {
            return Ok(false);
        };
        record.result = result;
        record.finished_at = result.is_final().then(Utc::now);
        Ok(true)
    }

    async fn finish_match(
        &self,
        match_id: MatchId,
        result: MatchOutcome,
        ratings: &[RatingUpdate],
    ) -> Result<()> {
        if !result.is_final() {
            return Err(DatabaseError::OutcomeNotFinal.into());
        }

        // Lock order: users before matches. Both are held until every change is applied.
        let mut users = self.users.write().await;
        let mut matches = self.matches.write().await;

        let record = matches
            .get_mut(&match_id)
            .ok_or(DatabaseError::MatchNotFound(match_id))?;
        if record.result.is_final() {
            return Err(DatabaseError::MatchAlreadyFinished(match_id).into());
        }
        if let Some(missing) = ratings.iter().find(|u| !users.contains_key(&u.user_id)) {
            return Err(DatabaseError::UserNotFound(missing.user_id).into());
        }

        record.result = result;
        record.finished_at = Some(Utc::now());

        for update in ratings {
            if let Some(user) = users.get_mut(&update.user_id) {
                user.elo = update.new_elo;
                match update.result {
                    PlayerResult::Win => user.wins += 1,
                    PlayerResult::Lose => user.losses += 1,
                    PlayerResult::Draw => {}
                }
            }
        }
        Ok(())
    }

    async fn delete_match(&self, match_id: MatchId) -> Result<bool> {
        Ok(self.matches.write().await.remove(&match_id).is_some())
    }

    async fn record_move(&self, new_move: NewMove) -> Result<MoveRecord> {
        if !self.matches.read().await.contains_key(&new_move.match_id) {
            return Err(DatabaseError::MatchNotFound(new_move.match_id).into());
        }

        let record = MoveRecord {
            id: self.next_move_id.fetch_add(1, Ordering::Relaxed),
            match_id: new_move.match_id,
            player: new_move.player,
            x: new_move.x,
            y: new_move.y,
            result: new_move.result,
            turn_order: new_move.turn_order,
        };
        self.moves
            .write()
            .await
            .entry(record.match_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn get_moves(&self, match_id: MatchId) -> Result<Vec<MoveRecord>> {
        let mut moves = self
            .moves
            .read()
            .await
            .get(&match_id)
            .cloned()
            .unwrap_or_default();
        moves.sort_by_key(|record| record.turn_order);
        Ok(moves)
    }

    async fn delete_moves_by_match(&self, match_id: MatchId) -> Result<usize> {
        Ok(self
            .moves
            .write()
            .await
            .remove(&match_id)
            .map_or(0, |moves| moves.len()))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
