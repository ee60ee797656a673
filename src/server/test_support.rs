//! Helpers shared by the server's sibling test modules.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use super::{GameServer, ServerConfig};
use crate::config::ProtocolConfig;
use crate::database::{GameDatabase, InMemoryDatabase};
use crate::game::{FleetPlacement, Orientation, ShipPlacement, ShipType};
use crate::protocol::{ClientMessage, ConnectionId, MatchId, PlayerIdentity, ServerMessage, UserId};
use crate::security::hash_password;

pub(super) fn create_test_server() -> Arc<GameServer> {
    create_test_server_with(ServerConfig::default())
}

pub(super) fn create_test_server_with(config: ServerConfig) -> Arc<GameServer> {
    let database: Arc<dyn GameDatabase> = Arc::new(InMemoryDatabase::new());
    GameServer::with_database(config, ProtocolConfig::default(), database)
}

pub(super) struct TestClient {
    pub connection_id: ConnectionId,
    pub receiver: mpsc::Receiver<Arc<ServerMessage>>,
}

impl TestClient {
    pub async fn recv(&mut self) -> ServerMessage {
        let message = timeout(Duration::from_millis(500), self.receiver.recv())
            .await
            .expect("timed out waiting for server message")
            .expect("client channel closed");
        message.as_ref().clone()
    }

    pub async fn assert_silent(&mut self) {
        assert!(
            timeout(Duration::from_millis(50), self.receiver.recv())
                .await
                .unwrap_or(None)
                .is_none(),
            "expected no message"
        );
    }

    pub async fn send(&self, server: &GameServer, message: ClientMessage) {
        server.handle_client_message(&self.connection_id, message).await;
    }
}

pub(super) fn connect(server: &GameServer, port: u16) -> TestClient {
    let (sender, receiver) = mpsc::channel(64);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let connection_id = server
        .register_client(sender, addr)
        .expect("client registration succeeds");
    TestClient {
        connection_id,
        receiver,
    }
}

/// Register and log in `username`, consuming both replies.
pub(super) async fn login(server: &GameServer, client: &mut TestClient, username: &str) -> PlayerIdentity {
    client
        .send(
            server,
            ClientMessage::RegisterReq {
                username: username.to_string(),
                password: "password".to_string(),
            },
        )
        .await;
    let registered = client.recv().await;
    assert!(
        matches!(&registered, ServerMessage::RegisterRes(result) if result.is_success()),
        "unexpected register reply: {registered:?}"
    );
    login_existing(server, client, username).await
}

/// Log in an account created earlier with the password `password`.
pub(super) async fn login_existing(
    server: &GameServer,
    client: &mut TestClient,
    username: &str,
) -> PlayerIdentity {
    client
        .send(
            server,
            ClientMessage::LoginReq {
                username: username.to_string(),
                password: "password".to_string(),
            },
        )
        .await;
    match client.recv().await {
        ServerMessage::LoginRes {
            result: 1,
            user_id: Some(user_id),
            username: Some(username),
            elo: Some(elo),
            ..
        } => PlayerIdentity {
            user_id,
            username,
            elo,
        },
        other => panic!("unexpected login reply: {other:?}"),
    }
}

/// Create an account directly in storage with the given rating.
pub(super) async fn seed_account(server: &GameServer, username: &str, elo: i32) -> UserId {
    let user = server
        .database()
        .create_user(username, &hash_password("password"))
        .await
        .unwrap();
    assert!(server.database().update_user_elo(user.id, elo).await.unwrap());
    user.id
}

/// Seed an account with `elo`, log it in and put it in the matchmaking queue.
pub(super) async fn queue_player(
    server: &GameServer,
    client: &mut TestClient,
    username: &str,
    elo: i32,
) -> PlayerIdentity {
    seed_account(server, username, elo).await;
    let identity = login_existing(server, client, username).await;
    client.send(server, ClientMessage::QueueEnterReq).await;
    assert!(
        matches!(client.recv().await, ServerMessage::QueueEnterRes(r) if r.is_success()),
        "queue enter rejected for {username}"
    );
    identity
}

/// Five ships stacked in rows 0-4, all anchored at column 0.
pub(super) fn standard_fleet() -> FleetPlacement {
    let mut fleet = FleetPlacement::default();
    for (row, ship_type) in ShipType::ALL.into_iter().enumerate() {
        fleet.set(
            ship_type,
            ShipPlacement(row as i32, 0, Orientation::Horizontal),
        );
    }
    fleet
}

/// Every cell occupied by [`standard_fleet`].
pub(super) fn standard_fleet_cells() -> Vec<(i32, i32)> {
    ShipType::ALL
        .into_iter()
        .enumerate()
        .flat_map(|(row, ship_type)| (0..ship_type.size() as i32).map(move |col| (row as i32, col)))
        .collect()
}

/// Empty cells of [`standard_fleet`], in a fixed order.
pub(super) fn open_water() -> Vec<(i32, i32)> {
    (5..10).flat_map(|row| (0..10).map(move |col| (row, col))).collect()
}

/// Host creates a room, guest joins it. Returns the match id from `MATCH_FOUND`.
pub(super) async fn start_room_match(
    server: &GameServer,
    host: &mut TestClient,
    guest: &mut TestClient,
) -> (MatchId, UserId) {
    host.send(server, ClientMessage::CreateRoomReq).await;
    let code = match host.recv().await {
        ServerMessage::CreateRoomRes {
            result: 1,
            code: Some(code),
            ..
        } => code,
        other => panic!("unexpected create reply: {other:?}"),
    };

    guest
        .send(server, ClientMessage::JoinRoomReq { code })
        .await;
    let host_found = host.recv().await;
    let guest_found = guest.recv().await;
    assert_eq!(host_found, guest_found);
    match host_found {
        ServerMessage::MatchFound {
            match_id,
            first_turn,
            ..
        } => (match_id, first_turn),
        other => panic!("unexpected match notification: {other:?}"),
    }
}

/// Both players submit the standard fleet; returns the announced first turn.
pub(super) async fn place_both_fleets(
    server: &GameServer,
    match_id: MatchId,
    players: [(&mut TestClient, UserId); 2],
) -> UserId {
    let [(first, first_id), (second, second_id)] = players;
    first
        .send(
            server,
            ClientMessage::PlaceShip {
                match_id,
                user_id: first_id,
                ships: standard_fleet(),
            },
        )
        .await;
    assert!(matches!(first.recv().await, ServerMessage::PlaceShipRes(r) if r.is_success()));

    second
        .send(
            server,
            ClientMessage::PlaceShip {
                match_id,
                user_id: second_id,
                ships: standard_fleet(),
            },
        )
        .await;
    assert!(matches!(second.recv().await, ServerMessage::PlaceShipRes(r) if r.is_success()));

    let first_start = first.recv().await;
    assert_eq!(first_start, second.recv().await);
    match first_start {
        ServerMessage::MatchStart { current_turn, .. } => current_turn,
        other => panic!("unexpected start notification: {other:?}"),
    }
}
