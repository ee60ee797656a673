use broadside_server::{
    config::ProtocolConfig,
    database::DatabaseConfig,
    game::{FleetPlacement, Orientation, ShipPlacement, ShipType},
    protocol::{ClientMessage, ConnectionId, MatchId, PlayerIdentity, ServerMessage, UserId},
    security::hash_password,
    server::{GameServer, ServerConfig},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

/// Create a test server with in-memory backend for integration tests
#[allow(dead_code)]
pub async fn create_test_server() -> Arc<GameServer> {
    create_test_server_with_config(test_server_config()).await
}

/// Create a test server with custom configuration and in-memory backend
#[allow(dead_code)]
pub async fn create_test_server_with_config(server_config: ServerConfig) -> Arc<GameServer> {
    GameServer::new(
        server_config,
        ProtocolConfig::default(),
        DatabaseConfig::InMemory,
    )
    .await
    .expect("Failed to create test server")
}

/// Default server configuration optimized for testing
#[allow(dead_code)]
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        max_connections: 1000,
        max_connections_per_ip: 1000, // every test client shares 127.0.0.1
        matchmaking_interval: Duration::from_millis(20),
        ..ServerConfig::default()
    }
}

/// A registered connection whose outbound channel the test reads directly.
#[allow(dead_code)]
pub struct TestClient {
    pub connection_id: ConnectionId,
    pub receiver: mpsc::Receiver<Arc<ServerMessage>>,
}

#[allow(dead_code)]
impl TestClient {
    pub async fn connect(server: &GameServer) -> Self {
        let (sender, receiver) = mpsc::channel(128);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let connection_id = server
            .register_client(sender, addr)
            .expect("client registration succeeds");
        Self {
            connection_id,
            receiver,
        }
    }

    pub async fn send(&self, server: &GameServer, message: ClientMessage) {
        server
            .handle_client_message(&self.connection_id, message)
            .await;
    }

    pub async fn recv(&mut self) -> ServerMessage {
        let message = timeout(Duration::from_secs(2), self.receiver.recv())
            .await
            .expect("timed out waiting for server message")
            .expect("client channel closed");
        message.as_ref().clone()
    }

    /// Send `message` and return the next message addressed to this client.
    pub async fn request(&mut self, server: &GameServer, message: ClientMessage) -> ServerMessage {
        self.send(server, message).await;
        self.recv().await
    }

    pub async fn assert_silent(&mut self) {
        let next = timeout(Duration::from_millis(100), self.receiver.recv()).await;
        assert!(
            !matches!(next, Ok(Some(_))),
            "expected no message, got {next:?}"
        );
    }

    /// Register `username` with password `password` and log in.
    pub async fn sign_up(&mut self, server: &GameServer, username: &str) -> PlayerIdentity {
        let registered = self
            .request(
                server,
                ClientMessage::RegisterReq {
                    username: username.to_string(),
                    password: "password".to_string(),
                },
            )
            .await;
        assert!(
            matches!(&registered, ServerMessage::RegisterRes(r) if r.is_success()),
            "unexpected register reply: {registered:?}"
        );
        self.log_in(server, username).await
    }

    pub async fn log_in(&mut self, server: &GameServer, username: &str) -> PlayerIdentity {
        let reply = self
            .request(
                server,
                ClientMessage::LoginReq {
                    username: username.to_string(),
                    password: "password".to_string(),
                },
            )
            .await;
        match reply {
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
}

/// Create an account directly in storage with the given rating.
#[allow(dead_code)]
pub async fn seed_account(server: &GameServer, username: &str, elo: i32) -> UserId {
    let user = server
        .database()
        .create_user(username, &hash_password("password"))
        .await
        .expect("account is created");
    assert!(server
        .database()
        .update_user_elo(user.id, elo)
        .await
        .expect("rating is stored"));
    user.id
}

/// Seed, log in and enqueue a player.
#[allow(dead_code)]
pub async fn queued_client(server: &GameServer, username: &str, elo: i32) -> (TestClient, PlayerIdentity) {
    seed_account(server, username, elo).await;
    let mut client = TestClient::connect(server).await;
    let identity = client.log_in(server, username).await;
    let reply = client.request(server, ClientMessage::QueueEnterReq).await;
    assert!(
        matches!(&reply, ServerMessage::QueueEnterRes(r) if r.is_success()),
        "queue enter rejected: {reply:?}"
    );
    (client, identity)
}

/// Five ships stacked in rows 0-4, anchored at column 0.
#[allow(dead_code)]
pub fn standard_fleet() -> FleetPlacement {
    let mut fleet = FleetPlacement::default();
    for (row, ship_type) in ShipType::ALL.into_iter().enumerate() {
        fleet.set(
            ship_type,
            ShipPlacement(row as i32, 0, Orientation::Horizontal),
        );
    }
    fleet
}

/// Cells of [`standard_fleet`], ship by ship.
#[allow(dead_code)]
pub fn standard_fleet_cells() -> Vec<(i32, i32)> {
    ShipType::ALL
        .into_iter()
        .enumerate()
        .flat_map(|(row, ship_type)| (0..ship_type.size() as i32).map(move |col| (row as i32, col)))
        .collect()
}

/// Water cells of [`standard_fleet`].
#[allow(dead_code)]
pub fn open_water() -> Vec<(i32, i32)> {
    (5..10)
        .flat_map(|row| (0..10).map(move |col| (row, col)))
        .collect()
}

/// Read `MATCH_FOUND` from both clients and check they agree.
#[allow(dead_code)]
pub async fn expect_match_found(a: &mut TestClient, b: &mut TestClient) -> (MatchId, UserId) {
    let found = a.recv().await;
    assert_eq!(found, b.recv().await);
    match found {
        ServerMessage::MatchFound {
            match_id,
            first_turn,
            ..
        } => (match_id, first_turn),
        other => panic!("expected MATCH_FOUND, got {other:?}"),
    }
}

/// Both players place [`standard_fleet`]; returns the `current_turn` of `MATCH_START`.
#[allow(dead_code)]
pub async fn place_fleets(
    server: &GameServer,
    match_id: MatchId,
    (a, a_id): (&mut TestClient, UserId),
    (b, b_id): (&mut TestClient, UserId),
) -> UserId {
    for (client, user_id) in [(&mut *a, a_id), (&mut *b, b_id)] {
        let reply = client
            .request(
                server,
                ClientMessage::PlaceShip {
                    match_id,
                    user_id,
                    ships: standard_fleet(),
                },
            )
            .await;
        assert!(
            matches!(&reply, ServerMessage::PlaceShipRes(r) if r.is_success()),
            "placement rejected: {reply:?}"
        );
    }

    let start = a.recv().await;
    assert_eq!(start, b.recv().await);
    match start {
        ServerMessage::MatchStart { current_turn, .. } => current_turn,
        other => panic!("expected MATCH_START, got {other:?}"),
    }
}
