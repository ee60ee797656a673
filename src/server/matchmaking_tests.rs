use super::test_support::{connect, create_test_server, create_test_server_with, queue_player};
use super::ServerConfig;
use crate::game::SessionPhase;
use crate::protocol::{ClientMessage, OperationResult, ServerMessage};
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn compatible_players_are_paired_by_the_sweep() {
    let server = create_test_server();
    let mut a = connect(&server, 53000);
    let mut b = connect(&server, 53001);
    let a_identity = queue_player(&server, &mut a, "alpha", 1000).await;
    let b_identity = queue_player(&server, &mut b, "bravo", 1150).await;
    assert_eq!(server.queue_len().await, 2);

    assert_eq!(server.run_matchmaking_sweep().await, 1);

    let found_a = a.recv().await;
    assert_eq!(found_a, b.recv().await);
    let ServerMessage::MatchFound {
        match_id,
        player1,
        player2,
        ..
    } = found_a
    else {
        panic!("expected MATCH_FOUND, got {found_a:?}");
    };
    assert_eq!(player1, a_identity.username);
    assert_eq!(player2, b_identity.username);
    assert_eq!(server.match_phase(match_id), Some(SessionPhase::Created));
    assert_eq!(server.queue_len().await, 0);

    let status = server.player_status(&a.connection_id).unwrap();
    assert!(status.in_game && !status.in_queue);
    assert_eq!(server.active_match_for(b_identity.user_id), Some(match_id));
}

#[tokio::test]
async fn rating_gap_above_limit_is_not_paired() {
    let server = create_test_server();
    let mut a = connect(&server, 53002);
    let mut b = connect(&server, 53003);
    queue_player(&server, &mut a, "low", 1000).await;
    queue_player(&server, &mut b, "high", 1201).await;

    assert_eq!(server.run_matchmaking_sweep().await, 0);

    a.assert_silent().await;
    b.assert_silent().await;
    assert_eq!(server.queue_len().await, 2);
}

#[tokio::test]
async fn queue_enter_and_exit_are_guarded() {
    let server = create_test_server();
    let mut client = connect(&server, 53004);
    queue_player(&server, &mut client, "twice", 1000).await;

    client.send(&server, ClientMessage::QueueEnterReq).await;
    assert_eq!(
        client.recv().await,
        ServerMessage::QueueEnterRes(OperationResult::failure("Already in queue."))
    );

    client.send(&server, ClientMessage::QueueExitReq).await;
    assert_eq!(
        client.recv().await,
        ServerMessage::QueueExitRes(OperationResult::success())
    );

    client.send(&server, ClientMessage::QueueExitReq).await;
    assert_eq!(
        client.recv().await,
        ServerMessage::QueueExitRes(OperationResult::failure("Not in queue."))
    );
    assert_eq!(server.queue_len().await, 0);
}

#[tokio::test]
async fn full_queue_rejects_new_entries() {
    let server = create_test_server_with(ServerConfig {
        max_queue_size: 1,
        ..ServerConfig::default()
    });
    let mut first = connect(&server, 53005);
    let mut second = connect(&server, 53006);
    queue_player(&server, &mut first, "first", 1000).await;

    super::test_support::seed_account(&server, "second", 1000).await;
    super::test_support::login_existing(&server, &mut second, "second").await;
    second.send(&server, ClientMessage::QueueEnterReq).await;

    assert_eq!(
        second.recv().await,
        ServerMessage::QueueEnterRes(OperationResult::failure("Matchmaking queue is full."))
    );
    assert!(!server.player_status(&second.connection_id).unwrap().in_queue);
}

#[tokio::test]
async fn disconnected_player_leaves_the_queue() {
    let server = create_test_server();
    let mut gone = connect(&server, 53007);
    let mut stays = connect(&server, 53008);
    queue_player(&server, &mut gone, "gone", 1000).await;
    queue_player(&server, &mut stays, "stays", 1000).await;

    server.unregister_client(&gone.connection_id).await;

    assert_eq!(server.queue_len().await, 1);
    assert_eq!(server.run_matchmaking_sweep().await, 0);
    stays.assert_silent().await;
}

#[tokio::test]
async fn failed_pairing_keeps_queue_order() {
    let server = create_test_server_with(ServerConfig {
        max_matches: 0,
        ..ServerConfig::default()
    });
    let mut a = connect(&server, 53009);
    let mut b = connect(&server, 53010);
    let mut c = connect(&server, 53011);
    queue_player(&server, &mut a, "first", 1000).await;
    queue_player(&server, &mut b, "second", 1000).await;
    queue_player(&server, &mut c, "third", 1000).await;
    let before = server.queued_players().await;

    assert_eq!(server.run_matchmaking_sweep().await, 0);

    assert_eq!(server.queued_players().await, before);
    for client in [&a, &b, &c] {
        let status = server.player_status(&client.connection_id).unwrap();
        assert!(status.in_queue && !status.in_game);
    }
}

#[tokio::test]
async fn background_sweep_pairs_and_stops_on_shutdown() {
    let server = create_test_server_with(ServerConfig {
        matchmaking_interval: Duration::from_millis(10),
        ..ServerConfig::default()
    });
    let handle = server.spawn_matchmaking();
    let mut a = connect(&server, 53012);
    let mut b = connect(&server, 53013);
    queue_player(&server, &mut a, "auto1", 1000).await;
    queue_player(&server, &mut b, "auto2", 1100).await;

    assert!(matches!(a.recv().await, ServerMessage::MatchFound { .. }));
    assert!(matches!(b.recv().await, ServerMessage::MatchFound { .. }));

    server.shutdown();
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweep task stops after shutdown")
        .unwrap();
}
