#![cfg_attr(not(test), deny(clippy::panic))]

use broadside_server::config;
use broadside_server::database::DatabaseConfig;
use broadside_server::logging;
use broadside_server::server::{GameServer, ServerConfig};
use broadside_server::websocket;
use clap::Parser;
use std::net::SocketAddr;

/// Broadside -- rated, turn-based naval combat over WebSocket
#[derive(Parser, Debug)]
#[command(name = "broadside-server")]
#[command(about = "A WebSocket server for rated, turn-based naval combat matches")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage backend: InMemory");
                println!("  Max connections: {}", cfg.security.max_connections);
                println!("  Max matches: {}", cfg.server.max_matches);
                println!("  Max rooms: {}", cfg.server.max_rooms);
                println!("  Max ELO gap: {}", cfg.matchmaking.max_elo_gap);
                println!("  Sweep interval: {} ms", cfg.matchmaking.interval_ms);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    let _log_guard = logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting Broadside server");

    let game_server = GameServer::new(
        ServerConfig::from_config(&cfg),
        cfg.protocol.clone(),
        DatabaseConfig::InMemory,
    )
    .await?;

    let matchmaking_task = game_server.spawn_matchmaking();
    let shutdown = game_server.shutdown_token();
    tokio::spawn(websocket::shutdown_signal(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.security.cors_origins,
        "Server started over HTTP - WebSocket: /ws, Health: /health, Metrics: /metrics"
    );

    websocket::serve(
        listener,
        game_server.clone(),
        &cfg.security.cors_origins,
        shutdown,
    )
    .await?;

    game_server.shutdown();
    if let Err(err) = matchmaking_task.await {
        tracing::warn!(error = %err, "Matchmaking task ended abnormally");
    }
    tracing::info!("Server stopped");

    Ok(())
}
