// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-connection read/write loops
// - sending: serialization of outbound frames
// - routes: HTTP router and the serve loop
// - metrics: JSON metrics endpoint

mod connection;
mod handler;
mod metrics;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::metrics_handler;
pub use routes::{create_router, serve, shutdown_signal};
