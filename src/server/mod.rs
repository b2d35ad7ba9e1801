//! HTTP and WebSocket transport
//!
//! Live subscribers connect to `/ws/traffic`; each connection is registered
//! for as long as it stays open. New measurements arrive over
//! `POST /traffic-flow/traffic/record` and are announced as they land.

pub mod config;
pub mod listener;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::ServerConfig;
pub use listener::TrafficServer;
pub use routes::{router, ApiError};
pub use state::AppState;
pub use websocket::WebSocketSink;
