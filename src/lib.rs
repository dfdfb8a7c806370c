//! WebSocket Event Hub Library
//!
//! A WebSocket server where clients send named events, each handled by an
//! ordered stack of middleware, and where connections can join rooms and
//! broadcast to them.
//!
//! # Features
//! - Per-event middleware stacks with request/reply correlation
//! - Rooms with multicast broadcast (sender excluded)
//! - Server-initiated broadcasts
//! - Heartbeat ping/pong with reaping of dead connections
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Hub` is the central actor owning the connection registry and rooms
//! - Each connection has a `handler` with a read task (dispatch) and a write task
//! - No locks needed - all state access goes through message passing
//!
//! # Wire format
//! - inbound: `{"e": event, "c": callback?, "d": data?}`
//! - reply: `{"c": callback, "d": result}` or `{"c": callback, "d": {"error": {...}}}`
//! - broadcast: `{"e": event, "d": data}`
//!
//! # Example
//! ```ignore
//! use ws_event_hub::{from_fn, App, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ws_event_hub::AppError> {
//!     let mut app = App::new(ServerConfig::default().with_port(8080));
//!     app.on("echo", from_fn(|_, scope| {
//!         scope.response = scope.request.clone();
//!         Ok(())
//!     }));
//!     app.listen().await
//! }
//! ```

pub mod app;
pub mod broadcast;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod heartbeat;
pub mod message;
pub mod middleware;
pub mod registry;
pub mod room;
pub mod router;
pub mod server;
pub mod socket;
pub mod types;

// Re-export main types for convenience
pub use app::App;
pub use config::ServerConfig;
pub use connection::{Connection, Transport};
pub use dispatch::Dispatcher;
pub use error::{AppError, DispatchError, MiddlewareError, SendError};
pub use handler::handle_connection;
pub use heartbeat::HeartbeatMonitor;
pub use message::{Frame, InboundMessage, OutboundMessage};
pub use middleware::{from_fn, DispatchScope, Middleware, MiddlewareResult};
pub use registry::ConnectionRegistry;
pub use room::RoomDirectory;
pub use router::EventRouter;
pub use server::{Hub, ServerCommand, ServerHandle};
pub use socket::Socket;
pub use types::{ClientId, OneOrMany};

// Middleware authors implement `Middleware` with this attribute
pub use async_trait::async_trait;
