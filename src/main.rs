//! WebSocket Event Hub - Entry Point
//!
//! Registers a small set of demo events and starts the server.
//!
//! Events:
//! - `echo`: replies with the request data
//! - `join` / `leave`: `{"room": name}`, room membership
//! - `say`: `{"room": name, "text": ...}`, broadcast `chat` to the room

use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ws_event_hub::{
    async_trait, from_fn, App, DispatchScope, Middleware, MiddlewareError, MiddlewareResult,
    ServerConfig, Socket,
};

/// Rejects requests without a non-empty `room` string
fn require_room(_socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult {
    match scope.param_str("room") {
        Some(room) if !room.is_empty() => Ok(()),
        _ => Err(MiddlewareError::new("BadRequest", "a room name is required")),
    }
}

fn room_of(scope: &DispatchScope) -> String {
    scope.param_str("room").unwrap_or_default().to_string()
}

struct JoinRoom;

#[async_trait]
impl Middleware for JoinRoom {
    async fn handle(&self, socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult {
        let room = room_of(scope);
        let joined = socket.join(&room).await?;
        if joined {
            socket
                .broadcast(&room, "joined", serde_json::json!({ "id": socket.id().to_string() }))
                .await?;
        }
        scope.set("room", room.into());
        Ok(())
    }
}

struct LeaveRoom;

#[async_trait]
impl Middleware for LeaveRoom {
    async fn handle(&self, socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult {
        let left = match scope.param_str("room") {
            Some(room) => usize::from(socket.leave(room).await?),
            None => socket.leave_all().await?,
        };
        scope.set("left", left.into());
        Ok(())
    }
}

struct Say;

#[async_trait]
impl Middleware for Say {
    async fn handle(&self, socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult {
        let room = room_of(scope);
        let text = scope.param("text").cloned().unwrap_or_default();
        let data = serde_json::json!({ "from": socket.id().to_string(), "text": text });
        let delivered = socket.broadcast(&room, "chat", data).await?;
        scope.set("delivered", delivered.into());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // e.g., RUST_LOG=debug or RUST_LOG=ws_event_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ws_event_hub=info")),
        )
        .init();

    // Bind address from command line overrides the environment
    let mut config = ServerConfig::from_env()?;
    if let Some(addr) = env::args().nth(1) {
        config = config.with_bind_addr(addr.parse()?);
    }

    let mut app = App::new(config);
    app.on(
        "echo",
        from_fn(|_, scope| {
            scope.response = scope.request.clone();
            Ok(())
        }),
    )
    .on(["join", "say"], from_fn(require_room))
    .on("join", Arc::new(JoinRoom) as Arc<dyn Middleware>)
    .on("leave", Arc::new(LeaveRoom) as Arc<dyn Middleware>)
    .on("say", Arc::new(Say) as Arc<dyn Middleware>);

    info!("Starting on {}", app.config().bind_addr);
    app.listen().await?;

    Ok(())
}
