//! Application entry point
//!
//! Collects event registrations, then binds a listener and serves
//! connections. Each `App` owns its own hub, so several can run in one
//! process.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::heartbeat::HeartbeatMonitor;
use crate::middleware::Middleware;
use crate::router::EventRouter;
use crate::server::{Hub, ServerCommand, ServerHandle};
use crate::types::OneOrMany;

pub struct App {
    config: ServerConfig,
    router: EventRouter,
    handle: ServerHandle,
    receiver: mpsc::Receiver<ServerCommand>,
}

impl App {
    pub fn new(config: ServerConfig) -> Self {
        let (cmd_tx, receiver) = mpsc::channel(config.command_buffer.max(1));
        Self {
            config,
            router: EventRouter::new(),
            handle: ServerHandle::new(cmd_tx),
            receiver,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register middleware for one or more events
    ///
    /// ```ignore
    /// app.on("chat", from_fn(|_, _| Ok(())));
    /// app.on(["join", "rejoin"], vec![validate, join]);
    /// ```
    pub fn on(
        &mut self,
        events: impl Into<OneOrMany<String>>,
        middleware: impl Into<OneOrMany<Arc<dyn Middleware>>>,
    ) -> &mut Self {
        self.router.on(events, middleware);
        self
    }

    /// Handle for server-initiated broadcasts (`handle.broadcast(room, event, data)`)
    ///
    /// Take it before calling `listen`/`serve`. Commands sent before the
    /// server starts are queued and answered once it runs.
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Bind the configured address and serve forever
    pub async fn listen(self) -> Result<(), AppError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serve connections from `listener` until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        let App {
            config,
            router,
            handle,
            receiver,
        } = self;

        info!("WebSocket event server listening on {}", listener.local_addr()?);

        let hub = Hub::new(receiver, HeartbeatMonitor::new(config.heartbeat_interval));
        tokio::spawn(hub.run());

        let dispatcher = Arc::new(Dispatcher::new(router));
        tokio::pin!(shutdown);

        // Connection accept loop
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let handle = handle.clone();
                        let dispatcher = dispatcher.clone();
                        let outbound_buffer = config.outbound_buffer;

                        // Spawn handler task for each connection
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, handle, dispatcher, outbound_buffer).await
                            {
                                error!("Connection handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }

        Ok(())
    }
}
