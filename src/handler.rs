//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, hub
//! registration, inbound dispatch and outbound frame writing.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::connection::{Transport, TransportEnd};
use crate::dispatch::Dispatcher;
use crate::error::{AppError, DispatchError};
use crate::message::Frame;
use crate::server::ServerHandle;
use crate::socket::Socket;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers with the hub, and runs the
/// read and write tasks until either side ends.
pub async fn handle_connection(
    stream: TcpStream,
    server: ServerHandle,
    dispatcher: Arc<Dispatcher>,
    outbound_buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Register with the hub
    let (transport, end) = Transport::channel(outbound_buffer);
    let outbox = transport.outbox().clone();
    let client_id = server
        .connect(transport)
        .await
        .map_err(|_| AppError::ServerClosed)?;
    info!("Client {} connected from {}", client_id, peer_addr);

    let socket = Socket::new(client_id, server.clone(), outbox);
    let (stop_tx, mut stop_rx) = watch::channel(false);

    // Read task: each frame is fully dispatched before the next is read
    let read_server = server.clone();
    let mut read_task = tokio::spawn(async move {
        loop {
            let msg_result = tokio::select! {
                next = ws_receiver.next() => match next {
                    Some(msg_result) => msg_result,
                    None => break,
                },
                _ = stop_rx.changed() => break,
            };

            match msg_result {
                Ok(Message::Text(text)) => {
                    match dispatcher.dispatch_text(&socket, &text).await {
                        Ok(()) => {}
                        Err(DispatchError::Middleware(e)) => {
                            debug!("Dispatch for {} aborted: {}", client_id, e);
                        }
                        Err(e) => warn!("Dropped frame from {}: {}", client_id, e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", client_id);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", client_id);
                    if read_server.pong(client_id).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Write task: frames from the hub and dispatcher to the socket
    let mut write_task = tokio::spawn(async move {
        let TransportEnd {
            mut frames,
            mut terminate,
        } = end;
        let mut terminated = false;

        loop {
            let frame = tokio::select! {
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
                killed = &mut terminate => {
                    terminated = killed.is_ok();
                    break;
                }
            };

            let msg = match frame {
                Frame::Text(text) => Message::Text(text.to_string().into()),
                Frame::Ping => Message::Ping(Default::default()),
            };
            if let Err(e) = ws_sender.send(msg).await {
                debug!("WebSocket send failed for {}: {}", client_id, e);
                break;
            }
        }

        if terminated {
            debug!("Client {} terminated without close handshake", client_id);
        } else {
            // Send close frame when done
            let _ = ws_sender.close().await;
        }
    });

    // Wait for either task to complete
    let writer_done = tokio::select! {
        _ = &mut read_task => false,
        _ = &mut write_task => true,
    };

    if writer_done {
        // Let any in-flight dispatch finish, then stop reading
        let _ = stop_tx.send(true);
        let _ = read_task.await;
    }

    // Cleanup is idempotent, so a connection reaped by the heartbeat is fine here
    let _ = server.disconnect(client_id).await;

    if !writer_done {
        // Ends once the hub has dropped this connection's transport
        let _ = write_task.await;
    }

    info!("Client {} disconnected", client_id);

    Ok(())
}
