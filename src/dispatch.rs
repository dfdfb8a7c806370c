//! Dispatch engine
//!
//! Runs one inbound frame through its event's middleware stack and sends
//! the reply when the client asked for one.

use std::sync::Arc;

use tracing::debug;

use crate::error::DispatchError;
use crate::message::{InboundMessage, ReplyData};
use crate::middleware::{DispatchScope, Middleware, MiddlewareResult};
use crate::router::EventRouter;
use crate::socket::Socket;

#[derive(Debug)]
pub struct Dispatcher {
    router: EventRouter,
}

impl Dispatcher {
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }

    /// Parse a text frame and dispatch it
    pub async fn dispatch_text(&self, socket: &Socket, text: &str) -> Result<(), DispatchError> {
        let message: InboundMessage = serde_json::from_str(text)?;
        self.dispatch(socket, message).await
    }

    /// Run a parsed message through its stack.
    ///
    /// Unknown events are dropped without a reply, even when a callback id
    /// was supplied. A middleware error is replied (if requested) and also
    /// returned so the caller can log it.
    pub async fn dispatch(&self, socket: &Socket, message: InboundMessage) -> Result<(), DispatchError> {
        let InboundMessage {
            event,
            callback,
            data,
        } = message;

        let stack = self.router.stack_for(&event);
        if stack.is_empty() {
            return Err(DispatchError::UnknownEvent(event));
        }

        debug!("Dispatching {} for {} ({} middleware)", event, socket.id(), stack.len());
        let mut scope = DispatchScope::new(event, data);
        let outcome = run_stack(stack, socket, &mut scope).await;

        if let Some(callback) = callback {
            let data = match &outcome {
                Ok(()) => ReplyData::Ok(&scope.response),
                Err(error) => ReplyData::Error { error },
            };
            socket.reply(&callback, data);
        }

        outcome.map_err(DispatchError::from)
    }
}

/// Run each middleware in turn, stopping at the first error
async fn run_stack(
    stack: &[Arc<dyn Middleware>],
    socket: &Socket,
    scope: &mut DispatchScope,
) -> MiddlewareResult {
    for middleware in stack {
        middleware.handle(socket, scope).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Transport, TransportEnd};
    use crate::error::MiddlewareError;
    use crate::heartbeat::HeartbeatMonitor;
    use crate::message::Frame;
    use crate::middleware::from_fn;
    use crate::server::spawn_hub;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    async fn socket() -> (Socket, TransportEnd) {
        let handle = spawn_hub(HeartbeatMonitor::new(Duration::from_secs(30)), 16);
        let (transport, end) = Transport::channel(16);
        let outbox = transport.outbox().clone();
        let id = handle.connect(transport).await.unwrap();
        (Socket::new(id, handle, outbox), end)
    }

    fn next_json(end: &mut TransportEnd) -> Value {
        match end.frames.try_recv() {
            Ok(Frame::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Middleware> {
        let log = log.clone();
        from_fn(move |_, _| {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    /// Yields to the runtime before completing
    struct Suspending {
        log: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    }

    #[async_trait]
    impl Middleware for Suspending {
        async fn handle(&self, _socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.log.lock().unwrap().push(self.name);
            scope.set(self.name, json!(true));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_middleware_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        router.on("go", recorder(&log, "m1"));
        router.on(
            "go",
            Arc::new(Suspending {
                log: log.clone(),
                name: "m2",
            }) as Arc<dyn Middleware>,
        );
        router.on("go", recorder(&log, "m3"));
        let dispatcher = Dispatcher::new(router);
        let (socket, mut end) = socket().await;

        dispatcher
            .dispatch_text(&socket, r#"{"e": "go", "c": 1}"#)
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["m1", "m2", "m3"]);
        assert_eq!(next_json(&mut end), json!({"c": 1, "d": {"m2": true}}));
    }

    #[tokio::test]
    async fn test_failure_short_circuits_with_error_reply() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = EventRouter::new();
        router.on("go", recorder(&log, "m1"));
        router.on(
            "go",
            from_fn(|_, scope| {
                scope.set("partial", json!(1));
                Err(MiddlewareError::new("ValidationError", "bad input"))
            }),
        );
        router.on("go", recorder(&log, "m3"));
        let dispatcher = Dispatcher::new(router);
        let (socket, mut end) = socket().await;

        let result = dispatcher
            .dispatch_text(&socket, r#"{"e": "go", "c": "req-1"}"#)
            .await;

        assert!(matches!(result, Err(DispatchError::Middleware(_))));
        assert_eq!(*log.lock().unwrap(), vec!["m1"]);
        assert_eq!(
            next_json(&mut end),
            json!({"c": "req-1", "d": {"error": {"name": "ValidationError", "message": "bad input"}}})
        );
    }

    #[tokio::test]
    async fn test_error_reply_carries_data() {
        let mut router = EventRouter::new();
        router.on(
            "go",
            from_fn(|_, _| Err(MiddlewareError::new("E", "m").with_data(json!({"k": 1})))),
        );
        let dispatcher = Dispatcher::new(router);
        let (socket, mut end) = socket().await;

        let _ = dispatcher.dispatch_text(&socket, r#"{"e": "go", "c": 2}"#).await;

        assert_eq!(next_json(&mut end)["d"]["error"]["data"], json!({"k": 1}));
    }

    #[tokio::test]
    async fn test_request_defaults_and_response() {
        let mut router = EventRouter::new();
        router.on(
            "echo",
            from_fn(|_, scope| {
                scope.response = scope.request.clone();
                Ok(())
            }),
        );
        let dispatcher = Dispatcher::new(router);
        let (socket, mut end) = socket().await;

        dispatcher.dispatch_text(&socket, r#"{"e": "echo", "c": 1}"#).await.unwrap();
        assert_eq!(next_json(&mut end), json!({"c": 1, "d": {}}));

        dispatcher
            .dispatch_text(&socket, r#"{"e": "echo", "c": 2, "d": {"x": [1, 2]}}"#)
            .await
            .unwrap();
        assert_eq!(next_json(&mut end), json!({"c": 2, "d": {"x": [1, 2]}}));
    }

    #[tokio::test]
    async fn test_falsy_callback_still_replied() {
        let mut router = EventRouter::new();
        router.on(
            "echo",
            from_fn(|_, scope| {
                scope.response = scope.request.clone();
                Ok(())
            }),
        );
        let dispatcher = Dispatcher::new(router);
        let (socket, mut end) = socket().await;

        dispatcher.dispatch_text(&socket, r#"{"e": "echo", "c": 0}"#).await.unwrap();
        assert_eq!(next_json(&mut end), json!({"c": 0, "d": {}}));

        dispatcher
            .dispatch_text(&socket, r#"{"e": "echo", "c": "", "d": 0}"#)
            .await
            .unwrap();
        assert_eq!(next_json(&mut end), json!({"c": "", "d": 0}));

        dispatcher
            .dispatch_text(&socket, r#"{"e": "echo", "c": false, "d": false}"#)
            .await
            .unwrap();
        assert_eq!(next_json(&mut end), json!({"c": false, "d": false}));

        // An explicit null is the same as no callback
        dispatcher.dispatch_text(&socket, r#"{"e": "echo", "c": null}"#).await.unwrap();
        assert!(end.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_callback_no_reply() {
        let mut router = EventRouter::new();
        router.on("go", from_fn(|_, _| Ok(())));
        router.on("fail", from_fn(|_, _| Err(MiddlewareError::new("E", "m"))));
        let dispatcher = Dispatcher::new(router);
        let (socket, mut end) = socket().await;

        dispatcher.dispatch_text(&socket, r#"{"e": "go"}"#).await.unwrap();
        assert!(dispatcher.dispatch_text(&socket, r#"{"e": "fail"}"#).await.is_err());

        assert!(end.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_event_and_bad_json_dropped() {
        let dispatcher = Dispatcher::new(EventRouter::new());
        let (socket, mut end) = socket().await;

        let result = dispatcher.dispatch_text(&socket, r#"{"e": "nope", "c": 1}"#).await;
        assert!(matches!(result, Err(DispatchError::UnknownEvent(ref e)) if e == "nope"));

        let result = dispatcher.dispatch_text(&socket, "{not json").await;
        assert!(matches!(result, Err(DispatchError::Parse(_))));

        assert!(end.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reply_to_closed_connection_is_absorbed() {
        let mut router = EventRouter::new();
        router.on("go", from_fn(|_, _| Ok(())));
        let dispatcher = Dispatcher::new(router);
        let (socket, end) = socket().await;
        drop(end);

        let result = dispatcher.dispatch_text(&socket, r#"{"e": "go", "c": 1}"#).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_socket_room_operations() {
        let (socket, mut end) = socket().await;

        assert!(socket.join("lobby").await.unwrap());
        assert!(!socket.join("lobby").await.unwrap());
        // Own broadcast excludes self
        assert_eq!(socket.broadcast("lobby", "chat", json!({})).await.unwrap(), 0);
        assert!(socket.leave("lobby").await.unwrap());
        assert!(!socket.leave("lobby").await.unwrap());

        socket.join("a").await.unwrap();
        socket.join("b").await.unwrap();
        assert_eq!(socket.leave_all().await.unwrap(), 2);

        socket.emit("welcome", &json!({"id": 1})).unwrap();
        assert_eq!(next_json(&mut end), json!({"e": "welcome", "d": {"id": 1}}));
    }
}
