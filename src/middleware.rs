//! Middleware trait and dispatch scope
//!
//! A middleware is one async step of an event's stack. Returning `Ok(())`
//! hands control to the next step; returning an error skips the rest of
//! the stack and becomes the error reply.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::MiddlewareError;
use crate::socket::Socket;
use crate::types::OneOrMany;

pub type MiddlewareResult = Result<(), MiddlewareError>;

/// Per-message state shared by every middleware in the stack
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchScope {
    /// Event name the message was sent with
    pub event: String,
    /// Request data (`{}` when the client sent none)
    pub request: Value,
    /// Response data sent back with the reply
    pub response: Value,
}

impl DispatchScope {
    pub fn new(event: String, data: Option<Value>) -> Self {
        let request = match data {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(data) => data,
        };
        Self {
            event,
            request,
            response: Value::Object(Map::new()),
        }
    }

    /// Look up a field of the request object
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.request.get(key)
    }

    /// Look up a string field of the request object
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    /// Set a field on the response, replacing a non-object response
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        if !self.response.is_object() {
            self.response = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.response {
            map.insert(key.into(), value);
        }
    }
}

/// One step of an event's middleware stack
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult;
}

/// Adapter for synchronous closures, see [`from_fn`]
pub struct FnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Socket, &mut DispatchScope) -> MiddlewareResult + Send + Sync + 'static,
{
    async fn handle(&self, socket: &Socket, scope: &mut DispatchScope) -> MiddlewareResult {
        (self.0)(socket, scope)
    }
}

/// Wrap a synchronous closure as middleware
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&Socket, &mut DispatchScope) -> MiddlewareResult + Send + Sync + 'static,
{
    Arc::new(FnMiddleware(f))
}

impl From<Arc<dyn Middleware>> for OneOrMany<Arc<dyn Middleware>> {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        OneOrMany::One(middleware)
    }
}
