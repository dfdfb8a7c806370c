//! Event router
//!
//! Maps event names to their ordered middleware stacks. Built during
//! setup; the dispatcher takes ownership once the server starts, after
//! which it can no longer change.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::middleware::Middleware;
use crate::types::OneOrMany;

#[derive(Default)]
pub struct EventRouter {
    stacks: HashMap<String, Vec<Arc<dyn Middleware>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append middleware to the stack of each event, in call order
    pub fn on(
        &mut self,
        events: impl Into<OneOrMany<String>>,
        middleware: impl Into<OneOrMany<Arc<dyn Middleware>>>,
    ) -> &mut Self {
        let middleware = middleware.into().into_vec();
        for event in events.into().into_vec() {
            let stack = self.stacks.entry(event.clone()).or_default();
            stack.extend(middleware.iter().cloned());
            debug!("Stack for {} now has {} middleware", event, stack.len());
        }
        self
    }

    /// Ordered stack for an event; empty when nothing is registered
    pub fn stack_for(&self, event: &str) -> &[Arc<dyn Middleware>] {
        self.stacks.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (event, stack) in &self.stacks {
            map.entry(event, &stack.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;

    fn noop() -> Arc<dyn Middleware> {
        from_fn(|_, _| Ok(()))
    }

    #[test]
    fn test_unknown_event_has_empty_stack() {
        let router = EventRouter::new();
        assert!(router.stack_for("missing").is_empty());
    }

    #[test]
    fn test_on_appends_in_order() {
        let mut router = EventRouter::new();
        let first = noop();
        let second = noop();

        router.on("chat", first.clone());
        router.on("chat", second.clone());

        let stack = router.stack_for("chat");
        assert_eq!(stack.len(), 2);
        assert!(Arc::ptr_eq(&stack[0], &first));
        assert!(Arc::ptr_eq(&stack[1], &second));
    }

    #[test]
    fn test_on_many_events_many_middleware() {
        let mut router = EventRouter::new();
        let a = noop();
        let b = noop();

        router.on(["x", "y"], vec![a.clone(), b.clone()]);

        for event in ["x", "y"] {
            let stack = router.stack_for(event);
            assert_eq!(stack.len(), 2);
            assert!(Arc::ptr_eq(&stack[0], &a));
            assert!(Arc::ptr_eq(&stack[1], &b));
        }
        assert!(router.stack_for("z").is_empty());
    }
}
