//! The standard [`HandlerProvider`].

use crate::discovery;
use quill_core::{
    ErasedHandler, ErasedHandlerWrapper, Handler, HandlerId, HandlerProvider, Operation,
};
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

/// Handler instances keyed by identity, one per (handler, operation) pair.
///
/// Populate it with explicit instances (handlers holding repositories or
/// other services) and/or with the default instances of every handler
/// registered at link time.
#[derive(Clone, Default)]
pub struct ServiceContainer {
    handlers: HashMap<HandlerId, Arc<dyn ErasedHandler>>,
}

impl ServiceContainer {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// A container holding a default instance of every collected handler.
    pub fn from_collected() -> Self {
        let mut container = Self::new();
        container.extend_collected();
        container
    }

    /// Add default instances of collected handlers not already present.
    pub fn extend_collected(&mut self) {
        for registration in discovery::collect_handlers() {
            let identity = registration.describe().identity;
            self.handlers.entry(identity).or_insert_with(|| {
                trace!(handler = %identity, "handler instantiated from registration");
                registration.create()
            });
        }
    }

    /// Add a typed handler instance for `Op`, replacing any previous instance
    /// of `H` serving `Op`.
    pub fn insert<Op, H>(&mut self, handler: H)
    where
        Op: Operation,
        H: Handler<Op>,
    {
        self.insert_erased(Arc::new(ErasedHandlerWrapper::<Op, H>::new(handler)));
    }

    /// Add an erased handler under its own identity.
    pub fn insert_erased(&mut self, handler: Arc<dyn ErasedHandler>) {
        self.handlers.insert(handler.identity(), handler);
    }

    /// Whether an instance is available for `identity`.
    pub fn contains(&self, identity: HandlerId) -> bool {
        self.handlers.contains_key(&identity)
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerProvider for ServiceContainer {
    fn resolve(&self, identity: HandlerId) -> Option<Arc<dyn ErasedHandler>> {
        self.handlers.get(&identity).cloned()
    }
}

/// Tries a host provider first, then a container.
pub(crate) struct LayeredProvider {
    pub(crate) primary: Arc<dyn HandlerProvider>,
    pub(crate) fallback: ServiceContainer,
}

impl HandlerProvider for LayeredProvider {
    fn resolve(&self, identity: HandlerId) -> Option<Arc<dyn ErasedHandler>> {
        self.primary
            .resolve(identity)
            .or_else(|| self.fallback.resolve(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Fault, RequestContext};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct PingQuery;

    impl Operation for PingQuery {
        type Response = &'static str;
        const NAME: &'static str = "PingQuery";
    }

    struct PingHandler;

    impl Handler<PingQuery> for PingHandler {
        async fn handle(&self, _: PingQuery, _: RequestContext) -> Result<&'static str, Fault> {
            Ok("pong")
        }
    }

    #[derive(Debug, Deserialize)]
    struct EchoQuery;

    impl Operation for EchoQuery {
        type Response = &'static str;
        const NAME: &'static str = "EchoQuery";
    }

    impl Handler<EchoQuery> for PingHandler {
        async fn handle(&self, _: EchoQuery, _: RequestContext) -> Result<&'static str, Fault> {
            Ok("echo")
        }
    }

    struct Nothing;

    impl HandlerProvider for Nothing {
        fn resolve(&self, _: HandlerId) -> Option<Arc<dyn ErasedHandler>> {
            None
        }
    }

    #[test]
    fn test_resolves_inserted_handler() {
        let mut container = ServiceContainer::new();
        container.insert::<PingQuery, _>(PingHandler);

        let id = HandlerId::of::<PingQuery, PingHandler>();
        assert!(container.contains(id));
        assert_eq!(container.resolve(id).unwrap().identity(), id);
        assert!(container.resolve(HandlerId::named("other")).is_none());
    }

    #[tokio::test]
    async fn test_one_handler_type_serves_two_operations() {
        let mut container = ServiceContainer::new();
        container.insert::<PingQuery, _>(PingHandler);
        container.insert::<EchoQuery, _>(PingHandler);
        assert_eq!(container.len(), 2);

        let ping = container
            .resolve(HandlerId::of::<PingQuery, PingHandler>())
            .unwrap()
            .call_erased(Box::new(PingQuery), RequestContext::new())
            .await
            .unwrap();
        let echo = container
            .resolve(HandlerId::of::<EchoQuery, PingHandler>())
            .unwrap()
            .call_erased(Box::new(EchoQuery), RequestContext::new())
            .await
            .unwrap();

        assert_eq!(ping, "pong");
        assert_eq!(echo, "echo");
    }

    #[test]
    fn test_layered_provider_falls_back() {
        let mut fallback = ServiceContainer::new();
        fallback.insert::<PingQuery, _>(PingHandler);
        let layered = LayeredProvider {
            primary: Arc::new(Nothing),
            fallback,
        };
        assert!(layered.resolve(HandlerId::of::<PingQuery, PingHandler>()).is_some());
    }
}
