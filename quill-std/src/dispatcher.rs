//! The dispatcher: one generic entry point for every registered operation.
//!
//! A call moves through `Received → Resolved → Validated → Invoked →
//! Enveloped` and always ends with exactly one [`Envelope`]:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | handler result | 200, or the handler's own envelope |
//! | unknown action | 404 |
//! | undecodable payload, failed validation | 400 |
//! | missing principal | 401 |
//! | rejected by a hook | 403 |
//! | handler fault, panic, unresolvable handler, cancellation | 500 |
//!
//! Hooks, decoding and validation all run before the handler, so an invalid
//! or unauthorized call never reaches business code.

use crate::{
    config::DispatchConfig,
    container::{LayeredProvider, ServiceContainer},
    hooks::AuthenticationHook,
    registry::{RegisteredOperation, RegistryBuilder, SharedRegistry},
    resolver::ActionResolver,
};
use futures::FutureExt;
use quill_core::{
    DispatchRequest, DynHook, Envelope, Fault, Handler, HandlerDescriptor, HandlerProvider, Hook,
    HookResult, Operation, OperationDescriptor, RequestContext, Validator, normalize_payload,
    status,
};
use serde_json::Value;
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};
use tracing::{Instrument, Span, debug, error, field, info, info_span};

const NOT_FOUND_MESSAGE: &str = "operation not found";

/// Dispatches actions to registered operations.
///
/// Cheap to clone; clones share the registry, resolver, provider and hooks.
#[derive(Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
    resolver: Arc<ActionResolver>,
    provider: Arc<dyn HandlerProvider>,
    hooks: Arc<[Arc<dyn DynHook>]>,
}

impl Dispatcher {
    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// The registry handle, for catalogs and rebuilds.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// The action resolver.
    pub fn resolver(&self) -> &ActionResolver {
        &self.resolver
    }

    /// Dispatch `action` with a structured (or JSON-text) payload.
    ///
    /// Never fails: every outcome, including a panicking handler, becomes an
    /// envelope.
    pub async fn dispatch(&self, action: &str, payload: Value, ctx: RequestContext) -> Envelope {
        let span = info_span!(
            "dispatch",
            action = %action,
            operation = field::Empty,
            status = field::Empty,
        );
        async move {
            let envelope = match self.locate(action) {
                Some(operation) => {
                    Span::current().record("operation", operation.metadata().name());
                    self.run(&operation, payload, ctx).await
                }
                None => Envelope::failure(
                    status::NOT_FOUND,
                    NOT_FOUND_MESSAGE,
                    vec![format!("no operation matches '{}'", action.trim())],
                ),
            };

            let code = envelope.status_code();
            Span::current().record("status", code);
            if envelope.is_success() {
                debug!("operation completed");
            } else if code >= status::INTERNAL_ERROR {
                error!(reason = envelope.message(), "operation failed");
            } else {
                info!(reason = envelope.message(), "operation rejected");
            }
            envelope
        }
        .instrument(span)
        .await
    }

    /// Dispatch a parsed wire request.
    pub async fn dispatch_request(&self, request: DispatchRequest, ctx: RequestContext) -> Envelope {
        self.dispatch(&request.operation, request.data, ctx).await
    }

    /// Dispatch a raw wire body. A body that is not a valid request is a 400.
    pub async fn dispatch_json(&self, body: &str, ctx: RequestContext) -> Envelope {
        match serde_json::from_str::<DispatchRequest>(body) {
            Ok(request) => self.dispatch_request(request, ctx).await,
            Err(e) => {
                info!(error = %e, "malformed request body");
                Fault::bad_input("malformed request body", vec![e.to_string()]).into()
            }
        }
    }

    /// Find the operation for `action`: exact action or name first, then the
    /// resolver's candidate.
    fn locate(&self, action: &str) -> Option<Arc<RegisteredOperation>> {
        let registry = self.registry.load();
        if let Some(operation) = registry.lookup(action) {
            return Some(Arc::clone(operation));
        }
        let candidate = self.resolver.resolve_action(action);
        debug!(%candidate, "action resolved heuristically");
        registry.lookup_name(&candidate).cloned()
    }

    async fn run(
        &self,
        operation: &RegisteredOperation,
        payload: Value,
        ctx: RequestContext,
    ) -> Envelope {
        match AssertUnwindSafe(self.execute(operation, payload, ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(fault)) => fault.into(),
            Err(panic) => Fault::Panicked(panic_message(panic.as_ref())).into(),
        }
    }

    async fn execute(
        &self,
        operation: &RegisteredOperation,
        payload: Value,
        ctx: RequestContext,
    ) -> Result<Envelope, Fault> {
        if ctx.is_cancelled() {
            return Err(Fault::Cancelled);
        }
        let metadata = operation.metadata();

        for hook in self.hooks.iter() {
            if hook.on_dispatch_dyn(metadata, &ctx).await? == HookResult::Stop {
                return Err(Fault::forbidden("operation rejected"));
            }
        }

        let request = operation.decode(normalize_payload(payload)?)?;

        if let Some(validator) = operation.validator() {
            let violations = validator.validate_erased(&*request)?;
            if !violations.is_empty() {
                return Err(Fault::bad_input(
                    "validation failed",
                    violations.iter().map(ToString::to_string).collect(),
                ));
            }
        }

        let handler = self
            .provider
            .resolve(metadata.handler_identity())
            .ok_or_else(|| {
                Fault::internal(format!(
                    "handler '{}' for '{}' could not be resolved",
                    metadata.handler_identity(),
                    metadata.name()
                ))
            })?;

        let cancellation = ctx.cancellation().clone();
        let value = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(Fault::Cancelled),
            result = handler.call_erased(request, ctx) => result?,
        };
        Ok(Envelope::from_handler_value(value))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Builder for constructing a [`Dispatcher`].
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder()
///     .config(DispatchConfig::load("dispatch.json")?)
///     .collected()
///     .handler::<CreatePostCommand, _>(CreatePostHandler::new(posts))
///     .hook(LoggingHook)
///     .build();
/// ```
pub struct DispatcherBuilder {
    config: DispatchConfig,
    registry: RegistryBuilder,
    container: ServiceContainer,
    provider: Option<Arc<dyn HandlerProvider>>,
    hooks: Vec<Arc<dyn DynHook>>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    /// An empty builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
            registry: RegistryBuilder::new(),
            container: ServiceContainer::new(),
            provider: None,
            hooks: Vec::new(),
        }
    }

    /// Use `config` for naming and discovery.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Register every operation, handler and validator collected at link time,
    /// with default handler instances.
    pub fn collected(mut self) -> Self {
        self.registry = self.registry.collected();
        self.container.extend_collected();
        self
    }

    /// Register operation type `Op`.
    pub fn operation<Op: Operation>(mut self) -> Self {
        self.registry = self.registry.operation::<Op>();
        self
    }

    /// Register a prebuilt operation descriptor.
    pub fn descriptor(mut self, descriptor: OperationDescriptor) -> Self {
        self.registry = self.registry.descriptor(descriptor);
        self
    }

    /// Declare `handler` for `Op` and keep the instance.
    pub fn handler<Op, H>(mut self, handler: H) -> Self
    where
        Op: Operation,
        H: Handler<Op>,
    {
        self.registry = self.registry.handler(HandlerDescriptor::of::<Op, H>());
        self.container.insert::<Op, H>(handler);
        self
    }

    /// Declare handler type `H` for `Op`; the instance comes from the provider.
    pub fn declare_handler<Op, H>(mut self) -> Self
    where
        Op: Operation,
        H: Handler<Op>,
    {
        self.registry = self.registry.handler(HandlerDescriptor::of::<Op, H>());
        self
    }

    /// Bind a validator to `Op`.
    pub fn validator<Op, V>(mut self, validator: V) -> Self
    where
        Op: Operation,
        V: Validator<Op>,
    {
        self.registry = self.registry.validator::<Op, V>(validator);
        self
    }

    /// Add a hook. Hooks run in insertion order, after authentication.
    pub fn hook<H: Hook>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Resolve handlers through `provider` first, then through instances
    /// given to this builder.
    pub fn provider<P: HandlerProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Build the dispatcher. With eager discovery the registry is built here;
    /// otherwise on the first dispatch.
    pub fn build(self) -> Dispatcher {
        let resolver = Arc::new(ActionResolver::from_config(&self.config));

        let mut registry = self.registry.resolver(Arc::clone(&resolver));
        for (name, action) in &self.config.action_overrides {
            registry = registry.action_override(name, action);
        }
        let registry = if self.config.eager_discovery {
            SharedRegistry::new(registry)
        } else {
            SharedRegistry::lazy(registry)
        };

        let provider: Arc<dyn HandlerProvider> = match self.provider {
            Some(primary) => Arc::new(LayeredProvider {
                primary,
                fallback: self.container,
            }),
            None => Arc::new(self.container),
        };

        let mut hooks: Vec<Arc<dyn DynHook>> = vec![Arc::new(AuthenticationHook)];
        hooks.extend(self.hooks);

        Dispatcher {
            registry,
            resolver,
            provider,
            hooks: hooks.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingHandler, PanickingHandler, RecordingHandler, RecordingHook};
    use quill_core::{Rules, Violation};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct LoginCommand {
        email: String,
    }

    impl Operation for LoginCommand {
        type Response = String;
        const NAME: &'static str = "LoginCommand";
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct GetBlogPostsQuery {
        page: u32,
        page_size: u32,
    }

    impl Operation for GetBlogPostsQuery {
        type Response = Vec<String>;
        const NAME: &'static str = "GetBlogPostsQuery";
    }

    #[derive(Debug, Deserialize)]
    struct DeletePostCommand {}

    impl Operation for DeletePostCommand {
        type Response = ();
        const NAME: &'static str = "DeletePostCommand";
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .operation::<LoginCommand>()
            .operation::<GetBlogPostsQuery>()
            .handler::<LoginCommand, _>(|cmd: LoginCommand, _ctx: RequestContext| async move {
                Ok(format!("token-for-{}", cmd.email))
            })
            .handler::<GetBlogPostsQuery, _>(RecordingHandler::new(vec!["first".to_string()]))
            .validator::<GetBlogPostsQuery, _>(
                Rules::new()
                    .field_rule("page", |q: &GetBlogPostsQuery| q.page > 0, "Page must be greater than 0")
                    .field_rule(
                        "pageSize",
                        |q: &GetBlogPostsQuery| q.page_size <= 50,
                        "Page size must be at most 50",
                    ),
            )
            .build()
    }

    #[tokio::test]
    async fn test_success_wraps_handler_result() {
        let envelope = dispatcher()
            .dispatch("login", json!({"email": "a@b.com"}), RequestContext::new())
            .await;
        assert!(envelope.is_success());
        assert_eq!(envelope.status_code(), 200);
        assert_eq!(envelope.data(), Some(&json!("token-for-a@b.com")));
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_found() {
        let envelope = dispatcher()
            .dispatch("NonExistentOperation", json!({}), RequestContext::new())
            .await;
        assert!(!envelope.is_success());
        assert_eq!(envelope.status_code(), 404);
        assert_eq!(envelope.message(), "operation not found");
        assert!(envelope.data().is_none());
    }

    #[tokio::test]
    async fn test_lookup_ignores_case_and_whitespace() {
        let envelope = dispatcher()
            .dispatch(
                " GETBLOGPOSTS ",
                json!({"page": 1, "pageSize": 10}),
                RequestContext::new(),
            )
            .await;
        assert!(envelope.is_success());
        assert_eq!(envelope.data(), Some(&json!(["first"])));
    }

    #[tokio::test]
    async fn test_heuristic_resolution_when_action_is_overridden() {
        let dispatcher = Dispatcher::builder()
            .config(DispatchConfig::default().with_action_override("LoginCommand", "auth.login"))
            .operation::<LoginCommand>()
            .handler::<LoginCommand, _>(|cmd: LoginCommand, _ctx: RequestContext| async move {
                Ok(cmd.email)
            })
            .build();

        for action in ["auth.login", "login", "LoginCommand"] {
            let envelope = dispatcher
                .dispatch(action, json!({"email": "x@y.z"}), RequestContext::new())
                .await;
            assert!(envelope.is_success(), "{action}");
        }
    }

    #[tokio::test]
    async fn test_validation_reports_every_violation_and_skips_handler() {
        let handler = RecordingHandler::new(Vec::<String>::new());
        let calls = handler.clone();
        let dispatcher = Dispatcher::builder()
            .operation::<GetBlogPostsQuery>()
            .handler::<GetBlogPostsQuery, _>(handler)
            .validator::<GetBlogPostsQuery, _>(|q: &GetBlogPostsQuery| {
                let mut violations = Vec::new();
                if q.page == 0 {
                    violations.push(Violation::on_field("page", "Page must be greater than 0"));
                }
                if q.page_size == 0 {
                    violations.push(Violation::on_field("pageSize", "Page size must be positive"));
                }
                violations
            })
            .build();

        for _ in 0..2 {
            let envelope = dispatcher
                .dispatch(
                    "GetBlogPostsQuery",
                    json!({"page": 0, "pageSize": 0}),
                    RequestContext::new(),
                )
                .await;
            assert_eq!(envelope.status_code(), 400);
            assert_eq!(
                envelope.errors(),
                [
                    "Page must be greater than 0".to_string(),
                    "Page size must be positive".to_string()
                ]
            );
        }
        assert_eq!(calls.calls(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_bad_input() {
        let envelope = dispatcher()
            .dispatch("login", json!({"email": 42}), RequestContext::new())
            .await;
        assert_eq!(envelope.status_code(), 400);
        assert!(!envelope.errors().is_empty());
    }

    #[tokio::test]
    async fn test_handler_fault_is_internal_error() {
        let dispatcher = Dispatcher::builder()
            .operation::<DeletePostCommand>()
            .handler::<DeletePostCommand, _>(FailingHandler::new("database unavailable"))
            .build();
        let envelope = dispatcher
            .dispatch("deletepost", Value::Null, RequestContext::new())
            .await;
        assert_eq!(envelope.status_code(), 500);
        assert_eq!(envelope.message(), "database unavailable");
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let dispatcher = Dispatcher::builder()
            .operation::<DeletePostCommand>()
            .handler::<DeletePostCommand, _>(PanickingHandler::new("index out of bounds"))
            .build();
        let envelope = dispatcher
            .dispatch("deletepost", Value::Null, RequestContext::new())
            .await;
        assert_eq!(envelope.status_code(), 500);
        assert!(envelope.message().contains("index out of bounds"));
    }

    struct SessionHandler;

    impl Handler<LoginCommand> for SessionHandler {
        async fn handle(&self, cmd: LoginCommand, _: RequestContext) -> Result<String, Fault> {
            Ok(format!("session-for-{}", cmd.email))
        }
    }

    impl Handler<DeletePostCommand> for SessionHandler {
        async fn handle(&self, _: DeletePostCommand, _: RequestContext) -> Result<(), Fault> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_one_handler_type_serves_two_operations() {
        let dispatcher = Dispatcher::builder()
            .operation::<LoginCommand>()
            .operation::<DeletePostCommand>()
            .handler::<LoginCommand, _>(SessionHandler)
            .handler::<DeletePostCommand, _>(SessionHandler)
            .build();

        let login = dispatcher
            .dispatch("login", json!({"email": "a@b.com"}), RequestContext::new())
            .await;
        assert_eq!(login.status_code(), 200);
        assert_eq!(login.data(), Some(&json!("session-for-a@b.com")));

        let delete = dispatcher
            .dispatch("deletepost", Value::Null, RequestContext::new())
            .await;
        assert_eq!(delete.status_code(), 200);
    }

    #[tokio::test]
    async fn test_shared_failing_handler_reports_its_fault() {
        let dispatcher = Dispatcher::builder()
            .operation::<LoginCommand>()
            .operation::<DeletePostCommand>()
            .handler::<LoginCommand, _>(FailingHandler::new("session store down"))
            .handler::<DeletePostCommand, _>(FailingHandler::new("session store down"))
            .build();

        let calls = [
            ("login", json!({"email": "a@b.com"})),
            ("deletepost", Value::Null),
        ];
        for (action, payload) in calls {
            let envelope = dispatcher
                .dispatch(action, payload, RequestContext::new())
                .await;
            assert_eq!(envelope.status_code(), 500, "{action}");
            assert_eq!(envelope.message(), "session store down", "{action}");
        }
    }

    #[tokio::test]
    async fn test_two_closure_handlers_in_one_builder() {
        let dispatcher = Dispatcher::builder()
            .operation::<LoginCommand>()
            .operation::<DeletePostCommand>()
            .handler::<LoginCommand, _>(|cmd: LoginCommand, _ctx: RequestContext| async move {
                Ok(cmd.email)
            })
            .handler::<DeletePostCommand, _>(
                |_cmd: DeletePostCommand, _ctx: RequestContext| async move { Ok(()) },
            )
            .build();

        let login = dispatcher
            .dispatch("login", json!({"email": "a@b.com"}), RequestContext::new())
            .await;
        assert_eq!(login.data(), Some(&json!("a@b.com")));

        let delete = dispatcher
            .dispatch("deletepost", Value::Null, RequestContext::new())
            .await;
        assert_eq!(delete.status_code(), 200);
    }

    #[tokio::test]
    async fn test_unresolvable_handler_is_internal_error() {
        let dispatcher = Dispatcher::builder()
            .operation::<DeletePostCommand>()
            .declare_handler::<DeletePostCommand, FailingHandler>()
            .build();
        let envelope = dispatcher
            .dispatch("deletepost", Value::Null, RequestContext::new())
            .await;
        assert_eq!(envelope.status_code(), 500);
    }

    #[tokio::test]
    async fn test_stopping_hook_rejects_before_decoding() {
        let hook = RecordingHook::with_result(HookResult::Stop);
        let seen = hook.clone();
        let dispatcher = Dispatcher::builder()
            .operation::<LoginCommand>()
            .handler::<LoginCommand, _>(FailingHandler::new("unreachable"))
            .hook(hook)
            .build();
        // payload is undecodable; the hook answers first
        let envelope = dispatcher
            .dispatch("login", json!({"email": 1}), RequestContext::new())
            .await;
        assert_eq!(envelope.status_code(), 403);
        assert_eq!(seen.operations(), ["LoginCommand".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch() {
        let ctx = RequestContext::new();
        ctx.cancellation().cancel();
        let envelope = dispatcher()
            .dispatch("login", json!({"email": "a@b.com"}), ctx)
            .await;
        assert_eq!(envelope.status_code(), 500);
        assert_eq!(envelope.message(), "operation cancelled");
    }

    #[tokio::test]
    async fn test_dispatch_json() {
        let dispatcher = dispatcher();
        let envelope = dispatcher
            .dispatch_json(
                r#"{"operation":"login","data":"{\"email\":\"a@b.com\"}"}"#,
                RequestContext::new(),
            )
            .await;
        assert!(envelope.is_success());

        let envelope = dispatcher
            .dispatch_json("{not json", RequestContext::new())
            .await;
        assert_eq!(envelope.status_code(), 400);
        assert_eq!(envelope.message(), "malformed request body");
    }
}
