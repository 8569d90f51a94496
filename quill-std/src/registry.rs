//! The operation registry.
//!
//! A [`RegistryBuilder`] gathers operation descriptors, handler declarations
//! and validators (collected at link time, added explicitly, or both) and
//! builds an immutable [`Registry`]. [`SharedRegistry`] publishes the current
//! registry to concurrent dispatchers and swaps in rebuilt tables atomically.
//!
//! # Build Rules
//!
//! - Descriptors are processed in name order, so builds are deterministic.
//! - A malformed descriptor is logged and skipped; it never aborts the build.
//! - An operation without a handler for its exact (request, response) pair is
//!   undispatchable: logged, skipped, and left out of the callable table.
//! - Actions come from the configured override, then the operation's own
//!   override, then its name with the kind suffix stripped, lowercased.
//! - Two operations never share an action; the later one (by name) is skipped.
//! - An action equal to another operation's name is rejected, so an exact type
//!   name always reaches its own operation.
//! - Each request type belongs to one operation name; later names declaring
//!   the same type are skipped.

use crate::{
    discovery,
    resolver::{ActionResolver, Ambiguity},
};
use arc_swap::{ArcSwap, ArcSwapOption};
use quill_core::{
    DecodeFn, DescribeError, ErasedRequest, ErasedValidator, ErasedValidatorWrapper, Fault,
    HandlerDescriptor, HandlerId, Operation, OperationDescriptor, OperationKind,
    OperationMetadata, Validator, is_valid_action,
};
use serde_json::Value;
use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, info, warn};

const REQUEST_TYPE_KEY: &str = "request type";

/// Why an operation was left out of a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registration could not produce metadata.
    #[error(transparent)]
    Malformed(#[from] DescribeError),

    /// A configured action override is not a usable action.
    #[error("override '{action}' for '{name}' is not a valid action")]
    InvalidOverride {
        /// Operation name.
        name: String,
        /// Offending action.
        action: String,
    },

    /// No handler serves the operation's request/response pair.
    #[error("no handler serves operation '{name}'")]
    MissingHandler {
        /// Operation name.
        name: String,
    },

    /// Another operation already owns the action or name.
    #[error("operation '{name}' collides with '{existing}' on '{key}'")]
    Duplicate {
        /// Operation name.
        name: String,
        /// The contested action or name.
        key: String,
        /// The operation that kept it.
        existing: String,
    },
}

/// An operation left out of a registry, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOperation {
    /// Declared operation name.
    pub name: String,
    /// Why it was skipped.
    pub reason: RegistryError,
}

/// A dispatchable operation: metadata plus the erased plumbing to run it.
pub struct RegisteredOperation {
    metadata: OperationMetadata,
    decode: DecodeFn,
    validator: Option<Arc<dyn ErasedValidator>>,
}

impl RegisteredOperation {
    /// The operation's metadata.
    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    /// Decode a structured payload into the operation's request type.
    pub fn decode(&self, payload: Value) -> Result<ErasedRequest, Fault> {
        (self.decode)(payload).map_err(|e| {
            Fault::bad_input(
                format!("invalid payload for '{}'", self.metadata.name()),
                vec![e.to_string()],
            )
        })
    }

    /// The validator bound to the request type, if any.
    pub fn validator(&self) -> Option<&Arc<dyn ErasedValidator>> {
        self.validator.as_ref()
    }
}

impl std::fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("metadata", &self.metadata)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Immutable action → operation table.
#[derive(Debug, Default)]
pub struct Registry {
    by_action: HashMap<String, Arc<RegisteredOperation>>,
    by_name: HashMap<String, Arc<RegisteredOperation>>,
    skipped: Vec<SkippedOperation>,
    ambiguities: Vec<Ambiguity>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up by action, falling back to the operation name. Case-insensitive.
    pub fn lookup(&self, key: &str) -> Option<&Arc<RegisteredOperation>> {
        let key = key.trim().to_lowercase();
        self.by_action
            .get(&key)
            .or_else(|| self.by_name.get(&key))
    }

    /// Look up by operation name only. Case-insensitive.
    pub fn lookup_name(&self, name: &str) -> Option<&Arc<RegisteredOperation>> {
        self.by_name.get(&name.trim().to_lowercase())
    }

    /// Whether `key` is an exact action or name.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Every dispatchable operation, ordered by action.
    pub fn operations(&self) -> Vec<&OperationMetadata> {
        let mut operations: Vec<_> = self.by_action.values().map(|op| op.metadata()).collect();
        operations.sort_by(|a, b| a.action().cmp(b.action()));
        operations
    }

    /// Operations left out of the table.
    pub fn skipped(&self) -> &[SkippedOperation] {
        &self.skipped
    }

    /// Heuristic collisions detected during the build.
    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Number of dispatchable operations.
    pub fn len(&self) -> usize {
        self.by_action.len()
    }

    /// Whether nothing is dispatchable.
    pub fn is_empty(&self) -> bool {
        self.by_action.is_empty()
    }
}

/// Builder for constructing a [`Registry`].
///
/// Building does not consume the builder, so the same inputs can be rebuilt
/// later.
#[derive(Default)]
pub struct RegistryBuilder {
    operations: Vec<OperationDescriptor>,
    handlers: Vec<HandlerDescriptor>,
    validators: HashMap<TypeId, Arc<dyn ErasedValidator>>,
    action_overrides: BTreeMap<String, String>,
    resolver: Option<Arc<ActionResolver>>,
}

impl RegistryBuilder {
    /// Create a new empty registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add everything registered at link time.
    ///
    /// Validators added explicitly take precedence over collected ones.
    pub fn collected(mut self) -> Self {
        self.operations.extend(discovery::collect_operations());
        self.handlers.extend(
            discovery::collect_handlers()
                .into_iter()
                .map(|registration| registration.describe()),
        );
        for registration in discovery::collect_validators() {
            self.validators
                .entry(registration.request_type())
                .or_insert_with(|| registration.create());
        }
        self
    }

    /// Register operation type `Op`.
    pub fn operation<Op: Operation>(self) -> Self {
        self.descriptor(OperationDescriptor::of::<Op>())
    }

    /// Register a prebuilt descriptor.
    pub fn descriptor(mut self, descriptor: OperationDescriptor) -> Self {
        self.operations.push(descriptor);
        self
    }

    /// Declare a handler.
    pub fn handler(mut self, descriptor: HandlerDescriptor) -> Self {
        self.handlers.push(descriptor);
        self
    }

    /// Bind a validator to `Op`, replacing any previous one.
    pub fn validator<Op, V>(mut self, validator: V) -> Self
    where
        Op: Operation,
        V: Validator<Op>,
    {
        self.validators.insert(
            TypeId::of::<Op>(),
            Arc::new(ErasedValidatorWrapper::<Op, V>::new(validator)),
        );
        self
    }

    /// Override the action of the operation named `name`.
    pub fn action_override(mut self, name: impl Into<String>, action: impl Into<String>) -> Self {
        self.action_overrides.insert(name.into(), action.into());
        self
    }

    /// Audit heuristic collisions with `resolver` during builds.
    pub fn resolver(mut self, resolver: Arc<ActionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Build the registry.
    pub fn build(&self) -> Registry {
        let mut registry = Registry::default();

        let mut sorted: Vec<&OperationDescriptor> = self.operations.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(b.name));

        let mut owners: HashMap<TypeId, &'static str> = HashMap::new();
        let mut descriptors = Vec::with_capacity(sorted.len());
        for descriptor in sorted {
            match owners.get(&descriptor.request_type) {
                None => {
                    owners.insert(descriptor.request_type, descriptor.name);
                    descriptors.push(descriptor);
                }
                // The same registration seen twice, e.g. collected and explicit.
                Some(owner) if *owner == descriptor.name => {}
                Some(owner) => {
                    let reason = RegistryError::Duplicate {
                        name: descriptor.name.to_string(),
                        key: REQUEST_TYPE_KEY.to_string(),
                        existing: owner.to_string(),
                    };
                    warn!(operation = descriptor.name, %reason, "operation skipped");
                    registry.skipped.push(SkippedOperation {
                        name: descriptor.name.to_string(),
                        reason,
                    });
                }
            }
        }

        // Type names are reserved: no action may shadow another operation's name.
        let names: HashMap<String, &'static str> = descriptors
            .iter()
            .map(|d| (d.name.to_lowercase(), d.name))
            .collect();

        for descriptor in descriptors {
            match self.register(&mut registry, descriptor, &names) {
                Ok(metadata) => debug!(
                    operation = metadata.name(),
                    action = metadata.action(),
                    kind = ?metadata.kind(),
                    "operation registered"
                ),
                Err(reason) => {
                    warn!(operation = descriptor.name, %reason, "operation skipped");
                    registry.skipped.push(SkippedOperation {
                        name: descriptor.name.to_string(),
                        reason,
                    });
                }
            }
        }

        if let Some(resolver) = &self.resolver {
            let pairs: Vec<(&str, &str)> = registry
                .operations()
                .into_iter()
                .map(|m| (m.name(), m.action()))
                .collect();
            let ambiguities = resolver.audit(pairs);
            for ambiguity in &ambiguities {
                warn!(%ambiguity, "ambiguous heuristic action");
            }
            registry.ambiguities = ambiguities;
        }

        info!(
            operations = registry.len(),
            skipped = registry.skipped.len(),
            "operation registry built"
        );
        registry
    }

    fn register(
        &self,
        registry: &mut Registry,
        descriptor: &OperationDescriptor,
        names: &HashMap<String, &'static str>,
    ) -> Result<OperationMetadata, RegistryError> {
        descriptor.validate()?;

        let action = self.action_for(descriptor)?;
        let handler = self.handler_for(descriptor)?;
        let kind = descriptor
            .kind_marker
            .unwrap_or_else(|| OperationKind::from_type_name(descriptor.name));

        let metadata = OperationMetadata::new(
            descriptor.name,
            &action,
            descriptor.request_shape.clone(),
            descriptor.response_shape.clone(),
            kind,
            handler,
            descriptor.requires_authentication,
        );

        if let Some(owner) = names.get(metadata.action()) {
            if *owner != descriptor.name {
                return Err(RegistryError::Duplicate {
                    name: descriptor.name.to_string(),
                    key: metadata.action().to_string(),
                    existing: owner.to_string(),
                });
            }
        }

        let name_key = descriptor.name.to_lowercase();
        for (table, key) in [
            (&registry.by_action, metadata.action()),
            (&registry.by_name, name_key.as_str()),
        ] {
            if let Some(existing) = table.get(key) {
                return Err(RegistryError::Duplicate {
                    name: descriptor.name.to_string(),
                    key: key.to_string(),
                    existing: existing.metadata.name().to_string(),
                });
            }
        }

        let entry = Arc::new(RegisteredOperation {
            metadata: metadata.clone(),
            decode: descriptor.decode,
            validator: self.validators.get(&descriptor.request_type).cloned(),
        });
        registry
            .by_action
            .insert(metadata.action().to_string(), Arc::clone(&entry));
        registry.by_name.insert(name_key, entry);
        Ok(metadata)
    }

    fn action_for(&self, descriptor: &OperationDescriptor) -> Result<String, RegistryError> {
        if let Some(action) = self.action_overrides.get(descriptor.name) {
            if !is_valid_action(action) {
                return Err(RegistryError::InvalidOverride {
                    name: descriptor.name.to_string(),
                    action: action.clone(),
                });
            }
            return Ok(action.to_lowercase());
        }
        if let Some(action) = descriptor.action_override {
            return Ok(action.to_lowercase());
        }
        Ok(OperationKind::strip_suffix(descriptor.name).to_lowercase())
    }

    fn handler_for(&self, descriptor: &OperationDescriptor) -> Result<HandlerId, RegistryError> {
        let mut candidates: Vec<HandlerId> = self
            .handlers
            .iter()
            .filter(|h| h.serves(descriptor.request_type, descriptor.response_type))
            .map(|h| h.identity)
            .collect();
        candidates.sort();
        candidates.dedup();

        match candidates.as_slice() {
            [] => Err(RegistryError::MissingHandler {
                name: descriptor.name.to_string(),
            }),
            [only] => Ok(*only),
            [first, rest @ ..] => {
                warn!(
                    operation = descriptor.name,
                    chosen = %first,
                    ignored = rest.len(),
                    "several handlers serve one operation"
                );
                Ok(*first)
            }
        }
    }
}

struct SharedState {
    current: ArcSwapOption<Registry>,
    builder: ArcSwap<RegistryBuilder>,
}

/// The process-wide registry handle.
///
/// Readers load a snapshot without locking. Rebuilds construct a complete new
/// table and publish it with a single pointer swap; in-flight dispatches keep
/// the snapshot they loaded.
#[derive(Clone)]
pub struct SharedRegistry {
    state: Arc<SharedState>,
}

impl SharedRegistry {
    /// Build the registry now.
    pub fn new(builder: RegistryBuilder) -> Self {
        let registry = builder.build();
        Self {
            state: Arc::new(SharedState {
                current: ArcSwapOption::from_pointee(registry),
                builder: ArcSwap::from_pointee(builder),
            }),
        }
    }

    /// Build the registry on first [`load`](Self::load).
    pub fn lazy(builder: RegistryBuilder) -> Self {
        Self {
            state: Arc::new(SharedState {
                current: ArcSwapOption::empty(),
                builder: ArcSwap::from_pointee(builder),
            }),
        }
    }

    /// Whether a registry has been published.
    pub fn is_built(&self) -> bool {
        self.state.current.load().is_some()
    }

    /// The current registry, building it first if discovery is lazy.
    pub fn load(&self) -> Arc<Registry> {
        if let Some(registry) = self.state.current.load_full() {
            return registry;
        }
        let built = Arc::new(self.state.builder.load().build());
        // Concurrent first loads race; the first published table wins.
        self.state
            .current
            .rcu(|current| current.clone().or_else(|| Some(Arc::clone(&built))));
        self.state.current.load_full().unwrap_or(built)
    }

    /// Rebuild from the current inputs and publish the result.
    pub fn rebuild(&self) -> Arc<Registry> {
        let registry = Arc::new(self.state.builder.load().build());
        self.state.current.store(Some(Arc::clone(&registry)));
        registry
    }

    /// Replace the inputs, rebuild, and publish the result.
    pub fn replace(&self, builder: RegistryBuilder) -> Arc<Registry> {
        let registry = Arc::new(builder.build());
        self.state.builder.store(Arc::new(builder));
        self.state.current.store(Some(Arc::clone(&registry)));
        registry
    }
}

impl std::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("built", &self.is_built())
            .finish()
    }
}
