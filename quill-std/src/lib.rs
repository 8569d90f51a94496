//! # quill-std
//!
//! Standard implementations for the Quill operation dispatch engine.
//!
//! This crate provides:
//! - **Discovery**: link-time collected operation, handler and validator
//!   registrations ([`discovery`])
//! - **Registry**: [`Registry`], [`RegistryBuilder`] and the atomically
//!   replaceable [`SharedRegistry`]
//! - **Resolution**: [`ActionResolver`] for free-form action names
//! - **Dependency lookup**: [`ServiceContainer`]
//! - **Dispatch**: [`Dispatcher`] and [`DispatcherBuilder`]
//! - **Standard hooks**: authentication, roles, logging
//! - **Configuration**: [`DispatchConfig`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use quill_core;

pub mod config;
pub mod container;
pub mod discovery;
pub mod dispatcher;
pub mod hooks;
pub mod registry;
pub mod resolver;
pub mod testing;

pub use config::{ConfigError, DispatchConfig};
pub use container::ServiceContainer;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use registry::{
    RegisteredOperation, Registry, RegistryBuilder, RegistryError, SharedRegistry,
    SkippedOperation,
};
pub use resolver::{ActionResolver, Ambiguity};

pub use inventory;
