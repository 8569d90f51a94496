//! Standard dispatch hooks.

mod auth;
mod logging;

pub use auth::{AuthenticationHook, RoleHook};
pub use logging::LoggingHook;
