//! Dispatcher configuration.
//!
//! ```json
//! {
//!   "aliases": { "getbyauthor": "GetBlogPostsByAuthor" },
//!   "actionOverrides": { "LoginCommand": "auth.login" },
//!   "entities": ["Author", "Category"],
//!   "queryPrefixes": ["get", "list"],
//!   "eagerDiscovery": true
//! }
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised while loading a [`DispatchConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid configuration.
    #[error("invalid dispatch config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Naming and discovery settings for a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchConfig {
    /// Action alias to canonical base name. Aliases bypass the heuristic.
    pub aliases: BTreeMap<String, String>,
    /// Operation name to external action. Overrides always win.
    pub action_overrides: BTreeMap<String, String>,
    /// Entity names recognized by the `"by"` heuristic.
    pub entities: Vec<String>,
    /// Action prefixes that mark queries.
    pub query_prefixes: Vec<String>,
    /// Build the registry at construction instead of on first dispatch.
    pub eager_discovery: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            aliases: BTreeMap::new(),
            action_overrides: BTreeMap::new(),
            entities: Vec::new(),
            query_prefixes: vec!["get".to_string()],
            eager_discovery: true,
        }
    }
}

impl DispatchConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Add an alias.
    pub fn with_alias(mut self, action: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(action.into(), target.into());
        self
    }

    /// Add an action override.
    pub fn with_action_override(
        mut self,
        operation: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.action_overrides.insert(operation.into(), action.into());
        self
    }

    /// Add a known entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entities.push(entity.into());
        self
    }

    /// Defer registry construction to the first dispatch.
    pub fn lazy(mut self) -> Self {
        self.eager_discovery = false;
        self
    }
}
