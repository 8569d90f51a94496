//! Action name resolution.
//!
//! Turns a free-form action (`"getbyauthor"`, `"create-post"`) into the
//! canonical operation name to look up when the action is not an exact
//! registry key.
//!
//! 1. **Alias**: a configured alias maps straight to a base name and no
//!    heuristic runs.
//! 2. **Heuristic**: the lowercase action is split on the token `"by"`. Two
//!    parts whose second part is a known entity become `{Part1}By{Part2}`;
//!    otherwise the Pascal-cased parts are concatenated.
//! 3. **Suffix**: `Query` is appended to query actions (those starting with a
//!    query prefix, `"get"` by default), `Command` to everything else. Names
//!    that already end in a kind suffix keep it.
//!
//! Resolution never fails. Whether the candidate names a real operation is
//! decided by the registry.

use crate::config::DispatchConfig;
use quill_core::OperationKind;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const SPLIT_TOKEN: &str = "by";

/// Resolves actions into candidate operation names.
#[derive(Debug, Clone)]
pub struct ActionResolver {
    aliases: HashMap<String, String>,
    entities: HashSet<String>,
    query_prefixes: Vec<String>,
}

impl Default for ActionResolver {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            entities: HashSet::new(),
            query_prefixes: vec!["get".to_string()],
        }
    }
}

impl ActionResolver {
    /// A resolver with no aliases, no entities and the `"get"` query prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver configured from `config`.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let mut resolver = Self {
            query_prefixes: config
                .query_prefixes
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            ..Self::default()
        };
        for (alias, target) in &config.aliases {
            resolver = resolver.alias(alias, target);
        }
        for entity in &config.entities {
            resolver = resolver.entity(entity);
        }
        resolver
    }

    /// Map `action` to the canonical base name `target`.
    pub fn alias(mut self, action: &str, target: impl Into<String>) -> Self {
        self.aliases
            .insert(action.trim().to_lowercase(), target.into());
        self
    }

    /// Add a known entity name for the `"by"` heuristic.
    pub fn entity(mut self, entity: &str) -> Self {
        self.entities
            .insert(entity.trim_matches(is_word_break).to_lowercase());
        self
    }

    /// Whether `action` names a query.
    pub fn is_query(&self, action: &str) -> bool {
        let normalized = action.trim().to_lowercase();
        self.query_prefixes
            .iter()
            .any(|prefix| normalized.starts_with(prefix.as_str()))
    }

    /// Whether `action` has a configured alias.
    pub fn is_aliased(&self, action: &str) -> bool {
        self.aliases.contains_key(&action.trim().to_lowercase())
    }

    /// Produce the candidate operation name for `action`.
    pub fn resolve(&self, action: &str, is_query: bool) -> String {
        let normalized = action.trim().to_lowercase();
        let base = match self.aliases.get(&normalized) {
            Some(target) => target.clone(),
            None => self.heuristic_base(&normalized),
        };
        apply_suffix(base, is_query)
    }

    /// [`resolve`](Self::resolve) with the query flag derived from the action.
    pub fn resolve_action(&self, action: &str) -> String {
        self.resolve(action, self.is_query(action))
    }

    fn heuristic_base(&self, normalized: &str) -> String {
        let parts: Vec<&str> = normalized.split(SPLIT_TOKEN).collect();
        if let [left, right] = parts.as_slice() {
            if self.entities.contains(right.trim_matches(is_word_break)) {
                return format!("{}By{}", pascal_case(left), pascal_case(right));
            }
        }
        parts.iter().map(|part| pascal_case(part)).collect()
    }

    /// Report heuristic collisions among registered operations.
    ///
    /// `operations` holds `(name, action)` pairs. Aliased actions are exempt
    /// since their alias always wins.
    pub fn audit<'a, I>(&self, operations: I) -> Vec<Ambiguity>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let operations: Vec<(&str, &str)> = operations.into_iter().collect();
        let by_name: HashMap<String, &str> = operations
            .iter()
            .map(|(name, _)| (name.to_lowercase(), *name))
            .collect();

        let mut by_candidate: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut ambiguities = Vec::new();

        for (name, action) in &operations {
            if self.is_aliased(action) {
                continue;
            }
            let candidate = self.resolve_action(action);
            if let Some(other) = by_name.get(&candidate.to_lowercase()) {
                if !other.eq_ignore_ascii_case(name) {
                    ambiguities.push(Ambiguity::Misdirected {
                        action: action.to_string(),
                        operation: name.to_string(),
                        candidate: other.to_string(),
                    });
                }
            }
            by_candidate
                .entry(candidate.to_lowercase())
                .or_default()
                .insert(action.to_string());
        }

        ambiguities.extend(
            by_candidate
                .into_iter()
                .filter(|(_, actions)| actions.len() > 1)
                .map(|(candidate, actions)| Ambiguity::SharedCandidate {
                    candidate,
                    actions: actions.into_iter().collect(),
                }),
        );
        ambiguities
    }
}

/// A heuristic derivation that does not point at a single, obvious operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ambiguity {
    /// Several registered actions derive the same candidate name.
    SharedCandidate {
        /// The lowercase candidate.
        candidate: String,
        /// Actions deriving it, sorted.
        actions: Vec<String>,
    },
    /// An action's heuristic candidate names a different registered operation.
    Misdirected {
        /// The registered action.
        action: String,
        /// The operation that owns the action.
        operation: String,
        /// The other operation the heuristic points at.
        candidate: String,
    },
}

impl std::fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ambiguity::SharedCandidate { candidate, actions } => write!(
                f,
                "actions [{}] all derive candidate '{candidate}'",
                actions.join(", ")
            ),
            Ambiguity::Misdirected {
                action,
                operation,
                candidate,
            } => write!(
                f,
                "action '{action}' of '{operation}' heuristically resolves to '{candidate}'"
            ),
        }
    }
}

fn apply_suffix(base: String, is_query: bool) -> String {
    if OperationKind::has_suffix_ignore_case(&base) {
        return base;
    }
    let suffix = if is_query { "Query" } else { "Command" };
    base + suffix
}

fn is_word_break(c: char) -> bool {
    matches!(c, '.' | '-' | '_') || c.is_whitespace()
}

/// Pascal-case a lowercase fragment, treating `.`, `-`, `_` and whitespace as
/// word breaks.
fn pascal_case(fragment: &str) -> String {
    fragment
        .split(is_word_break)
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_resolver() -> ActionResolver {
        ActionResolver::new()
            .entity("Author")
            .entity("Category")
            .alias("getbytag", "GetBlogPostsByTag")
    }

    #[test]
    fn test_plain_actions() {
        let resolver = blog_resolver();
        assert_eq!(resolver.resolve("login", false), "LoginCommand");
        assert_eq!(resolver.resolve("getposts", true), "GetpostsQuery");
        assert_eq!(resolver.resolve("create-post", false), "CreatePostCommand");
        assert_eq!(resolver.resolve("  Login ", false), "LoginCommand");
    }

    #[test]
    fn test_by_entity() {
        let resolver = blog_resolver();
        assert_eq!(resolver.resolve("getbyauthor", true), "GetByAuthorQuery");
        assert_eq!(
            resolver.resolve("get-posts-by-category", true),
            "GetPostsByCategoryQuery"
        );
        // not an entity: parts are concatenated
        assert_eq!(resolver.resolve("getbydate", true), "GetDateQuery");
    }

    #[test]
    fn test_more_than_two_parts_concatenate() {
        let resolver = blog_resolver();
        assert_eq!(
            resolver.resolve("getbyauthorbycategory", true),
            "GetAuthorCategoryQuery"
        );
    }

    #[test]
    fn test_alias_wins_over_heuristic() {
        let resolver = blog_resolver().alias("getbyauthor", "GetBlogPostsByAuthor");
        assert_eq!(
            resolver.resolve("getbyauthor", true),
            "GetBlogPostsByAuthorQuery"
        );
        assert_eq!(resolver.resolve("GETBYTAG", true), "GetBlogPostsByTagQuery");
    }

    #[test]
    fn test_alias_keeps_existing_suffix() {
        let resolver = ActionResolver::new().alias("signin", "LoginCommand");
        assert_eq!(resolver.resolve("signin", false), "LoginCommand");
        assert_eq!(resolver.resolve("signin", true), "LoginCommand");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = blog_resolver();
        for action in ["getbyauthor", "login", "x-by-y", ""] {
            assert_eq!(
                resolver.resolve(action, true),
                resolver.resolve(action, true)
            );
        }
        assert_eq!(resolver.resolve("", false), "Command");
    }

    #[test]
    fn test_query_prefixes() {
        let resolver = ActionResolver::new();
        assert!(resolver.is_query("GetPosts"));
        assert!(!resolver.is_query("login"));
        assert_eq!(resolver.resolve_action("getposts"), "GetpostsQuery");

        let config = DispatchConfig {
            query_prefixes: vec!["get".into(), "list".into()],
            ..DispatchConfig::default()
        };
        let resolver = ActionResolver::from_config(&config);
        assert!(resolver.is_query("listposts"));
    }

    #[test]
    fn test_audit_reports_collisions() {
        let resolver = ActionResolver::new().entity("Id");
        let ambiguities = resolver.audit([
            ("GetPostByIdQuery", "getpostbyid"),
            ("GetPostByIdQuery2", "get-post-by-id"),
            ("LoginCommand", "login"),
        ]);
        assert!(ambiguities.contains(&Ambiguity::SharedCandidate {
            candidate: "getpostbyidquery".into(),
            actions: vec!["get-post-by-id".into(), "getpostbyid".into()],
        }));
        assert!(ambiguities.contains(&Ambiguity::Misdirected {
            action: "get-post-by-id".into(),
            operation: "GetPostByIdQuery2".into(),
            candidate: "GetPostByIdQuery".into(),
        }));
        assert_eq!(ambiguities.len(), 2);
    }
}
