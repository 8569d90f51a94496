//! # Validation Layer (Validator)
//!
//! Validators inspect a decoded request and report every rule it violates.
//! At most one validator is bound to each request type.
//!
//! ```rust,ignore
//! let rules = Rules::<GetBlogPostsQuery>::new()
//!     .field_rule("page", |q| q.page > 0, "Page must be greater than 0")
//!     .field_rule("pageSize", |q| q.page_size <= 100, "Page size must be at most 100");
//! ```

use crate::{error::Fault, operation::Operation};
use std::{any::Any, fmt, marker::PhantomData};

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    field: Option<String>,
    message: String,
}

impl Violation {
    /// A violation not tied to a single field.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// A violation of a rule on `field`.
    pub fn on_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// The offending field, if the rule targets one.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The rule's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Checks a decoded request.
///
/// An empty result means the request is valid.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot validate `{Op}`",
    label = "missing `Validator<{Op}>` implementation"
)]
pub trait Validator<Op>: Send + Sync + 'static {
    /// Report every violated rule.
    fn validate(&self, request: &Op) -> Vec<Violation>;
}

// Blanket impl for closures
impl<Op, F> Validator<Op> for F
where
    F: Fn(&Op) -> Vec<Violation> + Send + Sync + 'static,
{
    fn validate(&self, request: &Op) -> Vec<Violation> {
        (self)(request)
    }
}

type Predicate<Op> = Box<dyn Fn(&Op) -> bool + Send + Sync>;

struct Rule<Op> {
    field: Option<&'static str>,
    check: Predicate<Op>,
    message: String,
}

/// A declarative list of rules, evaluated in order.
pub struct Rules<Op> {
    rules: Vec<Rule<Op>>,
}

impl<Op> Default for Rules<Op> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<Op> Rules<Op> {
    /// No rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. `check` returns `true` when the request is acceptable.
    pub fn rule<F>(mut self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Op) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            field: None,
            check: Box::new(check),
            message: message.into(),
        });
        self
    }

    /// Add a rule about one field.
    pub fn field_rule<F>(mut self, field: &'static str, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Op) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            field: Some(field),
            check: Box::new(check),
            message: message.into(),
        });
        self
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules were added.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<Op: 'static> Validator<Op> for Rules<Op> {
    fn validate(&self, request: &Op) -> Vec<Violation> {
        self.rules
            .iter()
            .filter(|rule| !(rule.check)(request))
            .map(|rule| Violation {
                field: rule.field.map(str::to_string),
                message: rule.message.clone(),
            })
            .collect()
    }
}

/// Object-safe, type-erased validator.
pub trait ErasedValidator: Send + Sync + 'static {
    /// Validate a request whose concrete type is only known at runtime.
    ///
    /// Fails with an internal fault when handed the wrong request type.
    fn validate_erased(&self, request: &(dyn Any + Send)) -> Result<Vec<Violation>, Fault>;
}

/// Wrapper to implement [`ErasedValidator`] for a typed validator.
pub struct ErasedValidatorWrapper<Op, V> {
    validator: V,
    _phantom: PhantomData<fn(&Op)>,
}

impl<Op, V> ErasedValidatorWrapper<Op, V> {
    /// Wrap a typed validator.
    pub const fn new(validator: V) -> Self {
        Self {
            validator,
            _phantom: PhantomData,
        }
    }
}

impl<Op, V> ErasedValidator for ErasedValidatorWrapper<Op, V>
where
    Op: Operation,
    V: Validator<Op>,
{
    fn validate_erased(&self, request: &(dyn Any + Send)) -> Result<Vec<Violation>, Fault> {
        let request = request.downcast_ref::<Op>().ok_or_else(|| {
            Fault::internal(format!("validator for '{}' received another type", Op::NAME))
        })?;
        Ok(self.validator.validate(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct GetBlogPostsQuery {
        page: u32,
        page_size: u32,
    }

    impl Operation for GetBlogPostsQuery {
        type Response = Vec<String>;
        const NAME: &'static str = "GetBlogPostsQuery";
    }

    fn rules() -> Rules<GetBlogPostsQuery> {
        Rules::new()
            .field_rule("page", |q: &GetBlogPostsQuery| q.page > 0, "Page must be greater than 0")
            .field_rule(
                "pageSize",
                |q: &GetBlogPostsQuery| (1..=100).contains(&q.page_size),
                "Page size must be between 1 and 100",
            )
    }

    #[test]
    fn test_reports_every_violation_in_order() {
        let violations = rules().validate(&GetBlogPostsQuery {
            page: 0,
            page_size: 500,
        });
        let messages: Vec<_> = violations.iter().map(Violation::message).collect();
        assert_eq!(
            messages,
            ["Page must be greater than 0", "Page size must be between 1 and 100"]
        );
        assert_eq!(violations[0].field(), Some("page"));
    }

    #[test]
    fn test_valid_request_has_no_violations() {
        let violations = rules().validate(&GetBlogPostsQuery {
            page: 1,
            page_size: 10,
        });
        assert!(violations.is_empty());
    }

    #[test]
    fn test_erased_validator_checks_type() {
        let erased = ErasedValidatorWrapper::<GetBlogPostsQuery, _>::new(rules());
        let request = GetBlogPostsQuery {
            page: 0,
            page_size: 10,
        };
        assert_eq!(erased.validate_erased(&request).unwrap().len(), 1);
        assert!(erased.validate_erased(&7_u8).is_err());
    }

    #[test]
    fn test_closure_validator() {
        let validator = |q: &GetBlogPostsQuery| {
            if q.page == 13 {
                vec![Violation::new("unlucky page")]
            } else {
                Vec::new()
            }
        };
        let request = GetBlogPostsQuery {
            page: 13,
            page_size: 10,
        };
        assert_eq!(validator.validate(&request)[0].to_string(), "unlucky page");
    }
}
