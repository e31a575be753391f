//! Parameter constraints.
//!
//! A [`RouteConstraint`] is a predicate attached to a route parameter. It is
//! consulted in both directions: while matching an incoming path and while
//! generating an outgoing link. Multiple constraints on one parameter are
//! conjunctive and evaluated in declaration order; the first rejection is
//! logged at debug level and vetoes the candidate.
//!
//! Inline constraint expressions (`{id:int:min(1)}`) are resolved to boxed
//! constraints by [`resolve_constraint`].
//!
//! # Built-in constraints
//!
//! | Expression        | Accepts                                    |
//! |-------------------|--------------------------------------------|
//! | `int`             | a 64-bit integer                           |
//! | `bool`            | `true` / `false` (case-insensitive)        |
//! | `guid`            | a UUID in standard hex form                |
//! | `alpha`           | ASCII letters only                         |
//! | `length(n)`       | exactly `n` characters                     |
//! | `length(min,max)` | between `min` and `max` characters         |
//! | `minlength(n)`    | at least `n` characters                    |
//! | `maxlength(n)`    | at most `n` characters                     |
//! | `min(n)`          | an integer `>= n`                          |
//! | `max(n)`          | an integer `<= n`                          |
//! | `range(min,max)`  | an integer within `[min, max]`             |
//! | `regex(pattern)`  | a full match of the anchored pattern       |

use std::borrow::Cow;
use std::fmt;

use regex::Regex;
use tracing::debug;

use routex_core::{RouteError, RouteResult, RouteValue, RouteValues};

/// Whether a constraint is being evaluated against an incoming request path
/// or during outgoing link generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintDirection {
    /// Matching a request path to an endpoint.
    Incoming,
    /// Generating a URL from supplied values.
    Outgoing,
}

/// A predicate attached to a route parameter.
///
/// Implementations receive the parameter name, its current value, the whole
/// values map for context, and the evaluation direction. A missing value is
/// never passed in; the engine skips constraints for unbound (optional)
/// parameters.
pub trait RouteConstraint: Send + Sync + fmt::Debug {
    /// Returns `true` when `value` is acceptable for `parameter`.
    fn matches(
        &self,
        parameter: &str,
        value: &RouteValue,
        values: &RouteValues,
        direction: ConstraintDirection,
    ) -> bool;
}

/// Per-parameter constraint lists, in declaration order.
pub type ConstraintMap = Vec<(String, Vec<Box<dyn RouteConstraint>>)>;

/// Evaluates every constraint in `map` against `values`.
///
/// Constraints for parameters that have no bound value are skipped (the
/// parameter was optional and unbound). The first rejection is logged at
/// debug level and short-circuits the evaluation.
pub fn check_constraints(
    map: &ConstraintMap,
    values: &RouteValues,
    direction: ConstraintDirection,
) -> bool {
    for (parameter, constraints) in map {
        let Some(value) = values.get(parameter) else {
            continue;
        };
        for constraint in constraints {
            if !constraint.matches(parameter, value, values, direction) {
                debug!(
                    parameter = %parameter,
                    value = %value,
                    constraint = ?constraint,
                    ?direction,
                    "constraint rejected candidate"
                );
                return false;
            }
        }
    }
    true
}

fn text_of(value: &RouteValue) -> Option<Cow<'_, str>> {
    match value {
        RouteValue::Str(s) => Some(Cow::Borrowed(s)),
        RouteValue::Int(i) => Some(Cow::Owned(i.to_string())),
        RouteValue::List(_) | RouteValue::Null => None,
    }
}

fn int_of(value: &RouteValue) -> Option<i64> {
    match value {
        RouteValue::Int(i) => Some(*i),
        RouteValue::Str(s) => s.parse().ok(),
        RouteValue::List(_) | RouteValue::Null => None,
    }
}

/// Requires the value to be a 64-bit integer.
#[derive(Debug, Clone, Copy)]
pub struct IntConstraint;

impl RouteConstraint for IntConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        int_of(value).is_some()
    }
}

/// Requires the value to be `true` or `false`, case-insensitively.
#[derive(Debug, Clone, Copy)]
pub struct BoolConstraint;

impl RouteConstraint for BoolConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false"))
    }
}

/// Requires the value to parse as a UUID.
#[derive(Debug, Clone, Copy)]
pub struct GuidConstraint;

impl RouteConstraint for GuidConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| t.parse::<uuid::Uuid>().is_ok())
    }
}

/// Requires the value to contain only ASCII letters. The empty string is
/// accepted.
#[derive(Debug, Clone, Copy)]
pub struct AlphaConstraint;

impl RouteConstraint for AlphaConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| t.chars().all(|c| c.is_ascii_alphabetic()))
    }
}

/// Requires the value's character count to fall within `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct LengthConstraint {
    /// Minimum number of characters, inclusive.
    pub min: usize,
    /// Maximum number of characters, inclusive.
    pub max: usize,
}

impl RouteConstraint for LengthConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| {
            let len = t.chars().count();
            len >= self.min && len <= self.max
        })
    }
}

/// Requires at least the given number of characters.
#[derive(Debug, Clone, Copy)]
pub struct MinLengthConstraint(pub usize);

impl RouteConstraint for MinLengthConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| t.chars().count() >= self.0)
    }
}

/// Requires at most the given number of characters.
#[derive(Debug, Clone, Copy)]
pub struct MaxLengthConstraint(pub usize);

impl RouteConstraint for MaxLengthConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| t.chars().count() <= self.0)
    }
}

/// Requires an integer value at or above the given bound.
#[derive(Debug, Clone, Copy)]
pub struct MinConstraint(pub i64);

impl RouteConstraint for MinConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        int_of(value).is_some_and(|i| i >= self.0)
    }
}

/// Requires an integer value at or below the given bound.
#[derive(Debug, Clone, Copy)]
pub struct MaxConstraint(pub i64);

impl RouteConstraint for MaxConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        int_of(value).is_some_and(|i| i <= self.0)
    }
}

/// Requires an integer value within `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct RangeConstraint {
    /// Lower bound, inclusive.
    pub min: i64,
    /// Upper bound, inclusive.
    pub max: i64,
}

impl RouteConstraint for RangeConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        int_of(value).is_some_and(|i| i >= self.min && i <= self.max)
    }
}

/// Requires the value to fully match a regular expression.
///
/// The pattern is anchored with `^` and `$` if it is not already.
#[derive(Debug)]
pub struct RegexConstraint {
    regex: Regex,
}

impl RegexConstraint {
    /// Compiles an anchored regex constraint.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::ImproperlyConfigured`] when the pattern does
    /// not compile.
    pub fn new(pattern: &str) -> RouteResult<Self> {
        let anchored = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            format!("^{pattern}")
        };
        let anchored = if anchored.ends_with('$') {
            anchored
        } else {
            format!("{anchored}$")
        };
        let regex = Regex::new(&anchored).map_err(|e| {
            RouteError::ImproperlyConfigured(format!("invalid regex constraint: {e}"))
        })?;
        Ok(Self { regex })
    }
}

impl RouteConstraint for RegexConstraint {
    fn matches(&self, _: &str, value: &RouteValue, _: &RouteValues, _: ConstraintDirection) -> bool {
        text_of(value).is_some_and(|t| self.regex.is_match(&t))
    }
}

/// Resolves an inline constraint expression to a boxed constraint.
///
/// # Errors
///
/// Returns [`RouteError::ImproperlyConfigured`] for unknown constraint
/// names, bad argument counts, or unparsable arguments.
pub fn resolve_constraint(expression: &str) -> RouteResult<Box<dyn RouteConstraint>> {
    let (name, args) = match expression.find('(') {
        Some(open) if expression.ends_with(')') => {
            let name = &expression[..open];
            let raw = &expression[open + 1..expression.len() - 1];
            (name, Some(raw))
        }
        Some(_) => {
            return Err(RouteError::ImproperlyConfigured(format!(
                "malformed constraint expression: {expression}"
            )));
        }
        None => (expression, None),
    };

    fn int_args(name: &str, raw: Option<&str>, count: usize) -> RouteResult<Vec<i64>> {
        let raw = raw.ok_or_else(|| {
            RouteError::ImproperlyConfigured(format!("constraint '{name}' requires arguments"))
        })?;
        let parsed: Result<Vec<i64>, _> =
            raw.split(',').map(|a| a.trim().parse::<i64>()).collect();
        let parsed = parsed.map_err(|_| {
            RouteError::ImproperlyConfigured(format!(
                "constraint '{name}' has non-numeric arguments: {raw}"
            ))
        })?;
        if parsed.len() != count {
            return Err(RouteError::ImproperlyConfigured(format!(
                "constraint '{name}' expects {count} argument(s), got {}",
                parsed.len()
            )));
        }
        Ok(parsed)
    }

    #[allow(clippy::cast_sign_loss)]
    match name {
        "int" => Ok(Box::new(IntConstraint)),
        "bool" => Ok(Box::new(BoolConstraint)),
        "guid" => Ok(Box::new(GuidConstraint)),
        "alpha" => Ok(Box::new(AlphaConstraint)),
        "minlength" => {
            let a = int_args(name, args, 1)?;
            Ok(Box::new(MinLengthConstraint(a[0].max(0) as usize)))
        }
        "maxlength" => {
            let a = int_args(name, args, 1)?;
            Ok(Box::new(MaxLengthConstraint(a[0].max(0) as usize)))
        }
        "length" => {
            let raw = args.unwrap_or("");
            let parts = raw.split(',').count();
            if parts == 1 {
                let a = int_args(name, args, 1)?;
                let n = a[0].max(0) as usize;
                Ok(Box::new(LengthConstraint { min: n, max: n }))
            } else {
                let a = int_args(name, args, 2)?;
                Ok(Box::new(LengthConstraint {
                    min: a[0].max(0) as usize,
                    max: a[1].max(0) as usize,
                }))
            }
        }
        "min" => {
            let a = int_args(name, args, 1)?;
            Ok(Box::new(MinConstraint(a[0])))
        }
        "max" => {
            let a = int_args(name, args, 1)?;
            Ok(Box::new(MaxConstraint(a[0])))
        }
        "range" => {
            let a = int_args(name, args, 2)?;
            Ok(Box::new(RangeConstraint { min: a[0], max: a[1] }))
        }
        "regex" => {
            let pattern = args.ok_or_else(|| {
                RouteError::ImproperlyConfigured("regex constraint requires a pattern".to_string())
            })?;
            Ok(Box::new(RegexConstraint::new(pattern)?))
        }
        _ => Err(RouteError::ImproperlyConfigured(format!(
            "unknown constraint: {name}"
        ))),
    }
}
