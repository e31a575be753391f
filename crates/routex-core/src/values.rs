//! The route values map.
//!
//! [`RouteValues`] carries parameter values between the matchers and the
//! link generator. Lookup is case-insensitive on the parameter name, while
//! iteration preserves insertion order so that query-string emission is
//! deterministic. The map supports the cheap mark/rollback protocol the
//! match engines use to undo a failed candidate attempt.

use std::fmt;

/// A single value cell in a [`RouteValues`] map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteValue {
    /// A string value, the common case for captured path segments.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A list of values; expands to one query pair per element.
    List(Vec<String>),
    /// An explicit absence. Skipped during query emission.
    Null,
}

impl RouteValue {
    /// Returns `true` when two values render to the same text, compared
    /// ASCII case-insensitively. Used when deciding whether a bound value
    /// equals a default and the segment can be elided.
    pub fn equals_ignore_case(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
            }
            (a, b) => a.to_string().eq_ignore_ascii_case(&b.to_string()),
        }
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::List(v) => write!(f, "{}", v.join(",")),
            Self::Null => Ok(()),
        }
    }
}

impl From<&str> for RouteValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for RouteValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for RouteValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Vec<String>> for RouteValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

/// An insertion-ordered map from case-insensitive parameter names to
/// [`RouteValue`] cells.
///
/// Backed by a plain `Vec` of pairs: the maps this library handles hold a
/// handful of entries, and the vector representation is what makes the
/// [`mark`](RouteValues::mark) / [`rollback`](RouteValues::rollback)
/// protocol a truncation instead of a copy.
///
/// # Examples
///
/// ```
/// use routex_core::{RouteValue, RouteValues};
///
/// let mut values = RouteValues::new();
/// values.set("controller", "Home");
/// values.set("id", 10i64);
///
/// assert_eq!(values.get("CONTROLLER"), Some(&RouteValue::Str("Home".into())));
/// let keys: Vec<&str> = values.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, vec!["controller", "id"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteValues {
    entries: Vec<(String, RouteValue)>,
}

impl RouteValues {
    /// Creates an empty map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&RouteValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key` (case-insensitive).
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets `key` to `value`, replacing an existing entry in place (the
    /// original insertion position and spelling of the key are kept) or
    /// appending a new one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<RouteValue>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Records the current length as a rollback point.
    ///
    /// The snapshot protocol assumes that only *new* keys are written
    /// between `mark` and [`rollback`](RouteValues::rollback); every engine
    /// call site satisfies this because capture names are unique within a
    /// template and defaults only fill absent keys.
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    /// Truncates the map back to a previous [`mark`](RouteValues::mark),
    /// discarding everything written since.
    pub fn rollback(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }
}

impl PartialEq for RouteValues {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(String, RouteValue)> for RouteValues {
    fn from_iter<I: IntoIterator<Item = (String, RouteValue)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (k, v) in iter {
            values.set(k, v);
        }
        values
    }
}
