//! Basic type definitions for the event hub
//!
//! Provides:
//! - `ClientId`: UUID-based unique connection identifier
//! - `OneOrMany`: a single item or an ordered list, used by registration

use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe client identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a single item or an ordered sequence of items
///
/// Lets `App::on` accept `"event"` as well as `["a", "b"]`, resolved once
/// at the call boundary via [`OneOrMany::into_vec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list, preserving order
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(name: &str) -> Self {
        OneOrMany::One(name.to_string())
    }
}

impl From<String> for OneOrMany<String> {
    fn from(name: String) -> Self {
        OneOrMany::One(name)
    }
}

impl From<Vec<&str>> for OneOrMany<String> {
    fn from(names: Vec<&str>) -> Self {
        OneOrMany::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OneOrMany<String> {
    fn from(names: [&str; N]) -> Self {
        OneOrMany::Many(names.iter().map(|name| name.to_string()).collect())
    }
}
