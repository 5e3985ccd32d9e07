//! Helpers for assembling flat argument lists from structured options

use std::fmt::Display;

/// An ordered list of command-line arguments built flag by flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList(Vec<String>);

impl ArgList {
    /// Create an empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single argument
    pub fn push(&mut self, value: impl Into<String>) -> &mut Self {
        self.0.push(value.into());
        self
    }

    /// Append several arguments in order
    pub fn extend<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(values.into_iter().map(Into::into));
        self
    }

    /// Append `flag` only when `enabled`
    pub fn switch(&mut self, flag: &str, enabled: bool) -> &mut Self {
        if enabled {
            self.push(flag);
        }
        self
    }

    /// Append `flag value`
    pub fn option(&mut self, flag: &str, value: impl Display) -> &mut Self {
        self.push(flag).push(value.to_string())
    }

    /// Append `flag value` when a value is set
    pub fn option_opt<V: Display>(&mut self, flag: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.option(flag, value);
        }
        self
    }

    /// Append `flag value` once per value
    pub fn repeated<I, V>(&mut self, flag: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        for value in values {
            self.option(flag, value);
        }
        self
    }

    /// Number of arguments collected so far
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments have been collected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the collected arguments
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consume the list
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl IntoIterator for ArgList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Join a key and value as `KEY=VALUE`
pub fn key_value(key: impl Display, value: impl Display) -> String {
    format!("{key}={value}")
}

/// Join pairs as `k1=v1<sep>k2=v2`
pub fn join_pairs<I, K, V>(pairs: I, separator: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    pairs
        .into_iter()
        .map(|(key, value)| key_value(key, value))
        .collect::<Vec<_>>()
        .join(separator)
}
