use std::fmt;

use serde::{Deserialize, Serialize};

/// A single key/value entry held by the ordered store.
///
/// Keys and values are opaque strings. Items are handed out by value: every
/// read returns an owned copy, so callers can never reach into store internals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within a store.
    pub key: String,
    /// Opaque payload.
    pub value: String,
}

impl Item {
    /// Creates an item from anything convertible into owned strings.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.key, self.value)
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Item {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_listing_format() {
        assert_eq!(Item::new("1", "A").to_string(), "(1, A)");
    }

    #[test]
    fn from_tuple() {
        let item: Item = ("k", "v").into();
        assert_eq!(item, Item::new("k", "v"));
    }
}
