use std::fmt;

use crate::types::Item;

/// Wire names of the operation variants, as carried in the `operation` field.
pub mod operation_names {
    pub const ADD: &str = "Add";
    pub const REMOVE: &str = "Remove";
    pub const GET: &str = "Get";
    pub const GET_ALL: &str = "GetAll";

    /// All recognised names, in declaration order.
    pub const ALL: [&str; 4] = [ADD, REMOVE, GET, GET_ALL];
}

/// A decoded store operation.
///
/// Operations carry no correlation id: the protocol is fire-and-forget and
/// the results of `Get`/`GetAll` are only observable where they are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert or move-to-tail update.
    Add(Item),
    Remove { key: String },
    Get { key: String },
    GetAll,
}

impl Operation {
    /// Shorthand for `Operation::Add(Item::new(key, value))`.
    #[must_use]
    pub fn add(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Add(Item::new(key, value))
    }

    #[must_use]
    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }

    #[must_use]
    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    /// Wire name of this variant.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => operation_names::ADD,
            Self::Remove { .. } => operation_names::REMOVE,
            Self::Get { .. } => operation_names::GET,
            Self::GetAll => operation_names::GET_ALL,
        }
    }

    /// The key this operation targets, if it targets a single key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Add(item) => Some(&item.key),
            Self::Remove { key } | Self::Get { key } => Some(key),
            Self::GetAll => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(item) => write!(f, "Add({}, {})", item.key, item.value),
            Self::Remove { key } => write!(f, "Remove({key})"),
            Self::Get { key } => write!(f, "Get({key})"),
            Self::GetAll => f.write_str("GetAll"),
        }
    }
}
