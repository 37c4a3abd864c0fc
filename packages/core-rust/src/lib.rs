//! `ordkv` Core: ordered keyed store, operation model, and queue wire codec.

pub mod command;
pub mod messages;
pub mod ordered_store;
pub mod types;

pub use command::CommandError;
pub use messages::{DecodeError, Operation};
pub use ordered_store::{OrderedKeyedStore, StoreError};
pub use types::Item;
