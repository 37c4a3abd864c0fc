//! Operation messages exchanged through the external queue.
//!
//! [`Operation`] is the decoded, transport-independent form a worker applies
//! to the store. The [`wire`] submodule maps it to and from the JSON records
//! carried by the queue:
//!
//! | Operation | JSON shape                                  |
//! |-----------|---------------------------------------------|
//! | Add       | `{"operation":"Add","key":"K","data":"V"}`  |
//! | Remove    | `{"operation":"Remove","itemId":"K"}`       |
//! | Get       | `{"operation":"Get","itemId":"K"}`          |
//! | `GetAll`  | `{"operation":"GetAll"}`                    |

pub mod operation;
pub mod wire;

pub use operation::{operation_names, Operation};
pub use wire::{decode, encode, DecodeError, WireMessage};
