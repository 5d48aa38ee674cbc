//! Core identifier types

pub mod identifiers;

pub use identifiers::{Address, ContainerId, ObjectId, OwnerId, OWNER_ID_LEN};
