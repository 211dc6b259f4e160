//! Saved calculator state, one opaque JSON document per user.

pub mod store;

pub use store::DataStore;
