//! # ghostline-store
//!
//! Storage layer for the Ghostline virtual-number messaging service.
//!
//! The crate defines the domain models, the [`Storage`] abstraction the HTTP
//! layer is written against, and two interchangeable backends: an in-memory
//! [`MemStore`] for single-process deployments and a SQLite [`Database`] for
//! installs that want their data to survive a restart.  Exactly one backend
//! instance is constructed at startup and injected into the server.

pub mod contacts;
pub mod conversation;
pub mod database;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod numbers;
pub mod store;
pub mod users;

mod error;

pub use conversation::conversation_id;
pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemStore;
pub use models::*;
pub use store::Storage;
