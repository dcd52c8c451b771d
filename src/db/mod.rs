//! Database layer
//!
//! MongoDB-backed implementation of the off-chain document store.

pub mod mongo;

pub use mongo::{MongoClient, MongoDocumentStore};
