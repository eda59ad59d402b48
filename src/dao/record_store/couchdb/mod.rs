//! CouchDB backend for the record store (feature `couch-store`).

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::CouchConfig;
pub use store::CouchRecordStore;
