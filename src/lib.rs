//! kek - an embedded document store with per-document revision chains
//!
//! Documents live in a kekspace on a key/value backend. Every change to a
//! document's attributes appends a hash-linked block to its revision chain,
//! and indexable attributes are mirrored into an inverted index that the
//! query engine intersects for equality searches.

pub mod chain;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod observability;
pub mod query;
pub mod space;
pub mod storage;
pub mod tasks;

pub use config::KekConfig;
pub use document::{Document, DocumentEngine};
pub use error::{KekError, KekResult};
pub use query::{DocQuery, QueryEngine};
