//! Query subsystem
//!
//! Conjunctive equality search over the attribute index, with an
//! unfiltered listing fallback, sorting and offset/limit paging.

mod engine;
#[allow(clippy::module_inception)]
mod query;
mod sorter;

pub use engine::QueryEngine;
pub use query::{DocQuery, Operator, SearchQuery};
pub use sorter::ResultSorter;
