//! Attribute index
//!
//! A persisted inverted index realized as empty marker records:
//!
//! ```text
//! f/<field>/<value>/<document id>
//! ```
//!
//! Listing `f/<field>/<value>` yields the posting list for that pair. The
//! index is derived state; document bodies stay the source of truth, and
//! `DocumentEngine::repair` rebuilds a document's markers from its body.

mod attribute;
mod errors;

pub use attribute::{AttributeIndex, IndexTerm, ReindexOutcome};
pub use errors::{IndexError, IndexResult};
