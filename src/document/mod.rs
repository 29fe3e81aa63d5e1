//! Documents and their lifecycle
//!
//! - `value`: the closed attribute value variant
//! - `document`: the persisted body
//! - `engine`: Create / Get / Update / Delete across body, chain and index
//!
//! The body is the source of truth for a document's attributes. The index
//! and the chain are kept in step with it on every mutation, but nothing
//! here is transactional: a failure partway leaves the pieces disagreeing
//! until the same operation is retried or `DocumentEngine::repair` runs.

#[allow(clippy::module_inception)]
mod document;
mod engine;
mod value;

pub use document::{new_document_id, Document, DOCUMENT_ID_PREFIX};
pub use engine::{DocumentEngine, RepairReport};
pub use value::{attributes, attributes_from_json, AttributeValue, Attributes};
