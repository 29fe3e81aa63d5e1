//! Document body

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Attributes;
use crate::chain::Chain;

/// Prefix of every generated document id
pub const DOCUMENT_ID_PREFIX: &str = "dd";

/// A schema-less document as stored under `d/<id>`.
///
/// `revision` is the hash of the chain's last block, denormalized for
/// display. The chain itself is attached in `revisions` only when a caller
/// asks for it and is never written into the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<Chain>,
}

impl Document {
    /// Fresh body for a new document. `revision` starts as the head of the
    /// chain created alongside it.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: Attributes,
        revision: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            created_at: now,
            updated_at: now,
            revision: revision.into(),
            revisions: None,
        }
    }

    /// Same document without the attached chain
    pub fn without_revisions(mut self) -> Self {
        self.revisions = None;
        self
    }
}

/// Collision-resistant id for a new document
pub fn new_document_id() -> String {
    format!("{}{}", DOCUMENT_ID_PREFIX, Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::attributes;

    #[test]
    fn test_new_document_ids_are_unique() {
        let a = new_document_id();
        let b = new_document_id();
        assert_ne!(a, b);
        assert!(a.starts_with(DOCUMENT_ID_PREFIX));
        assert_eq!(a.len(), DOCUMENT_ID_PREFIX.len() + 32);
    }

    #[test]
    fn test_body_omits_absent_revisions() {
        let doc = Document::new("dd1", "a", attributes([("color", "red")]), "abc");
        let encoded = serde_json::to_value(&doc).unwrap();
        assert!(encoded.get("revisions").is_none());
        assert_eq!(encoded["attributes"]["color"], "red");

        let decoded: Document = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, doc);
    }
}
