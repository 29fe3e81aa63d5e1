//! Result sorting for query execution
//!
//! Sorts by creation time, or by one attribute read as a string.
//! Ties break by document id so the order is deterministic.

use std::cmp::Ordering;

use crate::document::{AttributeValue, Document};
use crate::error::{KekError, KekResult};

/// Sorts result documents
pub struct ResultSorter;

impl ResultSorter {
    /// Sort documents by `order_by`, or by `created_at` ascending when unset
    /// or empty.
    ///
    /// Fails with `TypeMismatch` if any document lacks the attribute or
    /// holds a non-string value under it.
    pub fn sort(documents: Vec<Document>, order_by: Option<&str>) -> KekResult<Vec<Document>> {
        match order_by.filter(|field| !field.is_empty()) {
            None => {
                let mut documents = documents;
                documents.sort_by(Self::by_creation);
                Ok(documents)
            }
            Some(field) => {
                let mut keyed = documents
                    .into_iter()
                    .map(|doc| Ok((Self::sort_key(&doc, field)?, doc)))
                    .collect::<KekResult<Vec<(String, Document)>>>()?;

                keyed.sort_by(|(a_key, a), (b_key, b)| {
                    a_key.cmp(b_key).then_with(|| a.id.cmp(&b.id))
                });
                Ok(keyed.into_iter().map(|(_, doc)| doc).collect())
            }
        }
    }

    fn by_creation(a: &Document, b: &Document) -> Ordering {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }

    fn sort_key(document: &Document, field: &str) -> KekResult<String> {
        match document.attributes.get(field) {
            Some(AttributeValue::String(value)) => Ok(value.clone()),
            Some(other) => Err(KekError::type_mismatch(
                field,
                format!("document {} holds a {} value", document.id, other.kind()),
            )),
            None => Err(KekError::type_mismatch(
                field,
                format!("document {} has no such attribute", document.id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{attributes, Attributes};
    use chrono::{Duration, Utc};

    fn make_doc(id: &str, minutes_ago: i64, attrs: Attributes) -> Document {
        let mut doc = Document::new(id, id, attrs, "head");
        doc.created_at = Utc::now() - Duration::minutes(minutes_ago);
        doc
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_creation_ascending() {
        let docs = vec![
            make_doc("c", 1, Attributes::new()),
            make_doc("a", 3, Attributes::new()),
            make_doc("b", 2, Attributes::new()),
        ];
        let sorted = ResultSorter::sort(docs, None).unwrap();
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_order_by_means_creation() {
        let docs = vec![make_doc("y", 1, Attributes::new()), make_doc("x", 2, Attributes::new())];
        let sorted = ResultSorter::sort(docs, Some("")).unwrap();
        assert_eq!(ids(&sorted), vec!["x", "y"]);
    }

    #[test]
    fn test_sort_by_string_attribute() {
        let docs = vec![
            make_doc("1", 0, attributes([("name", "charlie")])),
            make_doc("2", 0, attributes([("name", "alice")])),
            make_doc("3", 0, attributes([("name", "bob")])),
        ];
        let sorted = ResultSorter::sort(docs, Some("name")).unwrap();
        assert_eq!(ids(&sorted), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_equal_keys_break_by_id() {
        let docs = vec![
            make_doc("b", 0, attributes([("k", "same")])),
            make_doc("a", 0, attributes([("k", "same")])),
        ];
        let sorted = ResultSorter::sort(docs, Some("k")).unwrap();
        assert_eq!(ids(&sorted), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_or_non_string_key_is_type_mismatch() {
        let docs = vec![
            make_doc("1", 0, attributes([("name", "alice")])),
            make_doc("2", 0, Attributes::new()),
        ];
        assert!(matches!(
            ResultSorter::sort(docs, Some("name")),
            Err(KekError::TypeMismatch { field, .. }) if field == "name"
        ));

        let docs = vec![make_doc("1", 0, attributes([("count", 3i64)]))];
        assert!(matches!(
            ResultSorter::sort(docs, Some("count")),
            Err(KekError::TypeMismatch { .. })
        ));
    }
}
