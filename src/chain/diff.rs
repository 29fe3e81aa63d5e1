//! Three-way attribute diff recorded by every non-genesis block.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::document::{AttributeValue, Attributes};

/// Changes between two attribute sets, keyed by field presence and value
/// inequality. `modified` carries the new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeDiff {
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub added: Attributes,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub modified: Attributes,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted: BTreeSet<String>,
}

impl AttributeDiff {
    /// Diff `old` against `new`.
    pub fn between(old: &Attributes, new: &Attributes) -> Self {
        let mut diff = Self::default();

        for (field, value) in new {
            match old.get(field) {
                None => {
                    diff.added.insert(field.clone(), value.clone());
                }
                Some(previous) if previous != value => {
                    diff.modified.insert(field.clone(), value.clone());
                }
                Some(_) => {}
            }
        }

        diff.deleted = old
            .keys()
            .filter(|field| !new.contains_key(*field))
            .cloned()
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Apply this diff on top of `base`.
    pub fn apply(&self, base: &Attributes) -> Attributes {
        let mut out = base.clone();
        for field in &self.deleted {
            out.remove(field);
        }
        for (field, value) in self.added.iter().chain(self.modified.iter()) {
            out.insert(field.clone(), value.clone());
        }
        out
    }

    /// New value for a field if the diff added or modified it
    pub fn changed_value(&self, field: &str) -> Option<&AttributeValue> {
        self.added.get(field).or_else(|| self.modified.get(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::attributes;

    #[test]
    fn test_between_classifies_changes() {
        let old = attributes([("color", "red"), ("size", "m"), ("shape", "round")]);
        let new = attributes([("color", "red"), ("size", "l"), ("owner", "ada")]);

        let diff = AttributeDiff::between(&old, &new);
        assert_eq!(diff.added, attributes([("owner", "ada")]));
        assert_eq!(diff.modified, attributes([("size", "l")]));
        assert_eq!(diff.deleted, BTreeSet::from(["shape".to_string()]));
    }

    #[test]
    fn test_apply_reproduces_target() {
        let old = attributes([("a", 1i64), ("b", 2i64)]);
        let new = attributes([("b", 3i64), ("c", 4i64)]);
        let diff = AttributeDiff::between(&old, &new);
        assert_eq!(diff.apply(&old), new);
    }

    #[test]
    fn test_identical_sets_give_empty_diff() {
        let attrs = attributes([("a", "x")]);
        assert!(AttributeDiff::between(&attrs, &attrs).is_empty());
    }

    #[test]
    fn test_empty_parts_are_omitted_when_serialized() {
        let old = attributes([("count", 3i64)]);
        let new = attributes([("count", 5i64)]);
        let encoded = serde_json::to_value(AttributeDiff::between(&old, &new)).unwrap();
        assert_eq!(encoded, serde_json::json!({"modified": {"count": 5}}));
    }
}
