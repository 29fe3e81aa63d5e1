//! Search predicates and document queries

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Comparison operator of a search predicate.
///
/// Only equality is evaluated. Any other operator parses as `Unsupported`
/// and matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Unsupported(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::Unsupported(op) => op,
        }
    }
}

impl FromStr for Operator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Operator::from(s.to_string()))
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        if s == "=" {
            Operator::Eq
        } else {
            Operator::Unsupported(s)
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One conjunctive predicate: `field <operator> value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub operator: Operator,
    pub field: String,
    /// Compared against index terms, so integers use their decimal form
    pub value: String,
}

impl SearchQuery {
    pub fn new(operator: Operator, field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            operator,
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// `field = value`
    pub fn equals(field: impl Into<String>, value: impl ToString) -> Self {
        Self::new(Operator::Eq, field, value)
    }

    /// Parse `field=value`. The value may itself contain `=`.
    pub fn parse_equality(raw: &str) -> Option<Self> {
        let (field, value) = raw.split_once('=')?;
        if field.is_empty() {
            return None;
        }
        Some(Self::equals(field, value))
    }
}

/// A search over the documents of a kekspace.
///
/// - no predicates: every document, paged by the configured default limit
///   when `limit` is 0
/// - with predicates: documents matching all of them; `limit` 0 yields an
///   empty page
/// - `order_by` unset sorts by creation time, otherwise by that attribute
///   read as a string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocQuery {
    #[serde(default)]
    pub search_queries: Vec<SearchQuery>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub with_doc_revs: bool,
}

impl DocQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate
    pub fn filter(mut self, query: SearchQuery) -> Self {
        self.search_queries.push(query);
        self
    }

    /// Add an equality predicate
    pub fn where_eq(self, field: impl Into<String>, value: impl ToString) -> Self {
        self.filter(SearchQuery::equals(field, value))
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Attach each result's revision chain
    pub fn with_revisions(mut self) -> Self {
        self.with_doc_revs = true;
        self
    }

    pub fn is_filtered(&self) -> bool {
        !self.search_queries.is_empty()
    }

    /// Page size actually applied. Only the unfiltered path falls back to
    /// `default_limit`.
    pub fn effective_limit(&self, default_limit: usize) -> usize {
        if self.limit == 0 && !self.is_filtered() {
            default_limit
        } else {
            self.limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!(
            ">".parse::<Operator>().unwrap(),
            Operator::Unsupported(">".into())
        );
    }

    #[test]
    fn test_operator_wire_form() {
        let query = SearchQuery::equals("count", 3);
        let encoded = serde_json::to_value(&query).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({"operator": "=", "field": "count", "value": "3"})
        );

        let decoded: SearchQuery =
            serde_json::from_str(r#"{"operator":"!=","field":"a","value":"b"}"#).unwrap();
        assert_eq!(decoded.operator, Operator::Unsupported("!=".into()));
    }

    #[test]
    fn test_parse_equality() {
        assert_eq!(
            SearchQuery::parse_equality("color=red"),
            Some(SearchQuery::equals("color", "red"))
        );
        assert_eq!(
            SearchQuery::parse_equality("expr=a=b").map(|q| q.value),
            Some("a=b".to_string())
        );
        assert!(SearchQuery::parse_equality("novalue").is_none());
        assert!(SearchQuery::parse_equality("=red").is_none());
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(DocQuery::new().effective_limit(20), 20);
        assert_eq!(DocQuery::new().limit(5).effective_limit(20), 5);
        assert_eq!(DocQuery::new().where_eq("a", "b").effective_limit(20), 0);
        assert_eq!(DocQuery::new().where_eq("a", "b").limit(3).effective_limit(20), 3);
    }
}
