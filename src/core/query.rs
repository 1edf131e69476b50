//! Cache keys and query states.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Hierarchical cache key, e.g. `["funds", "topHoldings", "<ticker id>"]`.
///
/// Keys are compared segment by segment, so invalidating `["funds"]` drops
/// every fund query while `["fundsX"]` is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey(Vec<String>);

const SEGMENT_END: u8 = 0;

impl QueryKey {
    pub fn root(segment: &str) -> Self {
        QueryKey(vec![segment.to_string()])
    }

    pub fn with(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Byte encoding where every segment is terminated, so a byte prefix
    /// match is also a segment prefix match.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for segment in &self.0 {
            bytes.extend_from_slice(segment.as_bytes());
            bytes.push(SEGMENT_END);
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let body = bytes.strip_suffix(&[SEGMENT_END])?;
        body.split(|b| *b == SEGMENT_END)
            .map(|seg| String::from_utf8(seg.to_vec()).ok())
            .collect::<Option<Vec<_>>>()
            .map(QueryKey)
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Outcome of a query whose input may be missing.
///
/// `Idle` means no request was issued because a required identifier was
/// absent; `Ready` holds whatever the backend returned, including an empty
/// collection.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Idle,
    Ready(T),
}

impl<T> QueryState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, QueryState::Idle)
    }

    pub fn ready(self) -> Option<T> {
        match self {
            QueryState::Idle => None,
            QueryState::Ready(data) => Some(data),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            QueryState::Idle => QueryState::Idle,
            QueryState::Ready(data) => QueryState::Ready(f(data)),
        }
    }
}

impl<T: Default> QueryState<T> {
    /// Data for rendering: idle queries show as empty.
    pub fn unwrap_or_default(self) -> T {
        self.ready().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching_is_per_segment() {
        let key = QueryKey::root("funds").with("topHoldings").with("t-1");
        assert!(key.starts_with(&QueryKey::root("funds")));
        assert!(key.starts_with(&QueryKey::root("funds").with("topHoldings")));
        assert!(!key.starts_with(&QueryKey::root("fund")));
    }

    #[test]
    fn test_byte_encoding_round_trip_and_prefix() {
        let key = QueryKey::root("receipts").with("detail").with("r-9");
        let bytes = key.to_bytes();
        assert_eq!(QueryKey::from_bytes(&bytes), Some(key.clone()));
        assert!(bytes.starts_with(&QueryKey::root("receipts").to_bytes()));
        assert!(!bytes.starts_with(&QueryKey::root("receipt").to_bytes()));
    }

    #[test]
    fn test_query_state() {
        let idle: QueryState<Vec<i32>> = QueryState::Idle;
        assert!(idle.is_idle());
        assert_eq!(idle.unwrap_or_default(), Vec::<i32>::new());
        assert_eq!(QueryState::Ready(2).map(|v| v * 2), QueryState::Ready(4));
    }
}
