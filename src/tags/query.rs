use axum::extract::Query;
use http::Uri;
use indexmap::IndexMap;

use crate::error::TagError;

/// Query parameters as an ordered multimap.
///
/// Names keep the order of their first appearance; each name keeps its
/// values in the order they appeared (`?a=1&b=2&a=3` gives `a: [1, 3]`,
/// `b: [2]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: IndexMap<String, Vec<String>>,
}

impl QueryParams {
    /// Builds the multimap from decoded `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = QueryParams::default();
        for (name, value) in pairs {
            params.push(name.into(), value.into());
        }
        params
    }

    /// Decodes the query component of a URI.
    pub fn from_uri(uri: &Uri) -> Result<Self, TagError> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map_err(|e| TagError::InvalidQuery(e.to_string()))?;
        Ok(Self::from_pairs(pairs))
    }

    fn push(&mut self, name: String, value: String) {
        self.entries.entry(name).or_default().push(value);
    }

    /// Parameter names in first-appearance order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All values for `name`, empty if absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
