//! Path and query parameters of a request.

use std::collections::HashMap;
use tracing::debug;

/// Wildcard bindings of the matched route, in declaration order.
///
/// For the route `/users/:id` and the request `/users/42`, `id` is bound to `42`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { inner: Vec::new() }
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.inner.push((name.to_owned(), value.to_owned()));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.inner.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Copies the bindings into a map.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.inner.iter().cloned().collect()
    }
}

/// Decoded query string pairs, in the order they appear in the url.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    inner: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses an `application/x-www-form-urlencoded` query string.
    ///
    /// A query that fails to decode yields no parameters.
    pub fn parse(query: Option<&str>) -> Self {
        let Some(query) = query.filter(|q| !q.is_empty()) else {
            return Self::default();
        };

        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(inner) => Self { inner },
            Err(e) => {
                debug!(cause = %e, query, "ignore undecodable query string");
                Self::default()
            }
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the first value bound to `name`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.inner.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Returns every value bound to `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner.iter().filter(move |(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Copies the pairs into a map, keeping the first value of repeated keys.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(self.inner.len());
        for (key, value) in &self.inner {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::{PathParams, QueryParams};

    #[test]
    fn test_path_params() {
        let mut params = PathParams::empty();
        assert!(params.is_empty());

        params.push("name", "madhuri");
        params.push("age", "32");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("age"), Some("32"));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("name", "madhuri"), ("age", "32")]);

        let map = params.to_map();
        assert_eq!(map.get("name").map(String::as_str), Some("madhuri"));
    }

    #[test]
    fn test_query_params_decoding() {
        let query = QueryParams::parse(Some("name=john+doe&city=New%20York&empty="));

        assert_eq!(query.get("name"), Some("john doe"));
        assert_eq!(query.get("city"), Some("New York"));
        assert_eq!(query.get("empty"), Some(""));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn test_query_params_repeated_keys() {
        let query = QueryParams::parse(Some("tag=a&tag=b&page=2"));

        assert_eq!(query.get("tag"), Some("a"));
        assert_eq!(query.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);

        let map = query.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["tag"], "a");
        assert_eq!(map["page"], "2");
    }

    #[test]
    fn test_missing_query() {
        assert!(QueryParams::parse(None).is_empty());
        assert!(QueryParams::parse(Some("")).is_empty());
    }
}
