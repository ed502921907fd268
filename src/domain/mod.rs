//! Domain types for movie search with strong typing.
//!
//! This module provides the identifiers and key types shared by the caches and
//! coordinators. It follows the Newtype pattern so movie ids, page numbers and
//! cache keys cannot be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a movie in the external catalog.
///
/// # Examples
///
/// ```rust
/// use cinesearch::domain::MovieId;
///
/// let id = MovieId::new(272);
/// assert_eq!(id.value(), 272);
/// assert_eq!(id.to_string(), "272");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MovieId(u64);

impl MovieId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Cache key for the detail entry of this movie.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("movie/{}", self.0)
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<MovieId> for u64 {
    fn from(id: MovieId) -> Self {
        id.0
    }
}

impl FromStr for MovieId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

impl Serialize for MovieId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for MovieId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = u64::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Canonicalizes raw search text: trims, collapses inner whitespace and
/// lower-cases. The result is what the caches are keyed on.
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A search as typed by the user, together with its canonical form and the
/// page currently addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    normalized: String,
    page: u32,
}

impl SearchQuery {
    /// Creates a query addressing page 1.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize_query(&raw);
        Self {
            raw,
            normalized,
            page: 1,
        }
    }

    /// Returns the same query addressing `page`. Pages are 1-based; zero is
    /// clamped to 1.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    #[must_use]
    pub fn cache_key(&self) -> String {
        search_key(&self.normalized, self.page)
    }
}

/// Cache key for one (normalized query, page) pair.
#[must_use]
pub fn search_key(normalized_query: &str, page: u32) -> String {
    format!("search/{page}/{normalized_query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_id_conversions() {
        let id = MovieId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(u64::from(id), 42);
        assert_eq!(MovieId::from(42), id);
        assert_eq!(id.cache_key(), "movie/42");
    }

    #[test]
    fn movie_id_parses_route_segments() {
        assert_eq!(" 603 ".parse::<MovieId>().unwrap(), MovieId::new(603));
        assert!("abc".parse::<MovieId>().is_err());
        assert!("-1".parse::<MovieId>().is_err());
    }

    #[test]
    fn movie_id_serialization() {
        let id = MovieId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let deserialized: MovieId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_query("  The  Dark Knight "), "the dark knight");
        assert_eq!(normalize_query("BATMAN"), "batman");
        assert_eq!(normalize_query("   \t "), "");
    }

    #[test]
    fn search_query_keys_include_page() {
        let q = SearchQuery::new(" Batman ");
        assert_eq!(q.raw(), " Batman ");
        assert_eq!(q.normalized(), "batman");
        assert_eq!(q.page(), 1);
        assert_eq!(q.cache_key(), "search/1/batman");

        let q = q.with_page(0);
        assert_eq!(q.page(), 1);
        assert_eq!(q.with_page(3).cache_key(), "search/3/batman");
    }

    #[test]
    fn empty_query_detection() {
        assert!(SearchQuery::new("  ").is_empty());
        assert!(!SearchQuery::new("a").is_empty());
    }
}
