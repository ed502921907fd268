use serde::{Deserialize, Serialize};

use crate::domain::MovieId;

/// A movie as it appears in search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,

    pub title: String,

    #[serde(default)]
    pub poster_path: Option<String>,

    #[serde(default)]
    pub backdrop_path: Option<String>,

    /// `YYYY-MM-DD`; the catalog sends an empty string for unreleased titles.
    #[serde(default)]
    pub release_date: Option<String>,

    #[serde(default)]
    pub vote_average: f64,

    #[serde(default)]
    pub vote_count: u64,

    #[serde(default)]
    pub overview: Option<String>,
}

impl Movie {
    /// Release year, if the release date is present and well formed.
    #[must_use]
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

/// One page of search results for a (query, page) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultPage {
    #[serde(default)]
    pub results: Vec<Movie>,

    pub page: u32,

    #[serde(default)]
    pub total_pages: u32,

    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionCompany {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
}

/// Full record returned by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    pub id: MovieId,

    pub title: String,

    #[serde(default)]
    pub poster_path: Option<String>,

    #[serde(default)]
    pub backdrop_path: Option<String>,

    #[serde(default)]
    pub release_date: Option<String>,

    /// Minutes. Zero or absent when the catalog doesn't know.
    #[serde(default)]
    pub runtime: Option<u32>,

    #[serde(default)]
    pub vote_average: f64,

    #[serde(default)]
    pub vote_count: u64,

    #[serde(default)]
    pub genres: Vec<Genre>,

    #[serde(default)]
    pub overview: Option<String>,

    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,

    #[serde(default)]
    pub tagline: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(default)]
    pub imdb_id: Option<String>,
}

impl MovieDetail {
    /// Summary view of this detail, as it would appear in a result list.
    #[must_use]
    pub fn summary(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            release_date: self.release_date.clone(),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            overview: self.overview.clone(),
        }
    }

    #[must_use]
    pub fn known_runtime(&self) -> Option<u32> {
        self.runtime.filter(|r| *r > 0)
    }
}
