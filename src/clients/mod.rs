pub mod tmdb;

use async_trait::async_trait;

use crate::domain::MovieId;
use crate::models::{MovieDetail, ResultPage};
use crate::services::FetchError;

/// The external movie catalog, as seen by the fetch coordinators.
///
/// Implementations report every failure as a [`FetchError`]; they never retry
/// and never cache. Both concerns belong to the coordinators.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Fetches one page of results for an already normalized query.
    async fn search_movies(&self, query: &str, page: u32) -> Result<ResultPage, FetchError>;

    /// Fetches the full record of one movie.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] if the catalog has no such id.
    async fn movie_detail(&self, id: MovieId) -> Result<MovieDetail, FetchError>;
}
