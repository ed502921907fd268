use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::clients::MovieCatalog;
use crate::config::CatalogConfig;
use crate::constants::limits::ERROR_BODY_PREVIEW;
use crate::domain::MovieId;
use crate::models::{MovieDetail, ResultPage};
use crate::services::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    ApiKey(String),
    BearerToken(String),
}

impl Credentials {
    #[must_use]
    pub fn from_config(config: &CatalogConfig) -> Self {
        match (&config.access_token, &config.api_key) {
            (Some(token), _) => Self::BearerToken(token.clone()),
            (None, Some(key)) => Self::ApiKey(key.clone()),
            (None, None) => Self::None,
        }
    }
}

/// Error body returned by the catalog alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct CatalogErrorBody {
    status_message: Option<String>,
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    language: Option<String>,
    include_adult: bool,
    timeout: Duration,
}

impl TmdbClient {
    pub fn with_shared_client(client: Client, config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid catalog base URL '{}': {e}", config.base_url))?;

        if base_url.cannot_be_a_base() {
            anyhow::bail!("Catalog base URL '{}' cannot be a base", config.base_url);
        }

        Ok(Self {
            client,
            base_url,
            credentials: Credentials::from_config(config),
            language: config.language.clone(),
            include_adult: config.include_adult,
            timeout: config.request_timeout(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        let mut pairs = Vec::new();
        if let Credentials::ApiKey(key) = &self.credentials {
            pairs.push(("api_key", key.as_str()));
        }
        if let Some(language) = &self.language {
            pairs.push(("language", language.as_str()));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        url
    }

    fn search_url(&self, query: &str, page: u32) -> Url {
        let mut url = self.endpoint(&["search", "movie"]);
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("page", &page.to_string())
            .append_pair("include_adult", if self.include_adult { "true" } else { "false" });
        url
    }

    fn detail_url(&self, id: MovieId) -> Url {
        let id = id.to_string();
        self.endpoint(&["movie", id.as_str()])
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        resource: &str,
    ) -> Result<T, FetchError> {
        debug!(resource, "GET {}", redact(&url));

        let mut request = self.client.get(url);
        if let Credentials::BearerToken(token) = &self.credentials {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(&e))?;

        decode_response(status, &body, resource)
    }

    fn transport_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl MovieCatalog for TmdbClient {
    async fn search_movies(&self, query: &str, page: u32) -> Result<ResultPage, FetchError> {
        let url = self.search_url(query, page);
        self.get_json(url, &format!("search '{query}' page {page}"))
            .await
    }

    async fn movie_detail(&self, id: MovieId) -> Result<MovieDetail, FetchError> {
        let url = self.detail_url(id);
        self.get_json(url, &format!("movie {id}")).await
    }
}

/// Maps a raw catalog response onto the typed result or a [`FetchError`].
pub fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    resource: &str,
) -> Result<T, FetchError> {
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(resource.to_string()));
    }

    if !status.is_success() {
        let message = serde_json::from_str::<CatalogErrorBody>(body)
            .ok()
            .and_then(|b| b.status_message)
            .unwrap_or_else(|| preview(body));
        return Err(FetchError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("{resource}: {e}")))
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

/// Renders `url` with the API key masked, for logging.
fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(config: &CatalogConfig) -> TmdbClient {
        TmdbClient::with_shared_client(Client::new(), config).unwrap()
    }

    #[test]
    fn search_url_carries_query_page_and_key() {
        let config = CatalogConfig {
            api_key: Some("secret".into()),
            ..CatalogConfig::default()
        };
        let url = client(&config).search_url("the dark knight", 2);

        assert_eq!(url.path(), "/3/search/movie");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("query".into(), "the dark knight".into())));
        assert!(pairs.contains(&("page".into(), "2".into())));
        assert!(pairs.contains(&("api_key".into(), "secret".into())));
        assert!(pairs.contains(&("include_adult".into(), "false".into())));
        assert!(pairs.contains(&("language".into(), "en-US".into())));
    }

    #[test]
    fn detail_url_handles_trailing_slash_in_base() {
        let config = CatalogConfig {
            base_url: "http://localhost:8080/api/".into(),
            language: None,
            ..CatalogConfig::default()
        };
        let url = client(&config).detail_url(MovieId::new(155));
        assert_eq!(url.as_str(), "http://localhost:8080/api/movie/155");
    }

    #[test]
    fn bearer_token_wins_over_api_key() {
        let config = CatalogConfig {
            api_key: Some("key".into()),
            access_token: Some("token".into()),
            ..CatalogConfig::default()
        };
        assert_eq!(
            Credentials::from_config(&config),
            Credentials::BearerToken("token".into())
        );
        let url = client(&config).detail_url(MovieId::new(1));
        assert!(url.query_pairs().all(|(k, _)| k != "api_key"));
    }

    #[test]
    fn redact_masks_api_key() {
        let url = Url::parse("https://example.com/movie/1?api_key=secret&language=en").unwrap();
        let shown = redact(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("language=en"));
    }

    #[test]
    fn decode_maps_not_found() {
        let err = decode_response::<MovieDetail>(
            StatusCode::NOT_FOUND,
            r#"{"status_code":34,"status_message":"The resource you requested could not be found."}"#,
            "movie 0",
        )
        .unwrap_err();
        assert_eq!(err, FetchError::NotFound("movie 0".into()));
    }

    #[test]
    fn decode_surfaces_catalog_status_message() {
        let err = decode_response::<ResultPage>(
            StatusCode::UNAUTHORIZED,
            r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key."}"#,
            "search",
        )
        .unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 401,
                message: "Invalid API key: You must be granted a valid key.".into()
            }
        );
    }

    #[test]
    fn decode_reports_unexpected_shapes_as_parse_errors() {
        let err = decode_response::<ResultPage>(StatusCode::OK, r#"{"results": "nope"}"#, "search")
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let err = decode_response::<ResultPage>(StatusCode::OK, "<html>", "search").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn decode_accepts_well_formed_pages() {
        let page: ResultPage = decode_response(
            StatusCode::OK,
            r#"{"page":1,"results":[{"id":1,"title":"A"}],"total_pages":1,"total_results":1}"#,
            "search",
        )
        .unwrap();
        assert_eq!(page.results[0].title, "A");
    }
}
