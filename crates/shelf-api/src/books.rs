use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::{debug, error};

use shelf_core::CoreError;
use shelf_types::api::{BookSearchQuery, BookSearchResponse, CatalogBook};

use crate::auth::AppState;
use crate::error::ApiError;

pub const GOOGLE_BOOKS_API: &str = "https://www.googleapis.com/books/v1/volumes";

const DEFAULT_MAX_RESULTS: u32 = 20;
const MAX_RESULTS_CAP: u32 = 40;

/// Thin client for the Google Books volumes API. Results are passed through
/// reshaped, never stored.
#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub async fn search(&self, q: &str, start_index: u32, max_results: u32) -> anyhow::Result<BookSearchResponse> {
        let mut params = vec![
            ("q", q.to_string()),
            ("startIndex", start_index.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let body = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_search(&body, start_index)
    }

    /// `None` when the catalog does not know the id.
    pub async fn volume(&self, id: &str) -> anyhow::Result<Option<CatalogBook>> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Ok(None);
        }

        let mut req = self.http.get(format!("{}/{}", self.base_url, id));
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key)]);
        }

        let res = req.send().await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = res.error_for_status()?.text().await?;
        parse_volume(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
    #[serde(default)]
    total_items: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    image_links: Option<ImageLinks>,
    average_rating: Option<f64>,
    description: Option<String>,
    preview_link: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl From<Volume> for CatalogBook {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        Self {
            google_id: volume.id,
            title: info.title,
            authors: info.authors,
            thumbnail: info.image_links.and_then(|links| links.thumbnail),
            rating: info.average_rating,
            description: info.description,
            preview_link: info.preview_link,
            genres: info.categories,
        }
    }
}

fn parse_search(body: &str, start_index: u32) -> anyhow::Result<BookSearchResponse> {
    let value: serde_json::Value = serde_json::from_str(body).context("unexpected catalog search response")?;
    if let Some(err) = value.get("error") {
        bail!("catalog search failed: {}", err);
    }
    let list: VolumeList = serde_json::from_value(value).context("unexpected catalog search response")?;
    let items: Vec<CatalogBook> = list.items.into_iter().map(CatalogBook::from).collect();

    Ok(BookSearchResponse {
        next_start_index: u64::from(start_index) + items.len() as u64,
        total_items: list.total_items,
        items,
    })
}

fn parse_volume(body: &str) -> anyhow::Result<Option<CatalogBook>> {
    let value: serde_json::Value = serde_json::from_str(body).context("unexpected catalog volume response")?;
    if value.get("error").is_some() || value.get("id").is_none() {
        return Ok(None);
    }
    let volume: Volume = serde_json::from_value(value)?;
    Ok(Some(volume.into()))
}

fn clamp_max_results(requested: Option<u32>) -> u32 {
    requested
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .min(MAX_RESULTS_CAP)
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<BookSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(BookSearchResponse {
            items: vec![],
            total_items: 0,
            next_start_index: 0,
        }));
    }

    let max_results = clamp_max_results(query.max_results);
    debug!(q, start_index = query.start_index, max_results, "Catalog search");

    let results = state
        .catalog
        .search(q, query.start_index, max_results)
        .await
        .map_err(|e| {
            error!("Error fetching books: {:#}", e);
            ApiError::Upstream("Failed to fetch books from catalog")
        })?;

    Ok(Json(results))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.catalog.volume(&id).await.map_err(|e| {
        error!("Error fetching book details: {:#}", e);
        ApiError::Upstream("Failed to fetch book details")
    })?;

    match book {
        Some(book) => Ok((StatusCode::OK, Json(book))),
        None => Err(CoreError::not_found("Not found").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_is_reshaped() {
        let body = r#"{
            "totalItems": 512,
            "items": [
                {
                    "id": "zyTCAlFPjgYC",
                    "volumeInfo": {
                        "title": "The Google Story",
                        "authors": ["David A. Vise", "Mark Malseed"],
                        "imageLinks": { "smallThumbnail": "s", "thumbnail": "http://books/t.jpg" },
                        "averageRating": 3.5,
                        "previewLink": "http://books/preview",
                        "categories": ["Business & Economics"]
                    }
                },
                { "id": "bare" }
            ]
        }"#;

        let res = parse_search(body, 40).unwrap();
        assert_eq!(res.total_items, 512);
        assert_eq!(res.next_start_index, 42);

        let first = &res.items[0];
        assert_eq!(first.google_id, "zyTCAlFPjgYC");
        assert_eq!(first.thumbnail.as_deref(), Some("http://books/t.jpg"));
        assert_eq!(first.rating, Some(3.5));
        assert_eq!(first.genres, vec!["Business & Economics".to_string()]);

        let bare = &res.items[1];
        assert!(bare.title.is_none());
        assert!(bare.authors.is_empty());
        assert!(bare.genres.is_empty());
    }

    #[test]
    fn empty_upstream_result_has_no_items() {
        let res = parse_search(r#"{"kind":"books#volumes","totalItems":0}"#, 0).unwrap();
        assert!(res.items.is_empty());
        assert_eq!(res.next_start_index, 0);
    }

    #[test]
    fn search_error_body_is_a_failure() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded"}}"#;
        let err = parse_search(body, 0).unwrap_err();
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[test]
    fn upstream_error_body_means_not_found() {
        let body = r#"{"error":{"code":404,"message":"The volume ID could not be found."}}"#;
        assert!(parse_volume(body).unwrap().is_none());
        let found = parse_volume(r#"{"id":"abc","volumeInfo":{"title":"T"}}"#).unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("T"));
    }

    #[test]
    fn max_results_defaults_and_caps() {
        assert_eq!(clamp_max_results(None), 20);
        assert_eq!(clamp_max_results(Some(0)), 20);
        assert_eq!(clamp_max_results(Some(10)), 10);
        assert_eq!(clamp_max_results(Some(500)), 40);
    }
}
