use anyhow::{Context, anyhow};
use image::DynamicImage;
use reqwest::{Client, Request};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::constants::constants;

/// A single image returned by the search API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageHit {
  pub id: u64,
  #[serde(rename = "pageURL", default)]
  pub page_url: String,
  #[serde(default)]
  pub tags: String,
  #[serde(rename = "previewURL")]
  pub preview_url: String,
  #[serde(rename = "webformatURL")]
  pub webformat_url: String,
  #[serde(rename = "imageWidth")]
  pub image_width: u32,
  #[serde(rename = "imageHeight")]
  pub image_height: u32,
  #[serde(default)]
  pub user: String,
  #[serde(default)]
  pub likes: u64,
  #[serde(default)]
  pub downloads: u64,
  #[serde(default)]
  pub views: u64,
}

impl ImageHit {
  pub fn aspect_ratio(&self) -> f32 {
    if self.image_height == 0 { 1.0 } else { self.image_width as f32 / self.image_height as f32 }
  }

  /// The first few tags, for compact list rows.
  pub fn short_tags(&self, max: usize) -> String {
    self.tags.split(',').map(str::trim).filter(|t| !t.is_empty()).take(max).collect::<Vec<_>>().join(", ")
  }
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
  /// Number of hits reachable through pagination.
  #[serde(rename = "totalHits", default)]
  pub total_hits: u32,
  pub hits: Option<Vec<ImageHit>>,
}

#[derive(Debug, Error)]
pub enum SearchError {
  #[error("no Pixabay API key configured (use --api-key or PIXABAY_API_KEY)")]
  MissingApiKey,
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("API returned {status}: {body}")]
  Status { status: u16, body: String },
}

/// Thin client for the Pixabay image search endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
  http: Client,
  base_url: String,
  api_key: String,
}

impl SearchClient {
  pub fn new(http: Client, api_key: impl Into<String>) -> Self {
    Self { http, base_url: constants().api_base_url.clone(), api_key: api_key.into() }
  }

  pub fn http(&self) -> &Client {
    &self.http
  }

  /// Build the GET request for a query parameter set without sending it.
  ///
  /// Page size, safe-search and editors-choice are always included. The `type`
  /// filter key is renamed to the API's `image_type`; every other key is passed
  /// through as-is and percent-encoded by the URL serializer.
  pub fn build_request(&self, params: &[(String, String)]) -> Result<Request, SearchError> {
    if self.api_key.trim().is_empty() {
      return Err(SearchError::MissingApiKey);
    }
    let c = constants();
    let mut query: Vec<(&str, String)> = vec![
      ("key", self.api_key.clone()),
      ("per_page", c.per_page.to_string()),
      ("safesearch", c.safe_search.to_string()),
      ("editors_choice", c.editors_choice.to_string()),
    ];
    for (key, value) in params {
      let key = if key == "type" { "image_type" } else { key.as_str() };
      query.push((key, value.clone()));
    }
    Ok(self.http.get(&self.base_url).query(&query).build()?)
  }

  pub async fn search(&self, params: &[(String, String)]) -> Result<SearchResponse, SearchError> {
    let request = self.build_request(params)?;
    let response = self.http.execute(request).await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(SearchError::Status { status: status.as_u16(), body: body.trim().to_string() });
    }
    Ok(response.json::<SearchResponse>().await?)
  }
}

/// Download and decode one image.
pub async fn fetch_image(client: &Client, url: &str) -> anyhow::Result<DynamicImage> {
  let response = client.get(url).send().await.with_context(|| format!("Failed to request image {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Image request for {} returned {}", url, response.status()));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image from memory (URL: {})", url))
}

/// A decoded preview image for one hit.
pub struct Preview {
  pub id: u64,
  pub image: DynamicImage,
}

/// Download preview thumbnails for `(id, url)` pairs with bounded concurrency.
/// Each decoded image is sent through `tx` as soon as it is ready; failures are skipped.
pub async fn prefetch_previews(client: Client, targets: Vec<(u64, String)>, tx: mpsc::Sender<Preview>) {
  use futures::stream::{self, StreamExt};

  stream::iter(targets)
    .map(|(id, url)| {
      let client = client.clone();
      let tx = tx.clone();
      async move {
        match fetch_image(&client, &url).await {
          Ok(image) => {
            let _ = tx.send(Preview { id, image }).await;
          }
          Err(e) => tracing::debug!(id, err = %e, "preview fetch failed"),
        }
      }
    })
    .buffer_unordered(constants().preview_concurrency.max(1))
    .collect::<()>()
    .await;
}
