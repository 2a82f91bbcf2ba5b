//! Client for the AllAnime GraphQL catalog.
//!
//! All requests are idempotent reads with bounded retry. Upstream field
//! names live only in the private serde structs here; the rest of the crate
//! sees `SearchResult`, episode label lists and opaque descriptor strings.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

use crate::decoder::DecodeTable;
use crate::error::ResolveError;
use crate::types::{EpisodeCounts, EpisodeRef, SearchResult, Translation, compare_episode_labels};

const ALLANIME_API_URL: &str = "https://api.allanime.day/api";
const ALLANIME_REFERER: &str = "https://allmanga.to";
const ALLANIME_ORIGIN: &str = "https://allanime.day";

/// Browser user agent sent on every catalog and host request.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

/// Transport failures get this many retries before `CatalogUnavailable`.
const MAX_RETRIES: u32 = 2;

/// Base delay between retries, doubled each attempt.
const BASE_RETRY_DELAY_MS: u64 = 500;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Read-side contract the flow layers depend on. Implemented for the live
/// catalog here and for stubs in tests.
pub trait CatalogApi {
    /// Empty on zero matches; `CatalogUnavailable` only after retry is
    /// exhausted. Translation type is a request parameter, not a post-filter.
    fn search(
        &self,
        query: &str,
        translation: Translation,
    ) -> impl Future<Output = Result<Vec<SearchResult>, ResolveError>>;

    /// Episode labels for one show in one translation mode, numerically
    /// sorted.
    fn episodes(
        &self,
        anime_id: &str,
        translation: Translation,
    ) -> impl Future<Output = Result<Vec<String>, ResolveError>>;

    /// Raw encoded source descriptors for one episode, catalog order
    /// preserved. `EpisodeNotFound` when the catalog has no such entry for
    /// that translation type.
    fn episode_sources(
        &self,
        episode: &EpisodeRef,
    ) -> impl Future<Output = Result<Vec<String>, ResolveError>>;
}

pub struct AllAnimeCatalog {
    client: Client,
    table: DecodeTable,
    search_limit: usize,
}

impl AllAnimeCatalog {
    pub fn new(search_limit: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            table: DecodeTable::default(),
            search_limit,
        })
    }

    async fn post_graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ResolveError> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("catalog retry {attempt}/{MAX_RETRIES} after {delay}ms");
                sleep(Duration::from_millis(delay)).await;
            }

            match self.try_post(&body).await {
                Ok(text) => {
                    let envelope: GraphQlEnvelope<T> = serde_json::from_str(&text)
                        .context("failed to parse catalog response")
                        .map_err(ResolveError::CatalogUnavailable)?;
                    return extract_data(envelope).map_err(ResolveError::CatalogUnavailable);
                }
                Err(err) if is_retryable(&err) => {
                    last_error = Some(err);
                }
                Err(err) => {
                    return Err(ResolveError::CatalogUnavailable(err));
                }
            }
        }

        Err(ResolveError::CatalogUnavailable(
            last_error.unwrap_or_else(|| anyhow!("catalog request failed")),
        ))
    }

    async fn try_post(&self, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(ALLANIME_API_URL)
            .header("Referer", ALLANIME_REFERER)
            .header("Origin", ALLANIME_ORIGIN)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("catalog HTTP {status}: {text}");
        }
        Ok(text)
    }
}

impl CatalogApi for AllAnimeCatalog {
    async fn search(
        &self,
        query: &str,
        translation: Translation,
    ) -> Result<Vec<SearchResult>, ResolveError> {
        let variables = serde_json::json!({
            "search": {
                "allowAdult": false,
                "allowUnknown": false,
                "query": query,
            },
            "limit": self.search_limit,
            "page": 1,
            "translationType": translation.as_str(),
            "countryOrigin": "ALL"
        });
        let payload: SearchPayload = self.post_graphql(SEARCH_SHOWS_QUERY, variables).await?;
        Ok(collect_search_results(payload, translation))
    }

    async fn episodes(
        &self,
        anime_id: &str,
        translation: Translation,
    ) -> Result<Vec<String>, ResolveError> {
        let variables = serde_json::json!({ "showId": anime_id });
        let payload: ShowDetailPayload = self.post_graphql(SHOW_DETAIL_QUERY, variables).await?;
        let mut labels = match translation {
            Translation::Sub => payload.show.available_episodes_detail.sub,
            Translation::Dub => payload.show.available_episodes_detail.dub,
        };
        labels.sort_by(|a, b| compare_episode_labels(a, b));
        labels.dedup();
        Ok(labels)
    }

    async fn episode_sources(&self, episode: &EpisodeRef) -> Result<Vec<String>, ResolveError> {
        let variables = serde_json::json!({
            "showId": episode.anime_id,
            "translationType": episode.translation.as_str(),
            "episodeString": episode.episode,
        });
        let payload: EpisodePayload = self.post_graphql(EPISODE_SOURCES_QUERY, variables).await?;
        let Some(sources) = payload.episode else {
            return Err(ResolveError::EpisodeNotFound {
                episode: episode.episode.clone(),
                translation: episode.translation.as_str().to_string(),
            });
        };
        Ok(frame_descriptors(&self.table, sources.source_urls))
    }
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(req_err) = err.downcast_ref::<reqwest::Error>() {
        return req_err.is_timeout() || req_err.is_connect() || req_err.is_request();
    }
    // HTTP failures surface as plain messages; retry only server errors.
    let msg = err.to_string();
    msg.contains("HTTP 5")
}

fn extract_data<T>(envelope: GraphQlEnvelope<T>) -> Result<T> {
    if let Some(errors) = envelope.errors {
        let joined = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        bail!("catalog API error: {joined}");
    }
    envelope
        .data
        .ok_or_else(|| anyhow!("catalog returned empty response"))
}

fn collect_search_results(payload: SearchPayload, translation: Translation) -> Vec<SearchResult> {
    payload
        .shows
        .edges
        .into_iter()
        .map(|edge| SearchResult {
            id: edge.id,
            title: edge.name,
            available_episodes: EpisodeCounts {
                sub: edge.available_episodes.sub,
                dub: edge.available_episodes.dub,
            },
        })
        // The catalog sometimes echoes shows with no episodes in the
        // requested mode; they are dead ends for this flow.
        .filter(|result| result.supports(translation))
        .collect()
}

/// Fold each source entry into one opaque descriptor string: the provider
/// tag is pushed through the same substitution table as the payload, so the
/// decoder sees a single uniformly encoded body.
fn frame_descriptors(table: &DecodeTable, sources: Vec<RawSource>) -> Vec<String> {
    let mut raw = Vec::with_capacity(sources.len());
    for source in sources {
        if source.source_url.is_empty() {
            continue;
        }
        let Some(tag) = table.encode(&format!("{}:", source.source_name)) else {
            warn!("skipping source with unencodable name {:?}", source.source_name);
            continue;
        };
        let body = source.source_url.trim_start_matches("--");
        raw.push(format!("--{tag}{body}"));
    }
    raw
}

// --- GraphQL structs ---

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    shows: SearchShows,
}

#[derive(Debug, Deserialize)]
struct SearchShows {
    edges: Vec<SearchEdge>,
}

#[derive(Debug, Deserialize)]
struct SearchEdge {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(rename = "availableEpisodes")]
    #[serde(default)]
    available_episodes: AvailabilitySnapshot,
}

#[derive(Debug, Deserialize, Default)]
struct AvailabilitySnapshot {
    #[serde(default)]
    sub: usize,
    #[serde(default)]
    dub: usize,
}

#[derive(Debug, Deserialize)]
struct ShowDetailPayload {
    show: ShowDetail,
}

#[derive(Debug, Deserialize)]
struct ShowDetail {
    #[serde(rename = "availableEpisodesDetail")]
    #[serde(default)]
    available_episodes_detail: EpisodeDetail,
}

#[derive(Debug, Deserialize, Default)]
struct EpisodeDetail {
    #[serde(default)]
    sub: Vec<String>,
    #[serde(default)]
    dub: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EpisodePayload {
    episode: Option<EpisodeSources>,
}

#[derive(Debug, Deserialize)]
struct EpisodeSources {
    #[serde(rename = "sourceUrls")]
    #[serde(default)]
    source_urls: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "sourceUrl")]
    source_url: String,
    #[serde(rename = "sourceName")]
    source_name: String,
}

// --- Queries ---

const SEARCH_SHOWS_QUERY: &str = r#"query($search: SearchInput, $limit: Int, $page: Int, $translationType: VaildTranslationTypeEnumType, $countryOrigin: VaildCountryOriginEnumType) {
  shows(search: $search, limit: $limit, page: $page, translationType: $translationType, countryOrigin: $countryOrigin) {
    edges {
      _id
      name
      availableEpisodes
    }
  }
}"#;

const SHOW_DETAIL_QUERY: &str = r#"query($showId: String!) {
  show(_id: $showId) {
    _id
    name
    availableEpisodesDetail
  }
}"#;

const EPISODE_SOURCES_QUERY: &str = r#"query($showId: String!, $translationType: VaildTranslationTypeEnumType!, $episodeString: String!) {
  episode(showId: $showId, translationType: $translationType, episodeString: $episodeString) {
    episodeString
        sourceUrls
  }
}"#;
