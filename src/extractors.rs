//! Per-provider extraction of playable variants.
//!
//! Each supported video host has one `ProviderKind` variant; adding a host
//! is one variant plus one `from_tag` arm. Extractors only resolve URLs,
//! they never deliver anything.

use anyhow::{Context, Result, bail};
use log::debug;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::types::{PlayableVariant, quality_rank};

const ALLANIME_BASE_URL: &str = "https://allanime.day";
const ALLANIME_REFERER: &str = "https://allmanga.to";

/// One slow host must not stall the merge step.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(10);

/// The closed set of hosts this crate knows how to extract from, keyed by
/// the provider tag the decoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// "Default": clock JSON listing per-resolution links, some of them
    /// wixmp repackager URLs that rewrite to direct mp4.
    Wixmp,
    /// "S-mp4": clock JSON with a single direct mp4 link.
    SharePoint,
    /// "Luf-Mp4": clock JSON pointing at an HLS master playlist.
    HiAnime,
    /// "Yt-mp4": the payload already is the direct mp4 URL.
    YtMp4,
}

impl ProviderKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Default" => Some(ProviderKind::Wixmp),
            "S-mp4" => Some(ProviderKind::SharePoint),
            "Luf-Mp4" | "Luf-mp4" => Some(ProviderKind::HiAnime),
            "Yt-mp4" => Some(ProviderKind::YtMp4),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ProviderKind::Wixmp => "Default",
            ProviderKind::SharePoint => "S-mp4",
            ProviderKind::HiAnime => "Luf-Mp4",
            ProviderKind::YtMp4 => "Yt-mp4",
        }
    }

    /// Turn a decoded payload into zero or more playable variants. Network
    /// failures and unexpected shapes are errors here; the pipeline degrades
    /// them to an empty contribution.
    pub async fn extract(self, http: &Client, payload: &str) -> Result<Vec<PlayableVariant>> {
        match self {
            ProviderKind::Wixmp | ProviderKind::SharePoint => {
                let response = fetch_clock(http, payload).await?;
                Ok(clock_links_to_variants(self.tag(), response.links))
            }
            ProviderKind::HiAnime => {
                let response = fetch_clock(http, payload).await?;
                extract_hls(http, self.tag(), response.links).await
            }
            ProviderKind::YtMp4 => extract_direct(http, self.tag(), payload).await,
        }
    }
}

async fn fetch_clock(http: &Client, payload: &str) -> Result<ClockResponse> {
    let path = rewrite_clock_path(payload);
    let url = if path.starts_with("http") {
        path
    } else {
        format!("{ALLANIME_BASE_URL}{path}")
    };
    debug!("fetching source metadata from {url}");
    let response = http
        .get(&url)
        .header("Referer", ALLANIME_REFERER)
        .header("Accept", "application/json")
        .timeout(EXTRACT_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json::<ClockResponse>()
        .await
        .with_context(|| format!("unexpected source metadata shape from {url}"))?;
    Ok(response)
}

/// The metadata endpoint answers JSON only under its `.json` twin path.
fn rewrite_clock_path(payload: &str) -> String {
    if payload.contains("/clock") && !payload.contains(".json") {
        payload.replacen("/clock", "/clock.json", 1)
    } else {
        payload.to_string()
    }
}

fn clock_links_to_variants(provider_id: &str, links: Vec<ClockLink>) -> Vec<PlayableVariant> {
    links
        .into_iter()
        .filter(|link| !link.link.is_empty())
        .map(|link| {
            let quality_label = link.resolution.unwrap_or_else(|| String::from("auto"));
            let url = unwrap_repackager(&link.link);
            let referer = link
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("referer"))
                .map(|(_, v)| v.clone())
                .or_else(|| Some(ALLANIME_REFERER.to_string()));
            PlayableVariant {
                provider_id: provider_id.to_string(),
                quality_rank: quality_rank(&quality_label),
                quality_label,
                is_hls: link.hls,
                referer,
                subtitle_url: pick_subtitle(&link.subtitles),
                estimated_size_bytes: link.size,
                url,
            }
        })
        .collect()
}

/// wixmp repackager URLs wrap the real file path; the direct mp4 is the
/// wrapped path with the repackager host and the `.urlset` template cut out.
fn unwrap_repackager(link: &str) -> String {
    static REPACKAGER_HOST: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"repackager\.wixmp\.com/").unwrap());
    static URLSET_SUFFIX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\.urlset.*").unwrap());

    if !link.contains("repackager.wixmp.com") {
        return link.to_string();
    }
    let stripped = REPACKAGER_HOST.replace(link, "");
    URLSET_SUFFIX.replace(&stripped, "").into_owned()
}

async fn extract_hls(
    http: &Client,
    provider_id: &str,
    links: Vec<ClockLink>,
) -> Result<Vec<PlayableVariant>> {
    let Some(master) = links
        .into_iter()
        .find(|link| link.hls || link.link.contains(".m3u8"))
    else {
        bail!("no HLS master link in source metadata");
    };
    // Subtitle tracks ride on the master entry, not the quality tiers.
    let subtitle_url = pick_subtitle(&master.subtitles);

    let playlist = http
        .get(&master.link)
        .header("Referer", ALLANIME_REFERER)
        .timeout(EXTRACT_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let mut variants =
        parse_master_playlist(provider_id, &master.link, &playlist, subtitle_url.as_deref())?;
    if variants.is_empty() {
        // No per-quality tiers; the master itself is still playable.
        variants.push(PlayableVariant {
            provider_id: provider_id.to_string(),
            url: master.link,
            quality_label: String::from("auto"),
            quality_rank: quality_rank("auto"),
            is_hls: true,
            referer: Some(ALLANIME_REFERER.to_string()),
            subtitle_url,
            estimated_size_bytes: None,
        });
    }
    Ok(variants)
}

/// Enumerate `#EXT-X-STREAM-INF` quality tiers of an HLS master playlist,
/// resolving relative URIs against the playlist URL.
fn parse_master_playlist(
    provider_id: &str,
    master_url: &str,
    playlist: &str,
    subtitle_url: Option<&str>,
) -> Result<Vec<PlayableVariant>> {
    if !playlist.contains("#EXTM3U") {
        bail!("response is not an HLS playlist");
    }
    static RESOLUTION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"RESOLUTION=\d+x(\d+)").unwrap());

    let base = Url::parse(master_url).context("invalid master playlist URL")?;

    let mut variants = Vec::new();
    let mut lines = playlist.lines().peekable();
    while let Some(line) = lines.next() {
        if !line.starts_with("#EXT-X-STREAM-INF") {
            continue;
        }
        let Some(height) = RESOLUTION.captures(line).map(|c| c[1].to_string()) else {
            continue;
        };
        let Some(uri) = lines.peek().filter(|next| !next.starts_with('#')) else {
            continue;
        };
        let url = base
            .join(uri.trim())
            .with_context(|| format!("bad stream URI {uri:?}"))?;
        let quality_label = format!("{height}p");
        variants.push(PlayableVariant {
            provider_id: provider_id.to_string(),
            url: url.to_string(),
            quality_rank: quality_rank(&quality_label),
            quality_label,
            is_hls: true,
            referer: Some(ALLANIME_REFERER.to_string()),
            subtitle_url: subtitle_url.map(String::from),
            estimated_size_bytes: None,
        });
    }
    Ok(variants)
}

async fn extract_direct(
    http: &Client,
    provider_id: &str,
    payload: &str,
) -> Result<Vec<PlayableVariant>> {
    let url = if payload.starts_with("http") {
        payload.to_string()
    } else {
        format!("{ALLANIME_BASE_URL}{payload}")
    };
    // Best-effort size probe so the delivery policy can pick media over link.
    let estimated_size_bytes = match http
        .head(&url)
        .header("Referer", ALLANIME_REFERER)
        .timeout(EXTRACT_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response.content_length(),
        Err(err) => {
            debug!("size probe failed for {url}: {err}");
            None
        }
    };
    Ok(vec![PlayableVariant {
        provider_id: provider_id.to_string(),
        url,
        quality_label: String::from("auto"),
        quality_rank: quality_rank("auto"),
        is_hls: false,
        referer: Some(ALLANIME_REFERER.to_string()),
        subtitle_url: None,
        estimated_size_bytes,
    }])
}

// --- Source metadata structs ---

#[derive(Debug, Deserialize)]
struct ClockResponse {
    links: Vec<ClockLink>,
}

#[derive(Debug, Deserialize)]
struct ClockLink {
    link: String,
    #[serde(rename = "resolutionStr")]
    #[serde(default)]
    resolution: Option<String>,
    #[serde(default)]
    hls: bool,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    subtitles: Vec<ClockSubtitle>,
}

#[derive(Debug, Deserialize)]
struct ClockSubtitle {
    #[serde(default)]
    lang: String,
    src: String,
}

/// English track if present, first track otherwise.
fn pick_subtitle(subtitles: &[ClockSubtitle]) -> Option<String> {
    subtitles
        .iter()
        .find(|s| s.lang.to_ascii_lowercase().starts_with("en"))
        .or_else(|| subtitles.first())
        .map(|s| s.src.clone())
}
