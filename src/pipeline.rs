//! Orchestrates catalog, decoder and extractors into one resolution step:
//! (anime, episode, translation) -> ranked playable variants.
//!
//! Partial failure is the normal case here. Any descriptor may fail to
//! decode or extract without sinking the episode; only an entirely empty
//! merge is an error.

use anyhow::Result;
use log::{debug, warn};
use reqwest::Client;
use tokio::task::JoinSet;

use crate::catalog::CatalogApi;
use crate::decoder::DecodeTable;
use crate::error::ResolveError;
use crate::extractors::ProviderKind;
use crate::types::{EpisodeRef, PlayableVariant, SourceDescriptor};

/// Extraction seam: the pipeline only needs "payload in, variants out" per
/// provider. The live backend does HTTP; tests substitute canned data.
pub trait VariantSource: Clone + Send + Sync + 'static {
    fn extract(
        &self,
        kind: ProviderKind,
        payload: String,
    ) -> impl Future<Output = Result<Vec<PlayableVariant>>> + Send;
}

#[derive(Clone)]
pub struct HttpVariantSource {
    http: Client,
}

impl HttpVariantSource {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl VariantSource for HttpVariantSource {
    async fn extract(&self, kind: ProviderKind, payload: String) -> Result<Vec<PlayableVariant>> {
        kind.extract(&self.http, &payload).await
    }
}

pub struct Resolver<C, S> {
    catalog: C,
    source: S,
    table: DecodeTable,
}

impl<C: CatalogApi, S: VariantSource> Resolver<C, S> {
    pub fn new(catalog: C, source: S) -> Self {
        Self::with_table(catalog, source, DecodeTable::default())
    }

    pub fn with_table(catalog: C, source: S, table: DecodeTable) -> Self {
        Self {
            catalog,
            source,
            table,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Resolve one episode to a deduplicated, quality-ranked variant list.
    pub async fn resolve(
        &self,
        episode: &EpisodeRef,
    ) -> Result<Vec<PlayableVariant>, ResolveError> {
        let raw = self.catalog.episode_sources(episode).await?;
        let descriptors = self.decode_descriptors(&raw);
        let batches = fan_out(&self.source, descriptors).await;
        merge_variants(batches)
    }

    /// Decode every raw descriptor independently, keeping catalog order as a
    /// relevance hint. Malformed entries and unknown providers are skipped,
    /// never fatal.
    fn decode_descriptors(&self, raw: &[String]) -> Vec<(ProviderKind, SourceDescriptor)> {
        let mut decoded = Vec::with_capacity(raw.len());
        for entry in raw {
            let descriptor = match self.table.decode(entry) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    debug!("skipping descriptor: {err}");
                    continue;
                }
            };
            let Some(kind) = ProviderKind::from_tag(&descriptor.provider_id) else {
                warn!("unsupported provider {:?}, skipping", descriptor.provider_id);
                continue;
            };
            decoded.push((kind, descriptor));
        }
        decoded
    }
}

/// Run extractions concurrently, one task per descriptor, no shared state.
/// Each failure degrades its own descriptor to zero variants; results come
/// back in the original (relevance) order.
async fn fan_out<S: VariantSource>(
    source: &S,
    descriptors: Vec<(ProviderKind, SourceDescriptor)>,
) -> Vec<Vec<PlayableVariant>> {
    let mut set = JoinSet::new();
    let total = descriptors.len();
    for (idx, (kind, descriptor)) in descriptors.into_iter().enumerate() {
        let source = source.clone();
        set.spawn(async move {
            let outcome = source.extract(kind, descriptor.payload).await;
            (idx, kind, outcome)
        });
    }

    let mut batches = vec![Vec::new(); total];
    while let Some(joined) = set.join_next().await {
        let Ok((idx, kind, outcome)) = joined else {
            continue;
        };
        match outcome {
            Ok(variants) => {
                debug!("{} yielded {} variant(s)", kind.tag(), variants.len());
                batches[idx] = variants;
            }
            Err(err) => {
                warn!("extraction via {} failed: {err}", kind.tag());
            }
        }
    }
    batches
}

/// Merge per-descriptor batches: dedupe by `(provider_id, quality_label)`
/// keeping first-seen (highest catalog relevance), then rank by quality.
pub fn merge_variants(
    batches: Vec<Vec<PlayableVariant>>,
) -> Result<Vec<PlayableVariant>, ResolveError> {
    let mut merged: Vec<PlayableVariant> = Vec::new();
    for variant in batches.into_iter().flatten() {
        if merged.iter().any(|seen| seen.dedupe_key() == variant.dedupe_key()) {
            continue;
        }
        merged.push(variant);
    }
    if merged.is_empty() {
        return Err(ResolveError::NoPlayableSource);
    }
    merged.sort_by(|a, b| b.quality_rank.cmp(&a.quality_rank));
    Ok(merged)
}
