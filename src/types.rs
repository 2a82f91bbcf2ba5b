use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Translation {
    Sub,
    Dub,
}

impl Translation {
    pub fn as_str(self) -> &'static str {
        match self {
            Translation::Sub => "sub",
            Translation::Dub => "dub",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Translation::Sub => "Sub",
            Translation::Dub => "Dub",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Translation::Sub => Translation::Dub,
            Translation::Dub => Translation::Sub,
        }
    }
}

/// One anime from a catalog search, identified by the catalog-assigned id.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub available_episodes: EpisodeCounts,
}

impl SearchResult {
    pub fn supports(&self, translation: Translation) -> bool {
        self.episode_count(translation) > 0
    }

    pub fn episode_count(&self, translation: Translation) -> usize {
        match translation {
            Translation::Sub => self.available_episodes.sub,
            Translation::Dub => self.available_episodes.dub,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EpisodeCounts {
    pub sub: usize,
    pub dub: usize,
}

/// Identifies one watchable unit. Episode labels are sparse ordered keys
/// ("1", "5.5", specials), compared numerically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRef {
    pub anime_id: String,
    pub episode: String,
    pub translation: Translation,
}

/// Decoded form of one opaque catalog source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub provider_id: String,
    pub payload: String,
}

/// A concrete playable (URL, quality) pair produced after decoding and
/// extraction. Deduplicated by `(provider_id, quality_label)`.
#[derive(Debug, Clone)]
pub struct PlayableVariant {
    pub provider_id: String,
    pub url: String,
    pub quality_label: String,
    pub quality_rank: i32,
    pub is_hls: bool,
    pub referer: Option<String>,
    pub subtitle_url: Option<String>,
    pub estimated_size_bytes: Option<u64>,
}

impl PlayableVariant {
    pub fn label(&self) -> String {
        let kind = if self.is_hls { "HLS" } else { "MP4" };
        format!("{} {} ({})", self.provider_id, self.quality_label, kind)
    }

    pub fn dedupe_key(&self) -> (String, String) {
        (self.provider_id.clone(), self.quality_label.clone())
    }
}

/// What the transport should do with a chosen variant. The core never sends
/// anything itself.
#[derive(Debug, Clone)]
pub enum DeliveryIntent {
    Media(PlayableVariant),
    Link(PlayableVariant),
}

impl DeliveryIntent {
    pub fn variant(&self) -> &PlayableVariant {
        match self {
            DeliveryIntent::Media(v) | DeliveryIntent::Link(v) => v,
        }
    }
}

/// "auto" sorts above every numbered tier; unparsable labels sink to the
/// bottom.
pub fn quality_rank(label: &str) -> i32 {
    if label.eq_ignore_ascii_case("auto") {
        return 10_000;
    }
    label.trim_end_matches('p').parse::<i32>().unwrap_or(0)
}

pub fn compare_episode_labels(left: &str, right: &str) -> Ordering {
    let l = parse_episode_key(left);
    let r = parse_episode_key(right);
    l.partial_cmp(&r).unwrap_or(Ordering::Equal)
}

fn parse_episode_key(label: &str) -> f32 {
    label.parse::<f32>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_rank_orders_auto_first() {
        assert!(quality_rank("auto") > quality_rank("1080p"));
        assert!(quality_rank("1080p") > quality_rank("720p"));
        assert_eq!(quality_rank("garbage"), 0);
    }

    #[test]
    fn episode_labels_compare_numerically() {
        assert_eq!(compare_episode_labels("2", "10"), Ordering::Less);
        assert_eq!(compare_episode_labels("5.5", "5"), Ordering::Greater);
    }

    #[test]
    fn supports_reflects_episode_counts() {
        let result = SearchResult {
            id: "x".into(),
            title: "X".into(),
            available_episodes: EpisodeCounts { sub: 12, dub: 0 },
        };
        assert!(result.supports(Translation::Sub));
        assert!(!result.supports(Translation::Dub));
    }
}
