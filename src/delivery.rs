//! Media-or-link decision for one chosen variant.

use crate::types::{DeliveryIntent, PlayableVariant};

/// Decides whether the transport should push the file itself or hand the
/// user a URL. Transfer failures always downgrade to a link; the same
/// variant is never retried as media.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    size_ceiling_bytes: u64,
}

impl DeliveryPolicy {
    pub fn new(size_ceiling_bytes: u64) -> Self {
        Self { size_ceiling_bytes }
    }

    /// Media only when the size is actually known to fit. HLS playlists are
    /// not single files, so they always go out as links.
    pub fn plan(&self, variant: PlayableVariant) -> DeliveryIntent {
        match variant.estimated_size_bytes {
            Some(size) if !variant.is_hls && size < self.size_ceiling_bytes => {
                DeliveryIntent::Media(variant)
            }
            _ => DeliveryIntent::Link(variant),
        }
    }

    pub fn after_failure(&self, variant: PlayableVariant) -> DeliveryIntent {
        DeliveryIntent::Link(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::quality_rank;

    fn variant(size: Option<u64>, is_hls: bool) -> PlayableVariant {
        PlayableVariant {
            provider_id: String::from("Default"),
            url: String::from("https://cdn.example/ep1.mp4"),
            quality_label: String::from("1080p"),
            quality_rank: quality_rank("1080p"),
            is_hls,
            referer: None,
            subtitle_url: None,
            estimated_size_bytes: size,
        }
    }

    #[test]
    fn small_known_size_goes_as_media() {
        let policy = DeliveryPolicy::new(100);
        assert!(matches!(
            policy.plan(variant(Some(99), false)),
            DeliveryIntent::Media(_)
        ));
    }

    #[test]
    fn oversized_or_unknown_goes_as_link() {
        let policy = DeliveryPolicy::new(100);
        assert!(matches!(
            policy.plan(variant(Some(100), false)),
            DeliveryIntent::Link(_)
        ));
        assert!(matches!(
            policy.plan(variant(None, false)),
            DeliveryIntent::Link(_)
        ));
    }

    #[test]
    fn hls_never_goes_as_media() {
        let policy = DeliveryPolicy::new(u64::MAX);
        assert!(matches!(
            policy.plan(variant(Some(1), true)),
            DeliveryIntent::Link(_)
        ));
    }

    #[test]
    fn failure_always_falls_back_to_link() {
        let policy = DeliveryPolicy::new(u64::MAX);
        assert!(matches!(
            policy.after_failure(variant(Some(1), false)),
            DeliveryIntent::Link(_)
        ));
    }
}
