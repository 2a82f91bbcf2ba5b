use thiserror::Error;

/// Failure taxonomy of the resolution pipeline.
///
/// Only `CatalogUnavailable`, `EpisodeNotFound` and `NoPlayableSource` are
/// ever surfaced to the user; the rest are contained at the descriptor level
/// or trigger a silent fallback.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("catalog unreachable: {0}")]
    CatalogUnavailable(#[source] anyhow::Error),

    #[error("episode {episode} not found for {translation}")]
    EpisodeNotFound { episode: String, translation: String },

    #[error("malformed source descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("no extractor registered for provider {0}")]
    UnsupportedProvider(String),

    #[error("no playable sources found")]
    NoPlayableSource,

    #[error("media delivery failed: {0}")]
    DeliveryFailed(String),
}

impl ResolveError {
    /// Fixed user-facing message for surfaced failures. Internal variants
    /// have no message of their own; they degrade to the generic one.
    pub fn user_message(&self) -> &'static str {
        match self {
            ResolveError::CatalogUnavailable(_) => {
                "The catalog is not responding. Try again later."
            }
            ResolveError::EpisodeNotFound { .. } => {
                "That episode is not available in this mode."
            }
            ResolveError::NoPlayableSource => "No playable sources found.",
            _ => "Something went wrong. Try again later.",
        }
    }

    /// Whether the session layer should show this to the user (and reset);
    /// everything else stays internal to the pipeline.
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self,
            ResolveError::CatalogUnavailable(_)
                | ResolveError::EpisodeNotFound { .. }
                | ResolveError::NoPlayableSource
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaced_variants_have_fixed_messages() {
        assert_eq!(
            ResolveError::NoPlayableSource.user_message(),
            "No playable sources found."
        );
        assert!(ResolveError::NoPlayableSource.is_surfaced());
        assert!(
            ResolveError::EpisodeNotFound {
                episode: "3".into(),
                translation: "dub".into(),
            }
            .is_surfaced()
        );
    }

    #[test]
    fn item_level_failures_stay_internal() {
        assert!(!ResolveError::MalformedDescriptor("zz".into()).is_surfaced());
        assert!(!ResolveError::UnsupportedProvider("Ok".into()).is_surfaced());
        assert!(!ResolveError::DeliveryFailed("too big".into()).is_surfaced());
    }
}
