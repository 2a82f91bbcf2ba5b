//! Resolution core: turn a free-text anime query into a playable stream,
//! brokered through the AllAnime catalog and a set of video-host extractors,
//! with a per-conversation selection flow in front.

pub mod catalog;
pub mod decoder;
pub mod delivery;
pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod session;
pub mod settings;
pub mod types;

pub use catalog::{AllAnimeCatalog, CatalogApi};
pub use decoder::DecodeTable;
pub use delivery::DeliveryPolicy;
pub use error::ResolveError;
pub use extractors::ProviderKind;
pub use pipeline::{HttpVariantSource, Resolver, VariantSource};
pub use session::{Effect, Event, PageDirection, PagedList, Session, SessionManager, Stage};
pub use settings::Settings;
pub use types::{
    DeliveryIntent, EpisodeCounts, EpisodeRef, PlayableVariant, SearchResult, SourceDescriptor,
    Translation,
};
