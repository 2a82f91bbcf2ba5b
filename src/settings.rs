//! Tunable knobs for the selection flow and delivery policy.
//!
//! The core takes a `Settings` value as a constructor parameter; loading the
//! optional TOML file is the binary's job.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::types::Translation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Translation mode used until the user toggles it.
    #[serde(default = "default_translation")]
    pub default_translation: Translation,

    /// How many catalog hits one search requests.
    #[serde(default = "default_search_limit")]
    pub search_result_limit: usize,

    /// Anime results shown per page.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,

    /// Episode buttons shown per page.
    #[serde(default = "default_episodes_per_page")]
    pub episodes_per_page: usize,

    /// Above this size the transport gets a link instead of media.
    #[serde(default = "default_media_size_ceiling")]
    pub media_size_ceiling_bytes: u64,
}

fn default_translation() -> Translation {
    Translation::Sub
}

fn default_search_limit() -> usize {
    40
}

fn default_items_per_page() -> usize {
    8
}

fn default_episodes_per_page() -> usize {
    15
}

// Transport upload ceiling (50 MB).
fn default_media_size_ceiling() -> u64 {
    50 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_translation: default_translation(),
            search_result_limit: default_search_limit(),
            items_per_page: default_items_per_page(),
            episodes_per_page: default_episodes_per_page(),
            media_size_ceiling_bytes: default_media_size_ceiling(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Result<PathBuf> {
        let base =
            dirs_next::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(base.join("anibridge").join("config.toml"))
    }

    /// Load from the config file, falling back to defaults when it is absent.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let settings = toml::from_str(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let settings = Settings::default();
        assert_eq!(settings.default_translation, Translation::Sub);
        assert_eq!(settings.search_result_limit, 40);
        assert_eq!(settings.items_per_page, 8);
        assert_eq!(settings.episodes_per_page, 15);
        assert_eq!(settings.media_size_ceiling_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let settings: Settings = toml::from_str("default_translation = \"dub\"").unwrap();
        assert_eq!(settings.default_translation, Translation::Dub);
        assert_eq!(settings.items_per_page, 8);
    }

    #[test]
    fn full_toml_round_trips() {
        let settings = Settings {
            default_translation: Translation::Dub,
            search_result_limit: 10,
            items_per_page: 4,
            episodes_per_page: 6,
            media_size_ceiling_bytes: 1024,
        };
        let text = toml::to_string(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back.search_result_limit, 10);
        assert_eq!(back.media_size_ceiling_bytes, 1024);
    }
}
