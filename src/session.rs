//! Per-conversation state machine for the search -> anime -> episode ->
//! quality -> delivery flow.
//!
//! Every transition is a pure function of (state, event) returning an
//! `Effect` describing the external call, if any, the driver should make.
//! Network results come back in as events, so stale replies arriving after
//! a cancel or restart are dropped by the stage checks.

use log::debug;
use std::collections::HashMap;

use crate::delivery::DeliveryPolicy;
use crate::error::ResolveError;
use crate::settings::Settings;
use crate::types::{DeliveryIntent, EpisodeRef, PlayableVariant, SearchResult, Translation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Searching,
    ChoosingAnime,
    ChoosingEpisode,
    ChoosingQuality,
    Delivering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagedList {
    Anime,
    Episodes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Next,
    Prev,
}

/// User actions and arriving network results.
#[derive(Debug)]
pub enum Event {
    /// "/search" with or without an inline query.
    Search(Option<String>),
    /// Free text while the session is waiting for a query.
    QueryText(String),
    ResultsReady(Vec<SearchResult>),
    SelectAnime(usize),
    EpisodesReady(Vec<String>),
    Page(PagedList, PageDirection),
    ToggleTranslation,
    Back,
    SelectEpisode(usize),
    VariantsReady(Vec<PlayableVariant>),
    SelectQuality(usize),
    Delivered { ok: bool },
    Failed(ResolveError),
    Cancel,
}

/// What the driver should do next. The state machine itself never touches
/// the network or the transport.
#[derive(Debug)]
pub enum Effect {
    None,
    PromptQuery,
    RunSearch(String),
    FetchEpisodes(EpisodeRef),
    Resolve(EpisodeRef),
    Deliver(DeliveryIntent),
    Notify(String),
}

#[derive(Debug)]
pub struct Session {
    stage: Stage,
    translation: Translation,
    query: Option<String>,
    results: Vec<SearchResult>,
    anime_page: usize,
    selected: Option<SearchResult>,
    episodes: Vec<String>,
    episode_page: usize,
    selected_episode: Option<String>,
    variants: Vec<PlayableVariant>,
    pending: Option<PlayableVariant>,
    media_attempted: bool,
    items_per_page: usize,
    episodes_per_page: usize,
    policy: DeliveryPolicy,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        Self {
            stage: Stage::Idle,
            translation: settings.default_translation,
            query: None,
            results: Vec::new(),
            anime_page: 0,
            selected: None,
            episodes: Vec::new(),
            episode_page: 0,
            selected_episode: None,
            variants: Vec::new(),
            pending: None,
            media_attempted: false,
            items_per_page: settings.items_per_page,
            episodes_per_page: settings.episodes_per_page,
            policy: DeliveryPolicy::new(settings.media_size_ceiling_bytes),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn translation(&self) -> Translation {
        self.translation
    }

    pub fn selected(&self) -> Option<&SearchResult> {
        self.selected.as_ref()
    }

    pub fn selected_episode(&self) -> Option<&str> {
        self.selected_episode.as_deref()
    }

    pub fn variants(&self) -> &[PlayableVariant] {
        &self.variants
    }

    pub fn episodes(&self) -> &[String] {
        &self.episodes
    }

    /// The anime results visible on the current page, with the absolute
    /// index of the first row.
    pub fn anime_page_view(&self) -> (usize, &[SearchResult]) {
        let (start, end) = page_bounds(self.anime_page, self.items_per_page, self.results.len());
        (start, &self.results[start..end])
    }

    pub fn episode_page_view(&self) -> (usize, &[String]) {
        let (start, end) =
            page_bounds(self.episode_page, self.episodes_per_page, self.episodes.len());
        (start, &self.episodes[start..end])
    }

    pub fn anime_page_count(&self) -> usize {
        page_count(self.results.len(), self.items_per_page)
    }

    pub fn episode_page_count(&self) -> usize {
        page_count(self.episodes.len(), self.episodes_per_page)
    }

    pub fn anime_page(&self) -> usize {
        self.anime_page
    }

    pub fn episode_page(&self) -> usize {
        self.episode_page
    }

    /// Advance the machine by one event.
    pub fn handle(&mut self, event: Event) -> Effect {
        match event {
            Event::Search(query) => self.start_search(query),
            Event::QueryText(text) => self.receive_query_text(text),
            Event::ResultsReady(results) => self.receive_results(results),
            Event::SelectAnime(index) => self.select_anime(index),
            Event::EpisodesReady(episodes) => self.receive_episodes(episodes),
            Event::Page(list, direction) => self.turn_page(list, direction),
            Event::ToggleTranslation => self.toggle_translation(),
            Event::Back => self.go_back(),
            Event::SelectEpisode(index) => self.select_episode(index),
            Event::VariantsReady(variants) => self.receive_variants(variants),
            Event::SelectQuality(index) => self.select_quality(index),
            Event::Delivered { ok } => self.finish_delivery(ok),
            Event::Failed(err) => self.fail(err),
            Event::Cancel => {
                self.reset();
                Effect::Notify(String::from("Cancelled."))
            }
        }
    }

    /// A new search overwrites everything except the translation preference.
    fn start_search(&mut self, query: Option<String>) -> Effect {
        if self.stage == Stage::Delivering {
            // One in-flight delivery at a time; the restart has to wait.
            return Effect::None;
        }
        let translation = self.translation;
        self.reset();
        self.translation = translation;
        match query {
            Some(query) if !query.trim().is_empty() => {
                self.stage = Stage::Searching;
                self.query = Some(query.trim().to_string());
                Effect::RunSearch(self.query.clone().unwrap_or_default())
            }
            _ => {
                self.stage = Stage::Searching;
                Effect::PromptQuery
            }
        }
    }

    fn receive_query_text(&mut self, text: String) -> Effect {
        if self.stage != Stage::Searching || self.query.is_some() {
            return Effect::None;
        }
        let text = text.trim().to_string();
        if text.is_empty() {
            return Effect::PromptQuery;
        }
        self.query = Some(text.clone());
        Effect::RunSearch(text)
    }

    fn receive_results(&mut self, results: Vec<SearchResult>) -> Effect {
        if self.stage != Stage::Searching {
            debug!("dropping stale search results");
            return Effect::None;
        }
        if results.is_empty() {
            let query = self.query.clone().unwrap_or_default();
            self.reset();
            return Effect::Notify(format!("No results for \"{query}\"."));
        }
        self.results = results;
        self.anime_page = 0;
        self.stage = Stage::ChoosingAnime;
        Effect::None
    }

    fn select_anime(&mut self, index: usize) -> Effect {
        if self.stage != Stage::ChoosingAnime {
            return Effect::None;
        }
        let Some(result) = self.results.get(index) else {
            return Effect::None;
        };
        self.selected = Some(result.clone());
        self.episodes.clear();
        self.episode_page = 0;
        self.stage = Stage::ChoosingEpisode;
        Effect::FetchEpisodes(EpisodeRef {
            anime_id: result.id.clone(),
            episode: String::new(),
            translation: self.translation,
        })
    }

    fn receive_episodes(&mut self, episodes: Vec<String>) -> Effect {
        if self.stage != Stage::ChoosingEpisode {
            debug!("dropping stale episode list");
            return Effect::None;
        }
        if episodes.is_empty() {
            let message = ResolveError::EpisodeNotFound {
                episode: String::new(),
                translation: self.translation.as_str().to_string(),
            }
            .user_message()
            .to_string();
            self.reset();
            return Effect::Notify(message);
        }
        self.episodes = episodes;
        self.episode_page = 0;
        Effect::None
    }

    fn turn_page(&mut self, list: PagedList, direction: PageDirection) -> Effect {
        match (list, self.stage) {
            (PagedList::Anime, Stage::ChoosingAnime) => {
                self.anime_page = step_page(
                    self.anime_page,
                    direction,
                    self.results.len(),
                    self.items_per_page,
                );
            }
            (PagedList::Episodes, Stage::ChoosingEpisode) => {
                self.episode_page = step_page(
                    self.episode_page,
                    direction,
                    self.episodes.len(),
                    self.episodes_per_page,
                );
            }
            _ => {}
        }
        Effect::None
    }

    fn toggle_translation(&mut self) -> Effect {
        let target = self.translation.toggled();
        match self.stage {
            // On the result list the toggle re-runs the search in the new
            // mode, since sub and dub are indexed separately upstream.
            Stage::ChoosingAnime => {
                let Some(query) = self.query.clone() else {
                    return Effect::None;
                };
                self.translation = target;
                self.results.clear();
                self.anime_page = 0;
                self.stage = Stage::Searching;
                Effect::RunSearch(query)
            }
            Stage::ChoosingEpisode => {
                let Some(selected) = &self.selected else {
                    return Effect::None;
                };
                if !selected.supports(target) {
                    // Rejected transition: stage and mode stay put.
                    return Effect::Notify(format!(
                        "{} is not available for {}.",
                        target.label(),
                        selected.title
                    ));
                }
                self.translation = target;
                self.episodes.clear();
                self.episode_page = 0;
                Effect::FetchEpisodes(EpisodeRef {
                    anime_id: selected.id.clone(),
                    episode: String::new(),
                    translation: target,
                })
            }
            _ => Effect::None,
        }
    }

    fn go_back(&mut self) -> Effect {
        match self.stage {
            Stage::ChoosingEpisode => {
                self.selected = None;
                self.episodes.clear();
                self.selected_episode = None;
                self.stage = Stage::ChoosingAnime;
            }
            Stage::ChoosingQuality => {
                self.variants.clear();
                self.selected_episode = None;
                self.stage = Stage::ChoosingEpisode;
            }
            _ => {}
        }
        Effect::None
    }

    fn select_episode(&mut self, index: usize) -> Effect {
        if self.stage != Stage::ChoosingEpisode {
            return Effect::None;
        }
        let Some(selected) = &self.selected else {
            return Effect::None;
        };
        let Some(episode) = self.episodes.get(index) else {
            return Effect::None;
        };
        self.selected_episode = Some(episode.clone());
        self.variants.clear();
        self.stage = Stage::ChoosingQuality;
        Effect::Resolve(EpisodeRef {
            anime_id: selected.id.clone(),
            episode: episode.clone(),
            translation: self.translation,
        })
    }

    fn receive_variants(&mut self, mut variants: Vec<PlayableVariant>) -> Effect {
        if self.stage != Stage::ChoosingQuality {
            debug!("dropping stale variant list");
            return Effect::None;
        }
        if variants.is_empty() {
            return self.fail(ResolveError::NoPlayableSource);
        }
        // A single variant skips the quality step entirely.
        if variants.len() == 1 {
            return self.deliver(variants.remove(0));
        }
        self.variants = variants;
        Effect::None
    }

    fn select_quality(&mut self, index: usize) -> Effect {
        if self.stage != Stage::ChoosingQuality {
            return Effect::None;
        }
        let Some(variant) = self.variants.get(index).cloned() else {
            return Effect::None;
        };
        self.deliver(variant)
    }

    fn deliver(&mut self, variant: PlayableVariant) -> Effect {
        let intent = self.policy.plan(variant.clone());
        self.media_attempted = matches!(intent, DeliveryIntent::Media(_));
        self.pending = Some(variant);
        self.stage = Stage::Delivering;
        Effect::Deliver(intent)
    }

    fn finish_delivery(&mut self, ok: bool) -> Effect {
        if self.stage != Stage::Delivering {
            return Effect::None;
        }
        if ok {
            self.reset();
            return Effect::None;
        }
        // A failed media transfer falls back to a link exactly once; a
        // failed link delivery is a dead end.
        if self.media_attempted {
            if let Some(variant) = self.pending.take() {
                self.media_attempted = false;
                return Effect::Deliver(self.policy.after_failure(variant));
            }
        }
        self.reset();
        Effect::Notify(String::from("Something went wrong. Try again later."))
    }

    fn fail(&mut self, err: ResolveError) -> Effect {
        if self.stage == Stage::Idle {
            debug!("dropping stale failure: {err}");
            return Effect::None;
        }
        let message = err.user_message().to_string();
        // A failed pipeline call must not leave the session stuck mid-flow.
        self.reset();
        Effect::Notify(message)
    }

    fn reset(&mut self) {
        let items_per_page = self.items_per_page;
        let episodes_per_page = self.episodes_per_page;
        let policy = self.policy;
        *self = Session {
            stage: Stage::Idle,
            translation: self.translation,
            query: None,
            results: Vec::new(),
            anime_page: 0,
            selected: None,
            episodes: Vec::new(),
            episode_page: 0,
            selected_episode: None,
            variants: Vec::new(),
            pending: None,
            media_attempted: false,
            items_per_page,
            episodes_per_page,
            policy,
        };
    }
}

/// Conversation-keyed session map with an explicit lifecycle:
/// create-on-first-use, overwrite-on-new-search, clear-on-cancel/success.
pub struct SessionManager {
    settings: Settings,
    sessions: HashMap<i64, Session>,
}

impl SessionManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            sessions: HashMap::new(),
        }
    }

    pub fn session(&mut self, conversation_id: i64) -> &mut Session {
        self.sessions
            .entry(conversation_id)
            .or_insert_with(|| Session::new(&self.settings))
    }

    pub fn handle(&mut self, conversation_id: i64, event: Event) -> Effect {
        self.session(conversation_id).handle(event)
    }

    pub fn clear(&mut self, conversation_id: i64) {
        self.sessions.remove(&conversation_id);
    }
}

fn page_count(total: usize, page_size: usize) -> usize {
    if total == 0 || page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size)
}

fn page_bounds(page: usize, page_size: usize, total: usize) -> (usize, usize) {
    let start = (page * page_size).min(total);
    let end = (start + page_size).min(total);
    (start, end)
}

/// Out-of-range navigation clamps, it never errors.
fn step_page(current: usize, direction: PageDirection, total: usize, page_size: usize) -> usize {
    let last = page_count(total, page_size) - 1;
    match direction {
        PageDirection::Next => (current + 1).min(last),
        PageDirection::Prev => current.saturating_sub(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EpisodeCounts, quality_rank};

    fn settings() -> Settings {
        Settings {
            items_per_page: 8,
            episodes_per_page: 8,
            ..Settings::default()
        }
    }

    fn result(id: &str, sub: usize, dub: usize) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            title: format!("Show {id}"),
            available_episodes: EpisodeCounts { sub, dub },
        }
    }

    fn variant(quality: &str, size: Option<u64>) -> PlayableVariant {
        PlayableVariant {
            provider_id: String::from("Default"),
            url: format!("https://cdn.example/{quality}.mp4"),
            quality_label: quality.to_string(),
            quality_rank: quality_rank(quality),
            is_hls: false,
            referer: None,
            subtitle_url: None,
            estimated_size_bytes: size,
        }
    }

    fn session_at_episode_list(session: &mut Session) {
        session.handle(Event::Search(Some("bleach".into())));
        session.handle(Event::ResultsReady(vec![result("a", 12, 0), result("b", 24, 24)]));
        session.handle(Event::SelectAnime(0));
        session.handle(Event::EpisodesReady(vec!["1".into(), "2".into(), "3".into()]));
    }

    #[test]
    fn search_with_query_goes_straight_to_fetch() {
        let mut session = Session::new(&settings());
        let effect = session.handle(Event::Search(Some("bleach".into())));
        assert!(matches!(effect, Effect::RunSearch(q) if q == "bleach"));
        assert_eq!(session.stage(), Stage::Searching);
    }

    #[test]
    fn search_without_query_prompts_then_accepts_text() {
        let mut session = Session::new(&settings());
        assert!(matches!(session.handle(Event::Search(None)), Effect::PromptQuery));
        let effect = session.handle(Event::QueryText("naruto".into()));
        assert!(matches!(effect, Effect::RunSearch(q) if q == "naruto"));
    }

    #[test]
    fn empty_results_notify_and_reset() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("zzz".into())));
        let effect = session.handle(Event::ResultsReady(Vec::new()));
        assert!(matches!(effect, Effect::Notify(_)));
        assert_eq!(session.stage(), Stage::Idle);
    }

    #[test]
    fn selecting_anime_fetches_episodes() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("bleach".into())));
        session.handle(Event::ResultsReady(vec![result("a", 12, 0)]));
        let effect = session.handle(Event::SelectAnime(0));
        assert!(matches!(effect, Effect::FetchEpisodes(ref r) if r.anime_id == "a"));
        assert_eq!(session.stage(), Stage::ChoosingEpisode);
        assert!(session.selected().is_some());
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("bleach".into())));
        session.handle(Event::ResultsReady(vec![result("a", 12, 0)]));
        let effect = session.handle(Event::SelectAnime(5));
        assert!(matches!(effect, Effect::None));
        assert_eq!(session.stage(), Stage::ChoosingAnime);
    }

    #[test]
    fn pagination_clamps_at_both_ends() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("one".into())));
        // 17 results over page size 8 -> pages 0..=2.
        let results: Vec<SearchResult> =
            (0..17).map(|i| result(&format!("s{i}"), 1, 0)).collect();
        session.handle(Event::ResultsReady(results));

        session.handle(Event::Page(PagedList::Anime, PageDirection::Prev));
        assert_eq!(session.anime_page(), 0);

        for _ in 0..5 {
            session.handle(Event::Page(PagedList::Anime, PageDirection::Next));
        }
        assert_eq!(session.anime_page(), 2);

        session.handle(Event::Page(PagedList::Anime, PageDirection::Next));
        assert_eq!(session.anime_page(), 2);
    }

    #[test]
    fn toggle_rejected_when_dub_unavailable() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        assert_eq!(session.translation(), Translation::Sub);

        let effect = session.handle(Event::ToggleTranslation);
        assert!(matches!(effect, Effect::Notify(_)));
        assert_eq!(session.translation(), Translation::Sub);
        assert_eq!(session.stage(), Stage::ChoosingEpisode);
    }

    #[test]
    fn toggle_refetches_when_supported() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("bleach".into())));
        session.handle(Event::ResultsReady(vec![result("b", 24, 24)]));
        session.handle(Event::SelectAnime(0));
        session.handle(Event::EpisodesReady(vec!["1".into()]));

        let effect = session.handle(Event::ToggleTranslation);
        assert!(matches!(
            effect,
            Effect::FetchEpisodes(ref r) if r.translation == Translation::Dub
        ));
        assert_eq!(session.translation(), Translation::Dub);
    }

    #[test]
    fn selecting_episode_triggers_resolution() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        let effect = session.handle(Event::SelectEpisode(1));
        assert!(matches!(effect, Effect::Resolve(ref r) if r.episode == "2"));
        assert_eq!(session.stage(), Stage::ChoosingQuality);
    }

    #[test]
    fn single_variant_skips_quality_step() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(0));
        let effect = session.handle(Event::VariantsReady(vec![variant("1080p", None)]));
        assert!(matches!(effect, Effect::Deliver(DeliveryIntent::Link(_))));
        assert_eq!(session.stage(), Stage::Delivering);
    }

    #[test]
    fn small_media_is_delivered_directly() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(0));
        session.handle(Event::VariantsReady(vec![
            variant("1080p", Some(10)),
            variant("720p", None),
        ]));
        let effect = session.handle(Event::SelectQuality(0));
        assert!(matches!(effect, Effect::Deliver(DeliveryIntent::Media(_))));
    }

    #[test]
    fn failed_media_falls_back_to_link_once() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(0));
        session.handle(Event::VariantsReady(vec![
            variant("1080p", Some(10)),
            variant("720p", None),
        ]));
        session.handle(Event::SelectQuality(0));

        let effect = session.handle(Event::Delivered { ok: false });
        assert!(matches!(effect, Effect::Deliver(DeliveryIntent::Link(_))));

        // The link attempt is final either way.
        let effect = session.handle(Event::Delivered { ok: false });
        assert!(matches!(effect, Effect::Notify(_)));
        assert_eq!(session.stage(), Stage::Idle);
    }

    #[test]
    fn successful_delivery_clears_the_session() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(0));
        session.handle(Event::VariantsReady(vec![variant("1080p", None)]));
        session.handle(Event::Delivered { ok: true });
        assert_eq!(session.stage(), Stage::Idle);
        assert!(session.selected().is_none());
    }

    #[test]
    fn pipeline_failure_resets_to_idle_with_message() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(0));
        let effect = session.handle(Event::Failed(ResolveError::NoPlayableSource));
        assert!(matches!(effect, Effect::Notify(m) if m == "No playable sources found."));
        assert_eq!(session.stage(), Stage::Idle);
    }

    #[test]
    fn cancel_resets_from_any_stage() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::Cancel);
        assert_eq!(session.stage(), Stage::Idle);

        // A late variant list after the cancel is discarded.
        let effect = session.handle(Event::VariantsReady(vec![variant("720p", None)]));
        assert!(matches!(effect, Effect::None));
        assert_eq!(session.stage(), Stage::Idle);
    }

    #[test]
    fn late_failure_after_cancel_is_discarded() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(0));
        session.handle(Event::Cancel);
        assert_eq!(session.stage(), Stage::Idle);

        // The resolve that was in flight errors out after the cancel; the
        // user already walked away, so no message.
        let effect = session.handle(Event::Failed(ResolveError::NoPlayableSource));
        assert!(matches!(effect, Effect::None));
        assert_eq!(session.stage(), Stage::Idle);
    }

    #[test]
    fn back_walks_quality_to_episodes_to_results() {
        let mut session = Session::new(&settings());
        session_at_episode_list(&mut session);
        session.handle(Event::SelectEpisode(1));
        session.handle(Event::VariantsReady(vec![
            variant("1080p", None),
            variant("720p", None),
        ]));
        assert_eq!(session.stage(), Stage::ChoosingQuality);

        session.handle(Event::Back);
        assert_eq!(session.stage(), Stage::ChoosingEpisode);
        assert!(session.variants().is_empty());
        assert!(session.selected_episode().is_none());

        session.handle(Event::Back);
        assert_eq!(session.stage(), Stage::ChoosingAnime);
        assert!(session.selected().is_none());
        assert!(session.episodes().is_empty());
        // The result list is still there to pick from again.
        let (_, page) = session.anime_page_view();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn toggle_on_result_list_reruns_the_search() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("bleach".into())));
        session.handle(Event::ResultsReady(vec![result("a", 12, 0)]));
        assert_eq!(session.stage(), Stage::ChoosingAnime);

        // Sub and dub are indexed separately, so the toggle is a re-search.
        let effect = session.handle(Event::ToggleTranslation);
        assert!(matches!(effect, Effect::RunSearch(ref q) if q == "bleach"));
        assert_eq!(session.translation(), Translation::Dub);
        assert_eq!(session.stage(), Stage::Searching);

        let effect = session.handle(Event::ResultsReady(vec![result("b", 0, 24)]));
        assert!(matches!(effect, Effect::None));
        assert_eq!(session.stage(), Stage::ChoosingAnime);
        assert_eq!(session.anime_page(), 0);
    }

    #[test]
    fn new_search_keeps_translation_preference() {
        let mut session = Session::new(&settings());
        session.handle(Event::Search(Some("bleach".into())));
        session.handle(Event::ResultsReady(vec![result("b", 24, 24)]));
        session.handle(Event::SelectAnime(0));
        session.handle(Event::EpisodesReady(vec!["1".into()]));
        session.handle(Event::ToggleTranslation);
        assert_eq!(session.translation(), Translation::Dub);

        session.handle(Event::Search(Some("naruto".into())));
        assert_eq!(session.translation(), Translation::Dub);
        assert!(session.selected().is_none());
    }

    #[test]
    fn manager_keeps_conversations_separate() {
        let mut manager = SessionManager::new(settings());
        manager.handle(1, Event::Search(Some("bleach".into())));
        assert_eq!(manager.session(1).stage(), Stage::Searching);
        assert_eq!(manager.session(2).stage(), Stage::Idle);

        manager.clear(1);
        assert_eq!(manager.session(1).stage(), Stage::Idle);
    }
}
