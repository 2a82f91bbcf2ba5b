//! Terminal driver for the resolution core. It plays the role the chat
//! transport plays in production: feeding user actions into the session
//! state machine and executing the effects it asks for.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use reqwest::Client;

use anibridge::{
    AllAnimeCatalog, CatalogApi, DeliveryIntent, Effect, Event, HttpVariantSource, PageDirection,
    PagedList, Resolver, SearchResult, Session, SessionManager, Settings, Stage, Translation,
    catalog::USER_AGENT,
};

/// The driver serves a single terminal user.
const CONVERSATION_ID: i64 = 0;

#[derive(Debug, Parser)]
#[command(
    name = "anibridge",
    about = "Resolve anime episodes from AllAnime into playable stream links.",
    version
)]
struct Cli {
    #[arg(long)]
    dub: bool,

    #[arg(short = 'e', long, value_name = "EPISODE")]
    episode: Option<String>,

    #[arg(value_name = "QUERY")]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let result = run().await;
    if let Err(err) = &result {
        eprintln!("error: {err:?}");
    }
    result
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if cli.dub {
        settings.default_translation = Translation::Dub;
    }

    let catalog = AllAnimeCatalog::new(settings.search_result_limit)?;
    let http = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to create HTTP client")?;
    let resolver = Resolver::new(catalog, HttpVariantSource::new(http));
    let mut sessions = SessionManager::new(settings);
    let mut preferred_episode = cli.episode.clone();

    let initial = if cli.query.is_empty() {
        Event::Search(None)
    } else {
        Event::Search(Some(cli.query.join(" ")))
    };
    let mut effect = sessions.handle(CONVERSATION_ID, initial);

    loop {
        effect = match effect {
            Effect::None => {
                let Some(event) = next_event(sessions.session(CONVERSATION_ID), &mut preferred_episode)?
                else {
                    break;
                };
                sessions.handle(CONVERSATION_ID, event)
            }
            Effect::PromptQuery => {
                let text: String = Input::with_theme(&theme())
                    .with_prompt("What should I search for?")
                    .interact_text()?;
                sessions.handle(CONVERSATION_ID, Event::QueryText(text))
            }
            Effect::RunSearch(query) => {
                let translation = sessions.session(CONVERSATION_ID).translation();
                println!("Searching for \"{query}\" ({})...", translation.label());
                let event = match resolver.catalog().search(&query, translation).await {
                    Ok(results) => Event::ResultsReady(results),
                    Err(err) => Event::Failed(err),
                };
                sessions.handle(CONVERSATION_ID, event)
            }
            Effect::FetchEpisodes(episode_ref) => {
                let event = match resolver
                    .catalog()
                    .episodes(&episode_ref.anime_id, episode_ref.translation)
                    .await
                {
                    Ok(episodes) => Event::EpisodesReady(episodes),
                    Err(err) => Event::Failed(err),
                };
                sessions.handle(CONVERSATION_ID, event)
            }
            Effect::Resolve(episode_ref) => {
                println!("Fetching sources for episode {}...", episode_ref.episode);
                let event = match resolver.resolve(&episode_ref).await {
                    Ok(variants) => Event::VariantsReady(variants),
                    Err(err) => Event::Failed(err),
                };
                sessions.handle(CONVERSATION_ID, event)
            }
            Effect::Deliver(intent) => {
                deliver(&intent);
                sessions.handle(CONVERSATION_ID, Event::Delivered { ok: true })
            }
            Effect::Notify(message) => {
                println!("{message}");
                if sessions.session(CONVERSATION_ID).stage() == Stage::Idle {
                    break;
                }
                Effect::None
            }
        };
    }
    Ok(())
}

/// Render the current stage as a menu and translate the pick into an event.
/// Returns `None` once the session is idle again.
fn next_event(session: &Session, preferred_episode: &mut Option<String>) -> Result<Option<Event>> {
    match session.stage() {
        Stage::Idle => Ok(None),
        Stage::ChoosingAnime => choose_anime(session),
        Stage::ChoosingEpisode => choose_episode(session, preferred_episode),
        Stage::ChoosingQuality => choose_quality(session),
        // The driver is sequential; these stages never wait on a menu.
        Stage::Searching | Stage::Delivering => Ok(Some(Event::Cancel)),
    }
}

fn choose_anime(session: &Session) -> Result<Option<Event>> {
    let (start, page) = session.anime_page_view();
    let mut items: Vec<String> = page
        .iter()
        .enumerate()
        .map(|(offset, result)| format_result_row(start + offset + 1, result, session.translation()))
        .collect();

    let mut actions: Vec<Event> = Vec::new();
    if session.anime_page() > 0 {
        items.push(String::from("< Prev page"));
        actions.push(Event::Page(PagedList::Anime, PageDirection::Prev));
    }
    if session.anime_page() + 1 < session.anime_page_count() {
        items.push(String::from("Next page >"));
        actions.push(Event::Page(PagedList::Anime, PageDirection::Next));
    }
    items.push(format!("Switch to {}", session.translation().toggled().label()));
    actions.push(Event::ToggleTranslation);

    let prompt = format!(
        "Select a show (page {}/{}, Esc to cancel)",
        session.anime_page() + 1,
        session.anime_page_count()
    );
    let Some(idx) = Select::with_theme(&theme())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?
    else {
        return Ok(Some(Event::Cancel));
    };

    if idx < page.len() {
        return Ok(Some(Event::SelectAnime(start + idx)));
    }
    Ok(Some(actions.swap_remove(idx - page.len())))
}

fn choose_episode(
    session: &Session,
    preferred_episode: &mut Option<String>,
) -> Result<Option<Event>> {
    // A --episode flag jumps straight to that episode, once.
    if let Some(wanted) = preferred_episode.take() {
        if let Some(index) = session.episodes().iter().position(|ep| *ep == wanted) {
            return Ok(Some(Event::SelectEpisode(index)));
        }
        println!("Episode '{wanted}' does not exist. Showing episode list.");
    }

    let (start, page) = session.episode_page_view();
    let mut items: Vec<String> = page.iter().map(|ep| format!("Episode {ep}")).collect();

    let mut actions: Vec<Event> = Vec::new();
    if session.episode_page() > 0 {
        items.push(String::from("< Prev page"));
        actions.push(Event::Page(PagedList::Episodes, PageDirection::Prev));
    }
    if session.episode_page() + 1 < session.episode_page_count() {
        items.push(String::from("Next page >"));
        actions.push(Event::Page(PagedList::Episodes, PageDirection::Next));
    }
    items.push(format!("Switch to {}", session.translation().toggled().label()));
    actions.push(Event::ToggleTranslation);
    items.push(String::from("Back to results"));
    actions.push(Event::Back);

    let title = session
        .selected()
        .map(|s| s.title.as_str())
        .unwrap_or_default();
    let prompt = format!(
        "{title} - pick an episode (page {}/{}, Esc to cancel)",
        session.episode_page() + 1,
        session.episode_page_count()
    );
    let Some(idx) = Select::with_theme(&theme())
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?
    else {
        return Ok(Some(Event::Cancel));
    };

    if idx < page.len() {
        return Ok(Some(Event::SelectEpisode(start + idx)));
    }
    Ok(Some(actions.swap_remove(idx - page.len())))
}

fn choose_quality(session: &Session) -> Result<Option<Event>> {
    let mut items: Vec<String> = session.variants().iter().map(|v| v.label()).collect();
    let variant_count = items.len();
    items.push(String::from("Back to episodes"));

    let Some(idx) = Select::with_theme(&theme())
        .with_prompt("Select a quality (Esc to cancel)")
        .items(&items)
        .default(0)
        .interact_opt()?
    else {
        return Ok(Some(Event::Cancel));
    };

    if idx < variant_count {
        return Ok(Some(Event::SelectQuality(idx)));
    }
    Ok(Some(Event::Back))
}

/// Execute a delivery intent the way a chat transport would: media goes out
/// as an upload, everything else as a plain link.
fn deliver(intent: &DeliveryIntent) {
    let variant = intent.variant();
    match intent {
        DeliveryIntent::Media(_) => {
            println!(
                "Sending {} as media ({} bytes): {}",
                variant.label(),
                variant.estimated_size_bytes.unwrap_or_default(),
                variant.url
            );
        }
        DeliveryIntent::Link(_) => {
            println!("Stream link for {}:", variant.label());
            println!("  {}", variant.url);
            if let Some(referer) = &variant.referer {
                println!("  (send Referer: {referer})");
            }
            if let Some(subtitles) = &variant.subtitle_url {
                println!("  (subtitles: {subtitles})");
            }
        }
    }
}

fn format_result_row(position: usize, result: &SearchResult, translation: Translation) -> String {
    let mut title = result.title.clone();
    if title.chars().count() > 35 {
        title = title.chars().take(32).collect::<String>() + "...";
    }
    format!(
        "{position}. {title} ({} ep)",
        result.episode_count(translation)
    )
}

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}
