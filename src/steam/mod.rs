//! The `steam` generator.
//! Renders one file per owned game, or one file for the whole library.

use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::filename::sanitize;
use crate::generator::{FileWriter, Generator, TemplateContext};
use crate::options::OptionSpec;
use crate::processor::write_all;
use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub mod api;

pub use api::{OwnedGame, OwnedGamesRequest, OwnedGamesSource, SteamWebApi};

const OUTPUT_TYPES: &[&str] = &["per-game", "per-user"];

/// Granularity of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    /// One context, and so one file, per game
    PerGame,
    /// A single context holding the whole library
    PerUser,
}

/// Settings the `steam` generator reads from the resolved configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SteamOptions {
    pub steam_api_key: String,
    pub steam_id: String,
    pub output_type: OutputType,
}

impl OwnedGame {
    /// Template context for this game.
    ///
    /// Holds every Steam field, `safeName` and, when an icon hash is
    /// present, `iconUrl`.
    pub fn to_context(&self) -> TemplateContext {
        let mut context = TemplateContext::new();
        context
            .insert("appid", self.appid)
            .insert("name", self.name.as_str())
            .insert("safeName", sanitize(&self.name))
            .insert("playtime_forever", self.playtime_forever)
            .insert("playtime_windows_forever", self.playtime_windows_forever)
            .insert("playtime_mac_forever", self.playtime_mac_forever)
            .insert("playtime_linux_forever", self.playtime_linux_forever)
            .insert("playtime_disconnected", self.playtime_disconnected)
            .insert("rtime_last_played", self.rtime_last_played);
        if let Some(hash) = &self.img_icon_url {
            context.insert("img_icon_url", hash.as_str());
        }
        if let Some(icon_url) = self.icon_url() {
            context.insert("iconUrl", icon_url);
        }
        context
    }
}

/// One context per game.
pub fn contexts_per_game(games: &[OwnedGame]) -> Vec<TemplateContext> {
    games.iter().map(OwnedGame::to_context).collect()
}

/// A single context with every game under `games`.
pub fn context_per_user(games: &[OwnedGame]) -> TemplateContext {
    let mut context = TemplateContext::new();
    context
        .insert("games", games.iter().map(|game| Value::from(game.to_context())).collect::<Vec<_>>())
        .insert("gameCount", games.len());
    context
}

/// Generator backed by the Steam owned-games list.
pub struct SteamGenerator {
    source: Arc<dyn OwnedGamesSource>,
}

impl SteamGenerator {
    /// Uses the live Steam Web API.
    pub fn new() -> Self {
        Self::with_source(Arc::new(SteamWebApi::new()))
    }

    /// Uses another source of owned-games documents.
    pub fn with_source(source: Arc<dyn OwnedGamesSource>) -> Self {
        Self { source }
    }

    pub fn boxed() -> Box<dyn Generator> {
        Box::new(Self::new())
    }
}

impl Default for SteamGenerator {
    fn default() -> Self {
        SteamGenerator::new()
    }
}

#[async_trait]
impl Generator for SteamGenerator {
    fn command(&self) -> &'static str {
        "steam"
    }

    fn description(&self) -> &'static str {
        "Get owned game data from Steam"
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![
            OptionSpec::text("steam-api-key").short('k').required().help("Your Steam API key"),
            OptionSpec::text("steam-id").short('i').required().help("The Steam ID of your account"),
            OptionSpec::choice("output-type", OUTPUT_TYPES)
                .default_value("per-game")
                .help("Whether to apply the template once per game or for a user's entire library at once"),
        ]
    }

    async fn generate(&self, config: &ResolvedConfig, writer: Arc<dyn FileWriter>) -> Result<()> {
        let options: SteamOptions = config.generator_options()?;
        let request = OwnedGamesRequest {
            api_key: options.steam_api_key,
            steam_id: options.steam_id,
            include_app_info: true,
            include_played_free_games: true,
        };

        let raw = self.source.fetch(&request).await?;
        let owned = api::validate_owned_games(&raw)?;
        let games = owned.response.games;
        info!("Fetched {} games for {}", games.len(), request.steam_id);

        match options.output_type {
            OutputType::PerGame => write_all(writer, contexts_per_game(&games), config).await,
            OutputType::PerUser => writer.write(context_per_user(&games)).await,
        }
    }
}
