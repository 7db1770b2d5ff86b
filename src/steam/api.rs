//! Steam Web API access.
//! Fetches the owned-games list and validates it against the shape the
//! generator relies on before any record is decoded.

use crate::error::{Error, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::LazyLock;
use url::Url;

/// Endpoint of `IPlayerService/GetOwnedGames`.
pub const OWNED_GAMES_ENDPOINT: &str =
    "https://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";

/// Base of the community icon URLs, completed with `/{appid}/{hash}.jpg`.
pub const ICON_URL_BASE: &str = "https://media.steampowered.com/steamcommunity/public/images/apps";

/// Parameters of one owned-games request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedGamesRequest {
    pub api_key: String,
    pub steam_id: String,
    pub include_app_info: bool,
    pub include_played_free_games: bool,
}

impl OwnedGamesRequest {
    /// Query string pairs in the order Steam documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("steamid", self.steam_id.clone()),
            ("include_appinfo", self.include_app_info.to_string()),
            ("include_played_free_games", self.include_played_free_games.to_string()),
            ("format", "json".to_string()),
        ]
    }
}

/// Where the raw owned-games document comes from.
#[async_trait]
pub trait OwnedGamesSource: Send + Sync {
    /// Performs the request and returns the undecoded JSON body.
    async fn fetch(&self, request: &OwnedGamesRequest) -> Result<Value>;
}

/// The live Steam Web API.
pub struct SteamWebApi {
    client: reqwest::Client,
    endpoint: String,
}

impl SteamWebApi {
    pub fn new() -> Self {
        Self::with_endpoint(OWNED_GAMES_ENDPOINT)
    }

    /// Uses another base URL, e.g. a local mirror.
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }

    /// Full request URL, credentials included.
    pub fn request_url(&self, request: &OwnedGamesRequest) -> Result<Url> {
        Url::parse_with_params(&self.endpoint, request.query()).map_err(|e| {
            Error::ConfigError(format!("invalid endpoint '{}': {e}", self.endpoint))
        })
    }
}

impl Default for SteamWebApi {
    fn default() -> Self {
        SteamWebApi::new()
    }
}

/// Drops the request URL from a transport error; its query holds the API key.
fn redacted(err: reqwest::Error) -> Error {
    Error::HttpError(err.without_url())
}

#[async_trait]
impl OwnedGamesSource for SteamWebApi {
    /// Issues a single GET; there is no retry and no pagination.
    ///
    /// # Errors
    /// * `Error::HttpError` if the request fails or the body is not JSON
    /// * `Error::UpstreamStatus` if Steam answers with a non-success status
    async fn fetch(&self, request: &OwnedGamesRequest) -> Result<Value> {
        let url = self.request_url(request)?;
        debug!("Requesting owned games for {} from {}", request.steam_id, self.endpoint);

        let response = self.client.get(url).send().await.map_err(redacted)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus { status: status.as_u16() });
        }
        response.json::<Value>().await.map_err(redacted)
    }
}

/// One game from the owned-games list, with app info included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedGame {
    pub appid: i64,
    pub name: String,
    pub playtime_forever: i64,
    pub playtime_windows_forever: i64,
    pub playtime_mac_forever: i64,
    pub playtime_linux_forever: i64,
    pub playtime_disconnected: i64,
    pub rtime_last_played: i64,
    /// Icon hash, combined with the appid by [`OwnedGame::icon_url`]
    #[serde(default)]
    pub img_icon_url: Option<String>,
}

impl OwnedGame {
    /// Community icon URL, when Steam supplied an icon hash.
    pub fn icon_url(&self) -> Option<String> {
        self.img_icon_url
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .map(|hash| format!("{ICON_URL_BASE}/{}/{hash}.jpg", self.appid))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnedGames {
    pub game_count: u64,
    pub games: Vec<OwnedGame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnedGamesResponse {
    pub response: OwnedGames,
}

static RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    let counter = json!({"type": "integer"});
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["response"],
        "properties": {
            "response": {
                "type": "object",
                "required": ["game_count", "games"],
                "properties": {
                    "game_count": {"type": "integer", "minimum": 0},
                    "games": {"type": "array", "items": {"$ref": "#/$defs/game"}}
                }
            }
        },
        "$defs": {
            "game": {
                "type": "object",
                "required": [
                    "appid",
                    "name",
                    "playtime_forever",
                    "playtime_windows_forever",
                    "playtime_mac_forever",
                    "playtime_linux_forever",
                    "playtime_disconnected",
                    "rtime_last_played"
                ],
                "properties": {
                    "appid": counter,
                    "name": {"type": "string"},
                    "playtime_forever": counter,
                    "playtime_windows_forever": counter,
                    "playtime_mac_forever": counter,
                    "playtime_linux_forever": counter,
                    "playtime_disconnected": counter,
                    "rtime_last_played": counter,
                    "img_icon_url": {"type": "string"}
                }
            }
        }
    })
});

/// Validates a raw owned-games document and decodes it.
///
/// Every violation is reported, not only the first; any violation fails the
/// whole document.
///
/// # Arguments
/// * `raw` - Undecoded body returned by an [`OwnedGamesSource`]
///
/// # Returns
/// * `Result<OwnedGamesResponse>` - The decoded owned-games list
///
/// # Errors
/// * `Error::ValidationError` if the document does not match the schema
pub fn validate_owned_games(raw: &Value) -> Result<OwnedGamesResponse> {
    let validator = jsonschema::validator_for(&RESPONSE_SCHEMA)
        .map_err(|e| Error::ValidationError(format!("invalid response schema: {e}")))?;
    let violations: Vec<String> = validator.iter_errors(raw).map(|e| e.to_string()).collect();
    if !violations.is_empty() {
        return Err(Error::ValidationError(format!(
            "unexpected owned games response: {}",
            violations.join("; ")
        )));
    }
    serde_json::from_value(raw.clone()).map_err(|e| Error::ValidationError(e.to_string()))
}
