#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use turbine::config::{resolve, ResolvedConfig};
use turbine::error::{Error, Result};
use turbine::generator::{FileWriter, Registry, TemplateContext};
use turbine::steam::{OwnedGamesRequest, OwnedGamesSource, SteamGenerator};

/// Owned-games source answering with a fixed document and counting calls.
pub struct MockSource {
    body: Value,
    status: Option<u16>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(body: Value) -> Arc<Self> {
        Arc::new(Self { body, status: None, calls: AtomicUsize::new(0) })
    }

    /// Source whose every request is answered with a non-success status.
    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self { body: Value::Null, status: Some(status), calls: AtomicUsize::new(0) })
    }

    pub fn with_games(names: &[&str]) -> Arc<Self> {
        let games: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(i, name)| game(i as i64 + 10, name))
            .collect();
        Self::new(json!({"response": {"game_count": games.len(), "games": games}}))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OwnedGamesSource for MockSource {
    async fn fetch(&self, _request: &OwnedGamesRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(Error::UpstreamStatus { status }),
            None => Ok(self.body.clone()),
        }
    }
}

pub fn game(appid: i64, name: &str) -> Value {
    json!({
        "appid": appid,
        "name": name,
        "playtime_forever": 42,
        "playtime_windows_forever": 40,
        "playtime_mac_forever": 0,
        "playtime_linux_forever": 2,
        "playtime_disconnected": 0,
        "rtime_last_played": 1700000000,
        "img_icon_url": "0f1e2d"
    })
}

pub fn registry_with(source: Arc<MockSource>) -> Registry {
    Registry::new()
        .with(Box::new(SteamGenerator::with_source(source)))
        .unwrap()
}

pub fn args(extra: &[&str]) -> Vec<String> {
    let mut res = vec!["turbine".to_string()];
    res.extend(extra.iter().map(|s| s.to_string()));
    res
}

pub fn no_env() -> Vec<(String, String)> {
    Vec::new()
}

pub fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Resolves `steam` with credentials plus the given extra arguments.
pub fn steam_config(registry: &Registry, extra: &[&str]) -> ResolvedConfig {
    let mut all = vec!["steam", "-k", "KEY", "-i", "76561197960287930"];
    all.extend_from_slice(extra);
    resolve(registry, args(&all), no_env()).unwrap()
}

/// Writer that only records the contexts it receives.
#[derive(Default)]
pub struct RecordingWriter {
    pub contexts: Mutex<Vec<TemplateContext>>,
}

impl RecordingWriter {
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .contexts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl FileWriter for RecordingWriter {
    async fn write(&self, context: TemplateContext) -> Result<()> {
        tokio::task::yield_now().await;
        if context.get("fail").and_then(Value::as_bool) == Some(true) {
            return Err(Error::InvalidFilename { filename: "failing".to_string() });
        }
        self.contexts.lock().unwrap().push(context);
        Ok(())
    }
}

/// In-memory trace sink that can be read after the emitter is gone.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
