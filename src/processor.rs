//! File emission for turbine.
//! Turns each template context into a file on disk, or into a dry-run trace
//! of the directory creation and write that would have happened.

use crate::config::{ErrorPolicy, ResolvedConfig};
use crate::error::{Error, Result};
use crate::filename::is_valid_path;
use crate::generator::{FileWriter, Registry, TemplateContext};
use crate::renderer::Templates;
use async_trait::async_trait;
use log::{debug, error, info};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// A filesystem action recorded in dry-run mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action")]
pub enum DryRunAction {
    #[serde(rename = "create directory", rename_all = "camelCase")]
    CreateDirectory { path: String, absolute_path: String },
    #[serde(rename = "write file")]
    WriteFile { filename: String, content: String },
}

/// Destination of the dry-run trace: one JSON object per line.
pub type TraceSink = Box<dyn Write + Send>;

/// Renders contexts and writes (or traces) the resulting files.
pub struct FileEmitter {
    templates: Arc<Templates>,
    mkdirp: bool,
    trace: Option<Mutex<TraceSink>>,
}

/// Directory that must exist before `filename` can be written.
pub fn parent_directory(filename: &str) -> PathBuf {
    Path::new(filename)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

impl FileEmitter {
    /// Creates the emitter described by `config`; dry runs trace to stderr.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let trace: Option<TraceSink> = config.dry_run.then(|| Box::new(io::stderr()) as TraceSink);
        Self::new(config.templates.clone(), config.mkdirp, trace)
    }

    /// Creates an emitter; with a trace sink nothing is ever written to disk.
    pub fn new(templates: Arc<Templates>, mkdirp: bool, trace: Option<TraceSink>) -> Self {
        Self { templates, mkdirp, trace: trace.map(Mutex::new) }
    }

    pub fn is_dry_run(&self) -> bool {
        self.trace.is_some()
    }

    fn record(sink: &Mutex<TraceSink>, action: &DryRunAction) -> Result<()> {
        let line = serde_json::to_string(action)?;
        let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(sink, "{line}")?;
        Ok(())
    }

    fn trace_actions(&self, sink: &Mutex<TraceSink>, filename: String, content: String) -> Result<()> {
        if self.mkdirp {
            let directory = parent_directory(&filename);
            let absolute = std::path::absolute(&directory).unwrap_or_else(|_| directory.clone());
            Self::record(
                sink,
                &DryRunAction::CreateDirectory {
                    path: directory.display().to_string(),
                    absolute_path: absolute.display().to_string(),
                },
            )?;
        }
        Self::record(sink, &DryRunAction::WriteFile { filename, content })
    }

    async fn emit(&self, filename: String, content: String) -> Result<()> {
        if self.mkdirp {
            let directory = parent_directory(&filename);
            tokio::fs::create_dir_all(&directory)
                .await
                .map_err(|source| Error::WriteError { path: directory.clone(), source })?;
            debug!("Ensured directory '{}'", directory.display());
        }
        tokio::fs::write(&filename, content)
            .await
            .map_err(|source| Error::WriteError { path: PathBuf::from(&filename), source })?;
        info!("Wrote '{filename}'");
        Ok(())
    }
}

#[async_trait]
impl FileWriter for FileEmitter {
    /// Renders `context` and emits the file.
    ///
    /// # Errors
    /// * `Error::MinijinjaError` if rendering fails
    /// * `Error::InvalidFilename` if the rendered name is empty or has an
    ///   invalid segment; nothing is created in that case
    /// * `Error::WriteError` if creating the directory or writing fails
    async fn write(&self, context: TemplateContext) -> Result<()> {
        let (filename, content) = self.templates.render_pair(&context)?;
        if !is_valid_path(&filename) {
            return Err(Error::InvalidFilename { filename });
        }

        match &self.trace {
            Some(sink) => self.trace_actions(sink, filename, content),
            None => self.emit(filename, content).await,
        }
    }
}

fn settle(
    joined: std::result::Result<Result<()>, JoinError>,
    policy: ErrorPolicy,
    failed: &mut usize,
) -> Result<()> {
    match (joined.map_err(Error::from).and_then(|outcome| outcome), policy) {
        (Ok(()), _) => Ok(()),
        (Err(err), ErrorPolicy::Abort) => Err(err),
        (Err(err), ErrorPolicy::Continue) => {
            error!("{err}");
            *failed += 1;
            Ok(())
        }
    }
}

/// Hands every context to `writer` through a bounded worker pool.
///
/// At most `config.concurrency` writes are in flight; completion order is
/// unspecified. Under [`ErrorPolicy::Abort`] the first failure stops
/// dispatching and cancels the writes still outstanding. Under
/// [`ErrorPolicy::Continue`] every context is attempted and the failures are
/// reported together as `Error::EmissionFailed`. Files already written are
/// never rolled back.
///
/// # Arguments
/// * `writer` - Destination of every context
/// * `contexts` - One context per output file
/// * `config` - Supplies the concurrency limit and the error policy
///
/// # Returns
/// * `Result<()>` - `Ok` once every context has been written
///
/// # Errors
/// * The first write error under [`ErrorPolicy::Abort`]
/// * `Error::EmissionFailed` under [`ErrorPolicy::Continue`]
/// * `Error::TaskError` if a write task panics
pub async fn write_all(
    writer: Arc<dyn FileWriter>,
    contexts: Vec<TemplateContext>,
    config: &ResolvedConfig,
) -> Result<()> {
    let total = contexts.len();
    let permits = Arc::new(Semaphore::new(config.concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut tasks = JoinSet::new();
    let mut failed = 0;

    debug!("Emitting {total} files, {} at a time", config.concurrency);
    for context in contexts {
        let permit = permits.clone().acquire_owned().await.map_err(io::Error::other)?;
        while let Some(joined) = tasks.try_join_next() {
            settle(joined, config.on_error, &mut failed)?;
        }
        let writer = writer.clone();
        tasks.spawn(async move {
            let _permit = permit;
            writer.write(context).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        settle(joined, config.on_error, &mut failed)?;
    }

    if failed > 0 {
        return Err(Error::EmissionFailed { failed, total });
    }
    Ok(())
}

/// Runs the generator selected by `config` against the real file emitter.
pub async fn execute(registry: &Registry, config: ResolvedConfig) -> Result<()> {
    let generator = registry.get(&config.command)?;
    let writer = Arc::new(FileEmitter::from_config(&config));
    if writer.is_dry_run() {
        info!("Dry run: no files will be written");
    }
    generator.generate(&config, writer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parent_directory() {
        assert_eq!(parent_directory("Portal.md"), PathBuf::from("."));
        assert_eq!(parent_directory("games/Portal.md"), PathBuf::from("games"));
        assert_eq!(parent_directory("/tmp/a/b.md"), PathBuf::from("/tmp/a"));
    }

    #[test]
    fn test_dry_run_action_format() {
        let action = DryRunAction::CreateDirectory {
            path: "games".to_string(),
            absolute_path: "/work/games".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "create directory", "path": "games", "absolutePath": "/work/games"})
        );

        let action = DryRunAction::WriteFile {
            filename: "games/Portal.md".to_string(),
            content: "# Portal".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "write file", "filename": "games/Portal.md", "content": "# Portal"})
        );
    }
}
