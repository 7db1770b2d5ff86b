//! The generator contract.
//! A generator is a pluggable data source: it declares a command name and
//! its own options, fetches and validates its data, and hands one
//! [`TemplateContext`] per output file to a [`FileWriter`].

use crate::config::ResolvedConfig;
use crate::error::{Error, Result};
use crate::options::OptionSpec;
use crate::steam::SteamGenerator;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The data rendered into one output file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemplateContext(Map<String, Value>);

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for TemplateContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<TemplateContext> for Value {
    fn from(context: TemplateContext) -> Self {
        Value::Object(context.0)
    }
}

/// Receives the contexts a generator produces.
///
/// The real implementation renders and writes a file; the dry-run one only
/// traces what would happen. Generators never touch the filesystem directly.
#[async_trait]
pub trait FileWriter: Send + Sync {
    async fn write(&self, context: TemplateContext) -> Result<()>;
}

/// A pluggable data source.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Subcommand name selecting this generator.
    fn command(&self) -> &'static str;

    /// One-line description shown in `--help`.
    fn description(&self) -> &'static str;

    /// Options this generator adds to the global ones.
    fn options(&self) -> Vec<OptionSpec>;

    /// Fetches the data and hands every output context to `writer`.
    ///
    /// Any upstream or validation failure must be returned before the first
    /// call to `writer`.
    async fn generate(&self, config: &ResolvedConfig, writer: Arc<dyn FileWriter>) -> Result<()>;
}

type GeneratorFactory = fn() -> Box<dyn Generator>;

/// Generators compiled into the binary.
const BUILTIN: &[GeneratorFactory] = &[SteamGenerator::boxed];

/// Table of generators keyed by command name.
#[derive(Default)]
pub struct Registry {
    generators: IndexMap<&'static str, Box<dyn Generator>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in generator.
    ///
    /// # Errors
    /// * `Error::ConfigError` if two built-in generators share a command name
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for factory in BUILTIN {
            registry.register(factory())?;
        }
        Ok(registry)
    }

    /// Adds a generator.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the command name is already taken
    pub fn register(&mut self, generator: Box<dyn Generator>) -> Result<()> {
        let command = generator.command();
        if self.generators.contains_key(command) {
            return Err(Error::ConfigError(format!(
                "generator '{command}' is registered twice"
            )));
        }
        self.generators.insert(command, generator);
        Ok(())
    }

    /// Builder-style [`Registry::register`].
    pub fn with(mut self, generator: Box<dyn Generator>) -> Result<Self> {
        self.register(generator)?;
        Ok(self)
    }

    /// Looks up the generator for `command`.
    pub fn get(&self, command: &str) -> Result<&dyn Generator> {
        self.generators
            .get(command)
            .map(|generator| generator.as_ref())
            .ok_or_else(|| Error::UnknownGenerator(command.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Generator> {
        self.generators.values().map(|generator| generator.as_ref())
    }
}
