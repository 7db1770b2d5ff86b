//! Configuration resolution for turbine.
//! Merges command-line flags, `TURBINE_*` environment variables, an optional
//! JSON or YAML config file and declared defaults into one
//! [`ResolvedConfig`], and compiles the output templates.

use crate::cli::{self, CliInput};
use crate::constants::{CONFIG_OPTION, ENV_PREFIX};
use crate::error::{Error, Result};
use crate::generator::Registry;
use crate::options::{global_options, OptionSpec};
use crate::renderer::Templates;
use heck::ToKebabCase;
use indexmap::IndexMap;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Where a resolved option value came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    CommandLine,
    Environment,
    ConfigFile,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::CommandLine => "command line",
            Source::Environment => "environment",
            Source::ConfigFile => "config file",
            Source::Default => "default",
        };
        f.write_str(name)
    }
}

/// What happens to the remaining files when one of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop at the first failure.
    Abort,
    /// Write everything that can be written, then report the failures.
    Continue,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GlobalValues {
    output_filename_template: String,
    output_template: String,
    #[serde(default)]
    mkdirp: bool,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    verbose: bool,
    concurrency: usize,
    on_error: ErrorPolicy,
}

/// Fully validated configuration for one run.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Command name of the selected generator
    pub command: String,
    /// Compiled filename and content templates
    pub templates: Arc<Templates>,
    pub mkdirp: bool,
    pub dry_run: bool,
    pub verbose: bool,
    /// Maximum number of files emitted at the same time
    pub concurrency: usize,
    pub on_error: ErrorPolicy,
    /// Every resolved option, generator-specific ones included
    pub options: IndexMap<String, Value>,
}

impl ResolvedConfig {
    /// Returns the resolved value of an option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Deserializes the resolved options into a generator's own settings.
    ///
    /// Field names are the kebab-case option names; fields the target does
    /// not declare are ignored.
    pub fn generator_options<T: DeserializeOwned>(&self) -> Result<T> {
        let object: serde_json::Map<String, Value> = self.options.clone().into_iter().collect();
        serde_json::from_value(Value::Object(object)).map_err(|e| {
            Error::ConfigError(format!("invalid options for '{}': {e}", self.command))
        })
    }
}

/// Maps `TURBINE_*` variables onto declared option names.
///
/// The prefix is matched case-insensitively and the rest is normalised to
/// kebab-case, so `TURBINE_OUTPUT_TEMPLATE` sets `output-template`.
/// Variables that do not name a declared option are ignored.
pub fn environment_values<E>(specs: &[OptionSpec], env: E) -> IndexMap<String, Value>
where
    E: IntoIterator<Item = (String, String)>,
{
    let mut values = IndexMap::new();
    for (key, value) in env {
        let Some(prefix) = key.get(..ENV_PREFIX.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(ENV_PREFIX) {
            continue;
        }
        let name = key[ENV_PREFIX.len()..].to_kebab_case();
        if specs.iter().any(|spec| spec.name == name) {
            values.insert(name, Value::String(value));
        } else {
            debug!("Ignoring environment variable {key}: no option named '{name}'");
        }
    }
    values
}

/// Verbosity known before resolution, from `--verbose` or `TURBINE_VERBOSE`.
///
/// A `verbose` key in the config file is only seen by [`resolve`].
///
/// # Arguments
/// * `registry` - Generators contributing subcommands
/// * `args` - Raw command-line arguments, program name first
/// * `env` - Environment variables
///
/// # Returns
/// * `bool` - Whether debug logging was requested
pub fn early_verbose<I, T>(registry: &Registry, args: I, env: &[(String, String)]) -> bool
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    if cli::verbose_flag(registry, args) {
        return true;
    }
    let specs: Vec<OptionSpec> = global_options().into_iter().filter(|spec| spec.name == "verbose").collect();
    environment_values(&specs, env.iter().cloned())
        .get("verbose")
        .zip(specs.first())
        .and_then(|(raw, spec)| spec.coerce(raw).ok())
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

/// Parses config file content, JSON first and YAML second.
///
/// Top-level keys are normalised to kebab-case.
pub fn parse_config_file(content: &str) -> Result<IndexMap<String, Value>> {
    let raw: IndexMap<String, Value> = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {e}")))?,
    };
    Ok(raw.into_iter().map(|(key, value)| (key.to_kebab_case(), value)).collect())
}

/// Loads and parses the config file at `path`.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, Value>> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("cannot read config file '{}': {e}", path.display()))
    })?;
    parse_config_file(&content)
}

fn usage_error(message: String, usage: &str) -> Error {
    Error::Usage { message, usage: usage.to_string() }
}

/// Merges the value layers for each declared option.
///
/// Every value is coerced according to its option kind. Options without a
/// value and without a default are left out; missing required options are
/// reported as a usage error.
pub fn merge_layers(
    specs: &[OptionSpec],
    cli: &IndexMap<String, Value>,
    env: &IndexMap<String, Value>,
    file: &IndexMap<String, Value>,
    usage: &str,
) -> Result<IndexMap<String, Value>> {
    for key in file.keys() {
        if key.as_str() != CONFIG_OPTION && !specs.iter().any(|spec| spec.name == key.as_str()) {
            debug!("Ignoring unknown config file key '{key}'");
        }
    }

    let mut resolved = IndexMap::new();
    for spec in specs {
        let layered = cli
            .get(spec.name)
            .map(|v| (v.clone(), Source::CommandLine))
            .or_else(|| env.get(spec.name).map(|v| (v.clone(), Source::Environment)))
            .or_else(|| {
                file.get(spec.name)
                    .filter(|_| spec.name != CONFIG_OPTION)
                    .map(|v| (v.clone(), Source::ConfigFile))
            })
            .or_else(|| spec.default.map(|d| (Value::String(d.to_string()), Source::Default)));

        let Some((raw, source)) = layered else {
            if spec.required {
                return Err(usage_error(
                    format!("Missing required option '--{}'", spec.name),
                    usage,
                ));
            }
            continue;
        };

        let value = spec.coerce(&raw).map_err(|reason| {
            usage_error(format!("Invalid value for '--{}' from {source}: {reason}", spec.name), usage)
        })?;
        debug!("Option '{}' resolved from {source}", spec.name);
        resolved.insert(spec.name.to_string(), value);
    }
    Ok(resolved)
}

/// Resolves the configuration for one run.
///
/// Precedence, highest first: command-line flags, environment variables,
/// config file, declared defaults. Nothing outside the config file is read
/// and no network or output activity happens here.
///
/// # Arguments
/// * `registry` - Generators contributing subcommands and options
/// * `args` - Raw command-line arguments, program name first
/// * `env` - Environment variables; only `TURBINE_*` ones are read
///
/// # Returns
/// * `Result<ResolvedConfig>` - Validated options with compiled templates
///
/// # Errors
/// * `Error::Cli` if clap rejects the arguments
/// * `Error::UnknownGenerator` if the command names no registered generator
/// * `Error::Usage` if a required option is missing or a value is invalid
/// * `Error::ConfigError` if the config file cannot be read or parsed
/// * `Error::MinijinjaError` if a template does not compile
pub fn resolve<I, T, E>(registry: &Registry, args: I, env: E) -> Result<ResolvedConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    E: IntoIterator<Item = (String, String)>,
{
    let mut command = cli::build_command(registry);
    let usage = command.render_usage().to_string();
    let CliInput { command: name, values: cli_values } = cli::parse(command, registry, args)?;
    let generator = registry.get(&name)?;

    let mut specs = global_options();
    specs.extend(generator.options());

    let env_values = environment_values(&specs, env);
    let config_path = cli_values
        .get(CONFIG_OPTION)
        .or_else(|| env_values.get(CONFIG_OPTION))
        .and_then(Value::as_str)
        .map(str::to_string);
    let file_values = match config_path {
        Some(path) => load_config_file(path)?,
        None => IndexMap::new(),
    };

    let options = merge_layers(&specs, &cli_values, &env_values, &file_values, &usage)?;
    let globals: GlobalValues = serde_json::from_value(Value::Object(
        options.clone().into_iter().collect(),
    ))
    .map_err(|e| Error::ConfigError(e.to_string()))?;

    let templates = Templates::compile(&globals.output_filename_template, &globals.output_template)?;

    Ok(ResolvedConfig {
        command: name,
        templates: Arc::new(templates),
        mkdirp: globals.mkdirp,
        dry_run: globals.dry_run,
        verbose: globals.verbose,
        concurrency: globals.concurrency,
        on_error: globals.on_error,
        options,
    })
}
