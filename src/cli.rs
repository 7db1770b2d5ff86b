//! Command-line interface implementation for turbine.
//! The command is assembled at runtime from the global options and the
//! options each registered generator contributes, one subcommand per
//! generator.

use crate::error::Result;
use crate::generator::Registry;
use crate::options::{global_options, OptionKind, OptionSpec};
use clap::{
    builder::PossibleValuesParser, parser::ValueSource, Arg, ArgAction, ArgMatches, Command,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::ffi::OsString;

/// Values given explicitly on the command line for the selected generator.
#[derive(Debug)]
pub struct CliInput {
    /// Name of the selected subcommand
    pub command: String,
    /// Explicitly passed option values, keyed by long name
    pub values: IndexMap<String, Value>,
}

/// Builds the clap argument for a declared option.
///
/// Required options are not marked as required here: a missing value may
/// still be supplied by the environment or the config file.
pub fn option_arg(spec: &OptionSpec) -> Arg {
    let mut arg = Arg::new(spec.name).long(spec.name).help(spec.help);
    if let Some(short) = spec.short {
        arg = arg.short(short);
    }
    match spec.kind {
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
        OptionKind::Choice(choices) => arg
            .action(ArgAction::Set)
            .value_parser(PossibleValuesParser::new(choices.iter().copied())),
        OptionKind::Text | OptionKind::Integer => arg.action(ArgAction::Set),
    }
}

/// Builds the top-level command with one subcommand per registered generator.
pub fn build_command(registry: &Registry) -> Command {
    let globals = global_options();
    Command::new("turbine")
        .version(env!("CARGO_PKG_VERSION"))
        .about("turbine: render files from your game library with templates")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(globals.iter().map(|spec| option_arg(spec).global(true)))
        .subcommands(registry.iter().map(|generator| {
            Command::new(generator.command())
                .about(generator.description())
                .args(generator.options().iter().map(option_arg))
        }))
}

fn explicit_value(matches: &ArgMatches, spec: &OptionSpec) -> Option<Value> {
    if matches.value_source(spec.name) != Some(ValueSource::CommandLine) {
        return None;
    }
    match spec.kind {
        OptionKind::Flag => Some(Value::Bool(matches.get_flag(spec.name))),
        _ => matches.get_one::<String>(spec.name).cloned().map(Value::String),
    }
}

/// Parses `args` and collects the values given explicitly on the command line.
///
/// # Errors
/// * `Error::Cli` for anything clap rejects, including an invalid choice, an
///   unknown flag, a missing subcommand and `--help`
pub fn parse<I, T>(command: Command, registry: &Registry, args: I) -> Result<CliInput>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command.try_get_matches_from(args)?;
    let (name, sub_matches) = matches
        .subcommand()
        .map(|(name, sub)| (name.to_string(), sub))
        .ok_or_else(|| {
            clap::Error::raw(clap::error::ErrorKind::MissingSubcommand, "A command is required\n")
        })?;

    let mut values = IndexMap::new();
    for spec in global_options() {
        if let Some(value) = explicit_value(sub_matches, &spec).or_else(|| explicit_value(&matches, &spec)) {
            values.insert(spec.name.to_string(), value);
        }
    }
    if let Ok(generator) = registry.get(&name) {
        for spec in generator.options() {
            if let Some(value) = explicit_value(sub_matches, &spec) {
                values.insert(spec.name.to_string(), value);
            }
        }
    }

    Ok(CliInput { command: name, values })
}

/// Reports whether `--verbose` appears on the command line.
///
/// Parse errors are tolerated, so verbosity is known before the arguments
/// are fully validated. `--help` and `--version` report `false`.
pub fn verbose_flag<I, T>(registry: &Registry, args: I) -> bool
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    build_command(registry)
        .ignore_errors(true)
        .try_get_matches_from(args)
        .map(|matches| {
            let explicit = |m: &ArgMatches| m.value_source("verbose") == Some(ValueSource::CommandLine);
            explicit(&matches) || matches.subcommand().is_some_and(|(_, sub)| explicit(sub))
        })
        .unwrap_or(false)
}
