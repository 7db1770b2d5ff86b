//! Declared options.
//! Global options and every generator's extension are described by
//! [`OptionSpec`] so that the command line, the environment and the config
//! file are all validated against the same schema.

use crate::constants::{CONFIG_OPTION, DEFAULT_CONCURRENCY, ERROR_POLICIES};
use serde_json::Value;

/// The shape of an option's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Free-form string. Numbers from the config file are accepted as text.
    Text,
    /// Boolean switch.
    Flag,
    /// Positive integer.
    Integer,
    /// One of a fixed set of strings.
    Choice(&'static [&'static str]),
}

/// A recognised option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Kebab-case long name, also the key in the resolved option map.
    pub name: &'static str,
    pub short: Option<char>,
    pub help: &'static str,
    pub kind: OptionKind,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl OptionSpec {
    fn new(name: &'static str, kind: OptionKind) -> Self {
        Self { name, short: None, help: "", kind, required: false, default: None }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, OptionKind::Text)
    }

    pub fn flag(name: &'static str) -> Self {
        Self::new(name, OptionKind::Flag)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, OptionKind::Integer)
    }

    pub fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(name, OptionKind::Choice(choices))
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Converts a raw value into the JSON value stored in the option map.
    ///
    /// Returns a human readable reason when the value does not fit the kind.
    pub fn coerce(&self, raw: &Value) -> Result<Value, String> {
        match (self.kind, raw) {
            (OptionKind::Text, Value::String(_)) => Ok(raw.clone()),
            (OptionKind::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (OptionKind::Flag, Value::Bool(_)) => Ok(raw.clone()),
            (OptionKind::Flag, Value::String(s)) => parse_flag(s)
                .map(Value::Bool)
                .ok_or_else(|| format!("expected a boolean, got '{s}'")),
            (OptionKind::Integer, Value::Number(n)) => n
                .as_u64()
                .filter(|n| *n > 0)
                .map(Value::from)
                .ok_or_else(|| format!("expected a positive integer, got '{n}'")),
            (OptionKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(Value::from)
                .ok_or_else(|| format!("expected a positive integer, got '{s}'")),
            (OptionKind::Choice(choices), Value::String(s)) => {
                if choices.contains(&s.as_str()) {
                    Ok(raw.clone())
                } else {
                    Err(format!("invalid value '{s}' (possible values: {})", choices.join(", ")))
                }
            }
            (_, other) => Err(format!("unexpected value {other}")),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Options recognised regardless of the selected generator.
pub fn global_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec::text("output-filename-template")
            .short('o')
            .required()
            .help("A template to use for the filename of each output file"),
        OptionSpec::text("output-template")
            .short('t')
            .required()
            .help("A template to evaluate for each output file and write to it"),
        OptionSpec::flag("mkdirp")
            .short('d')
            .help("Create directories in the file path if they don't exist"),
        OptionSpec::flag("dry-run")
            .default_value("false")
            .help("Request the data but only output the actions that would be taken"),
        OptionSpec::integer("concurrency")
            .default_value(DEFAULT_CONCURRENCY)
            .help("Maximum number of files written at the same time"),
        OptionSpec::choice("on-error", ERROR_POLICIES)
            .default_value("abort")
            .help("Whether a failed write aborts the run or the remaining files are still written"),
        OptionSpec::text(CONFIG_OPTION).help("Path to a JSON or YAML file supplying option values"),
        OptionSpec::flag("verbose").short('v').help("Enable verbose logging output"),
    ]
}
