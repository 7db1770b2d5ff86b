//! Common constants used throughout turbine.

/// Prefix of the environment variables mapped onto options.
pub const ENV_PREFIX: &str = "TURBINE_";

/// Option naming the config file; never read from the config file itself.
pub const CONFIG_OPTION: &str = "config";

/// Default number of files emitted at the same time.
pub const DEFAULT_CONCURRENCY: &str = "16";

/// Values accepted by `--on-error`.
pub const ERROR_POLICIES: &[&str] = &["abort", "continue"];
