//! turbine's main application entry point.
//! Initialises logging, resolves the configuration and runs the selected
//! generator.

use std::ffi::OsString;
use turbine::{
    config::{early_verbose, resolve},
    error::default_error_handler,
    generator::Registry,
    logger::{init_logger, set_verbose},
    processor::execute,
};

/// Main application entry point.
///
/// # Flow
/// 1. Starts logging at the verbosity given by flags or `TURBINE_VERBOSE`
/// 2. Resolves flags, `TURBINE_*` variables and the config file
/// 3. Compiles the output templates
/// 4. Fetches the generator's data
/// 5. Writes, or traces in a dry run, one file per context
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let registry = match Registry::builtin() {
        Ok(registry) => registry,
        Err(err) => default_error_handler(err),
    };
    let args: Vec<OsString> = std::env::args_os().collect();
    let env: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();

    init_logger(early_verbose(&registry, args.iter().cloned(), &env));

    let config = match resolve(&registry, args, env) {
        Ok(config) => config,
        Err(err) => default_error_handler(err),
    };

    set_verbose(config.verbose);
    log::debug!("Running generator '{}'", config.command);

    if let Err(err) = execute(&registry, config).await {
        default_error_handler(err);
    }
}
