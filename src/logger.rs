use log::LevelFilter;

fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Initialises env_logger on stderr.
///
/// `verbose` raises the default level from `warn` to `debug`; `RUST_LOG`
/// still overrides both.
///
/// # Arguments
/// * `verbose` - Whether debug logging was requested before resolution
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .init();
    set_verbose(verbose);
}

/// Applies the resolved verbosity once the config file has been read.
///
/// Does nothing when `RUST_LOG` is set.
pub fn set_verbose(verbose: bool) {
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(default_level(verbose));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), LevelFilter::Debug);
        assert_eq!(default_level(false), LevelFilter::Warn);
    }
}
