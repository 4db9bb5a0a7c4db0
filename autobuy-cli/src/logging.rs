//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through `tracing`. The durable record of a run is
//! the audit log, which mirrors its entries into the same subscriber.

use crate::cli::Cli;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Pick the log level from the verbosity flags
pub fn level_for(cli: &Cli) -> Level {
    if cli.quiet {
        Level::ERROR
    } else if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::TRACE
    } else {
        Level::INFO
    }
}

/// Install the stderr subscriber; `RUST_LOG` replaces the flag-derived level when set
pub fn init(level: Level) {
    let builder = tracing_subscriber::fmt().with_writer(std::io::stderr);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => builder.with_max_level(level).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from_args(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(&cli(&["autobuy"])), Level::INFO);
        assert_eq!(level_for(&cli(&["autobuy", "--debug"])), Level::DEBUG);
        assert_eq!(level_for(&cli(&["autobuy", "--verbose"])), Level::TRACE);
        assert_eq!(level_for(&cli(&["autobuy", "--quiet", "--debug"])), Level::ERROR);
    }
}
