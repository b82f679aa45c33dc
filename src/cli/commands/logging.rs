//! `-v` / `AUTHGATE_LOG_LEVEL`: how chatty the server is.
//!
//! The flag counts (`-vvv`) while the variable takes either a number or a
//! level name. Both end up as the same `u8`, which [`level`] turns into the
//! default directive for the tracing filter. `RUST_LOG` still wins when set.

use clap::{Arg, ArgMatches, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Accepted names, indexed by verbosity.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }
        LEVEL_NAMES
            .iter()
            .position(|name| level.eq_ignore_ascii_case(name))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| {
                format!(
                    "invalid log level: {level} (expected 0-5 or one of {})",
                    LEVEL_NAMES.join(", ")
                )
            })
    })
}

/// `None` keeps the filter default (`ERROR`).
#[must_use]
pub const fn verbosity_level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Tracing level requested on the command line or in the environment.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    verbosity_level(matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("AUTHGATE_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
