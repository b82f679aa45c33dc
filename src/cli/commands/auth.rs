use clap::{Arg, Command, builder::ValueParser};

use crate::auth::{AuthType, credentials::DEFAULT_SESSION_NAME, gate::DEFAULT_EXCLUDED_PATHS};

pub const ARG_AUTH_TYPE: &str = "auth-type";
pub const ARG_SESSION_NAME: &str = "session-name";
pub const ARG_SESSION_DURATION: &str = "session-duration";
pub const ARG_EXCLUDED_PATHS: &str = "excluded-paths";

#[must_use]
pub fn validator_auth_type() -> ValueParser {
    ValueParser::from(move |value: &str| value.parse::<AuthType>())
}

/// Seconds; anything that is not an integer counts as `0` (no expiry).
#[must_use]
pub fn validator_session_duration() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<i64, String> {
        Ok(value.trim().parse::<i64>().unwrap_or(0))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_TYPE)
                .long(ARG_AUTH_TYPE)
                .help(format!(
                    "Authentication strategy: {}",
                    AuthType::VARIANTS.join(", ")
                ))
                .env("AUTH_TYPE")
                .default_value(AuthType::Default.as_str())
                .value_parser(validator_auth_type()),
        )
        .arg(
            Arg::new(ARG_SESSION_NAME)
                .long(ARG_SESSION_NAME)
                .help("Name of the session cookie")
                .env("SESSION_NAME")
                .default_value(DEFAULT_SESSION_NAME),
        )
        .arg(
            Arg::new(ARG_SESSION_DURATION)
                .long(ARG_SESSION_DURATION)
                .help("Session lifetime in seconds, 0 or less never expires")
                .env("SESSION_DURATION")
                .default_value("0")
                .allow_negative_numbers(true)
                .value_parser(validator_session_duration()),
        )
        .arg(
            Arg::new(ARG_EXCLUDED_PATHS)
                .long(ARG_EXCLUDED_PATHS)
                .help("Comma separated paths that skip authentication, `*` suffix matches a prefix")
                .env("AUTHGATE_EXCLUDED_PATHS")
                .value_delimiter(',')
                .default_values(DEFAULT_EXCLUDED_PATHS),
        )
}
