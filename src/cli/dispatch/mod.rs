use crate::{
    auth::AuthType,
    cli::{
        actions::{Action, server::Args},
        commands::{ARG_DSN, ARG_HOST, ARG_PORT, auth},
    },
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(5000);
    let host = matches
        .get_one::<String>(ARG_HOST)
        .cloned()
        .context("missing required argument: --host")?;
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_type = matches
        .get_one::<AuthType>(auth::ARG_AUTH_TYPE)
        .copied()
        .unwrap_or(AuthType::Default);
    let session_name = matches
        .get_one::<String>(auth::ARG_SESSION_NAME)
        .cloned()
        .context("missing required argument: --session-name")?;
    let session_duration = matches
        .get_one::<i64>(auth::ARG_SESSION_DURATION)
        .copied()
        .unwrap_or(0);
    let excluded_paths = matches
        .get_many::<String>(auth::ARG_EXCLUDED_PATHS)
        .map(|paths| {
            paths
                .map(|path| path.trim().to_string())
                .filter(|path| !path.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Action::Server(Args {
        host,
        port,
        dsn,
        auth_type,
        session_name,
        session_duration,
        excluded_paths,
    }))
}
