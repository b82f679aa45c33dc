use crate::{
    api,
    auth::{AuthConfig, AuthType},
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub host: String,
    pub port: u16,
    pub dsn: String,
    pub auth_type: AuthType,
    pub session_name: String,
    pub session_duration: i64,
    pub excluded_paths: Vec<String>,
}

impl Args {
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.auth_type)
            .with_session_name(self.session_name.clone())
            .with_session_duration_seconds(self.session_duration)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);
    api::new(
        &args.host,
        args.port,
        &args.dsn,
        &args.auth_config(),
        args.excluded_paths,
    )
    .await
}

fn log_startup_args(args: &Args) {
    info!(
        host = %args.host,
        port = args.port,
        dsn = %args.dsn,
        auth_type = %args.auth_type,
        session_name = %args.session_name,
        session_duration = args.session_duration,
        "Startup configuration"
    );
}
