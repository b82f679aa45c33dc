//! What the binary does once arguments are parsed.
//!
//! `dispatch::handler` produces an [`Action`]; `bin/authgate` runs it.

pub mod server;

use tracing::debug;

#[derive(Debug)]
pub enum Action {
    /// Serve the accounts API behind the request gate.
    Server(server::Args),
}

impl Action {
    /// Run the action to completion.
    ///
    /// # Errors
    /// Returns an error if the action fails; for `Server` that covers opening
    /// the database, binding the listener and serving.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Server(args) => {
                debug!(auth_type = %args.auth_type, "running server action");
                server::execute(args).await
            }
        }
    }
}
