//! Live chat platform connector built on serenity.

mod convert;
pub mod handler;
pub mod platform;

pub use handler::Handler;
pub use platform::DiscordPlatform;

use crate::app::TriageApp;
use crate::config::{Config, ConfigError};
use serenity::all::{Client, GatewayIntents};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use triage_runtime::error::StoreError;

/// Errors that stop the connector.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Configuration is incomplete
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The gateway client failed
    #[error("client error: {0}")]
    Client(#[from] serenity::Error),

    /// In-flight runs did not finish in time
    #[error("shutdown error: {0}")]
    Shutdown(#[from] StoreError),
}

/// Gateway intents the engines rely on.
#[must_use]
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES
}

/// Connect and process events until Ctrl+C, then drain in-flight runs.
///
/// # Errors
///
/// Returns [`ConnectorError`] if the token is missing, the client fails or
/// shutdown times out.
pub async fn run(config: Config) -> Result<(), ConnectorError> {
    let app: Arc<OnceLock<TriageApp>> = Arc::new(OnceLock::new());
    let handler = Handler::new(config.desk.clone(), Arc::clone(&app));

    let mut client = Client::builder(config.token()?, intents())
        .event_handler(handler)
        .await?;
    let shard_manager = Arc::clone(&client.shard_manager);

    tokio::select! {
        result = client.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, disconnecting");
            shard_manager.shutdown_all().await;
        },
    }

    if let Some(app) = app.get() {
        app.shutdown(config.shutdown_timeout).await?;
    }
    Ok(())
}
