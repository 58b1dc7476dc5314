use anyhow::{Context as _, Result};
use std::env;

/// Run configuration, assembled once at startup and threaded through the
/// pipeline instead of ad hoc environment lookups.
#[derive(Debug, Clone)]
pub struct Config {
    /// `host[:port]` of the Minecraft server to query.
    pub server_address: String,
    /// Discord-compatible webhook base URL.
    pub webhook_url: String,
    /// When set, the run edits this message instead of creating a new one.
    pub webhook_message_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_address: env::var("SERVER_ADDRESS").context("'SERVER_ADDRESS' not found")?,
            webhook_url: env::var("WEBHOOK_URL").context("'WEBHOOK_URL' not found")?,
            webhook_message_id: env::var("WEBHOOK_MESSAGE_ID")
                .ok()
                .filter(|id| !id.is_empty()),
        })
    }
}
