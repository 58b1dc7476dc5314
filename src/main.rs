use anyhow::Result;
use chrono::Local;
use std::path::Path;
use tracing::info;

mod config;
mod discord;
mod presence;
mod status;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::Config::from_env()?;
    let now = Local::now().naive_local();

    let status = status::fetch(&config.server_address).await;
    if status.online {
        info!(
            "{}: {} online, {} in sample",
            config.server_address,
            status.online_count,
            status.players.len()
        );
    } else {
        info!("{} is offline", config.server_address);
    }

    let state_path = Path::new(presence::STATE_FILE);
    let record = presence::reconcile(&presence::load(state_path)?, &status.players, now);
    presence::save(state_path, &record)?;

    let message = discord::compose(&status, &record, now);
    discord::notify(
        &message,
        &config.webhook_url,
        config.webhook_message_id.as_deref(),
    )
    .await?;
    info!(
        "webhook message {}",
        if config.webhook_message_id.is_some() {
            "updated"
        } else {
            "created"
        }
    );
    Ok(())
}
