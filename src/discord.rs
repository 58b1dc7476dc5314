use crate::presence::PresenceRecord;
use crate::status::ServerStatus;
use anyhow::{Context as _, Result};
use chrono::NaiveDateTime;
use reqwest::Method;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

const STATUS_COLOR: u32 = 3_332_471;
const ALERT_COLOR: u32 = 15_548_997;
const OFFLINE_MESSAGE: &str = "**Server is offline**";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Embed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Image>,
    footer: Footer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Image {
    url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Footer {
    text: String,
}

/// Builds the webhook payload: one overview embed, then one embed per
/// sampled player in sample order. Must run after reconciliation so every
/// sampled name has a first-seen entry; a name without one is skipped.
pub fn compose(status: &ServerStatus, presence: &PresenceRecord, now: NaiveDateTime) -> WebhookMessage {
    let mut embeds = vec![overview_embed(status, now)];
    if status.online {
        for name in &status.players {
            match presence.get(name) {
                Some(first_seen) => embeds.push(player_embed(name, *first_seen)),
                None => warn!("{name} is in the sample but has no first-seen entry, skipping"),
            }
        }
    }
    WebhookMessage { embeds }
}

fn overview_embed(status: &ServerStatus, now: NaiveDateTime) -> Embed {
    let footer = Footer {
        text: format!("Last updated at {}", now.format("%H:%M:%S")),
    };
    let (description, color) = if status.online {
        let plural = if status.online_count == 1 { "" } else { "s" };
        (
            format!(
                "```{}```\n**{} player{} online**",
                status.motd, status.online_count, plural
            ),
            STATUS_COLOR,
        )
    } else {
        (OFFLINE_MESSAGE.to_owned(), ALERT_COLOR)
    };
    Embed {
        title: "Server Status".to_owned(),
        description: Some(description),
        color,
        image: None,
        footer,
    }
}

fn player_embed(name: &str, first_seen: NaiveDateTime) -> Embed {
    Embed {
        title: name.to_owned(),
        description: None,
        color: name_color(name),
        image: Some(Image {
            url: format!("https://minotar.net/helm/{name}/30"),
        }),
        footer: Footer {
            text: format!("online since {}", first_seen.format("%H:%M")),
        },
    }
}

// Accent color from a digest prefix of the name, so each player keeps the
// same color across runs.
fn name_color(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    u32::from_be_bytes([0, digest[0], digest[1], digest[2]])
}

/// Sends the payload to the webhook: a create when no message id is
/// configured, otherwise an edit of that message. Delivery failures are
/// the caller's problem, there is no retry.
pub async fn notify(
    message: &WebhookMessage,
    webhook_url: &str,
    message_id: Option<&str>,
) -> Result<()> {
    let (method, url) = endpoint(webhook_url, message_id);
    let client = reqwest::Client::new();
    client
        .request(method, &url)
        .json(message)
        .send()
        .await
        .with_context(|| format!("webhook request to {url} failed"))?
        .error_for_status()
        .context("webhook rejected the message")?;
    Ok(())
}

fn endpoint(webhook_url: &str, message_id: Option<&str>) -> (Method, String) {
    match message_id {
        Some(id) => (Method::PATCH, format!("{webhook_url}/messages/{id}")),
        None => (Method::POST, webhook_url.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
    }

    fn online_status(count: u64, players: &[&str]) -> ServerStatus {
        ServerStatus {
            online: true,
            motd: "A Minecraft Server".to_owned(),
            online_count: count,
            players: players.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn offline_payload_is_a_single_alert_embed() {
        let message = compose(&ServerStatus::offline(), &PresenceRecord::new(), ts(12, 0, 0));
        assert_eq!(message.embeds.len(), 1);
        let overview = &message.embeds[0];
        assert_eq!(overview.color, ALERT_COLOR);
        assert_eq!(overview.description.as_deref(), Some(OFFLINE_MESSAGE));
        assert_eq!(overview.footer.text, "Last updated at 12:00:00");
    }

    #[test]
    fn online_payload_has_overview_then_players_in_sample_order() {
        let status = online_status(2, &["Alice", "Bob"]);
        let mut presence = PresenceRecord::new();
        presence.insert("Alice".into(), ts(9, 30, 0));
        presence.insert("Bob".into(), ts(10, 15, 0));
        let message = compose(&status, &presence, ts(12, 0, 0));
        assert_eq!(message.embeds.len(), 3);
        assert_eq!(message.embeds[0].title, "Server Status");
        assert_eq!(message.embeds[0].color, STATUS_COLOR);
        assert_eq!(message.embeds[1].title, "Alice");
        assert_eq!(message.embeds[1].footer.text, "online since 09:30");
        assert_eq!(
            message.embeds[1].image.as_ref().unwrap().url,
            "https://minotar.net/helm/Alice/30"
        );
        assert_eq!(message.embeds[2].title, "Bob");
        assert_eq!(message.embeds[2].footer.text, "online since 10:15");
    }

    #[test]
    fn count_line_is_pluralized() {
        let cases = [
            (0, "0 players online"),
            (1, "1 player online"),
            (7, "7 players online"),
        ];
        for (count, expected) in cases {
            let message = compose(&online_status(count, &[]), &PresenceRecord::new(), ts(12, 0, 0));
            let description = message.embeds[0].description.as_deref().unwrap();
            assert!(
                description.contains(expected),
                "{description:?} should contain {expected:?}"
            );
        }
    }

    #[test]
    fn motd_appears_verbatim_in_a_code_block() {
        let message = compose(&online_status(0, &[]), &PresenceRecord::new(), ts(12, 0, 0));
        let description = message.embeds[0].description.as_deref().unwrap();
        assert!(description.starts_with("```A Minecraft Server```"));
    }

    #[test]
    fn sampled_player_without_record_entry_is_skipped() {
        let status = online_status(1, &["Alice"]);
        let message = compose(&status, &PresenceRecord::new(), ts(12, 0, 0));
        assert_eq!(message.embeds.len(), 1);
    }

    #[test]
    fn name_color_is_stable_and_distinct() {
        assert_eq!(name_color("Alice"), name_color("Alice"));
        assert_ne!(name_color("Alice"), name_color("Bob"));
        assert!(name_color("Alice") <= 0x00FF_FFFF);
    }

    #[test]
    fn endpoint_creates_without_message_id() {
        let (method, url) = endpoint("https://discord.com/api/webhooks/1/abc", None);
        assert_eq!(method, Method::POST);
        assert_eq!(url, "https://discord.com/api/webhooks/1/abc");
    }

    #[test]
    fn endpoint_edits_with_message_id() {
        let (method, url) = endpoint("https://discord.com/api/webhooks/1/abc", Some("42"));
        assert_eq!(method, Method::PATCH);
        assert_eq!(url, "https://discord.com/api/webhooks/1/abc/messages/42");
    }

    #[test]
    fn payload_serializes_to_the_webhook_shape() {
        let status = online_status(1, &["Alice"]);
        let mut presence = PresenceRecord::new();
        presence.insert("Alice".into(), ts(9, 30, 0));
        let message = compose(&status, &presence, ts(12, 0, 0));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["embeds"][0]["title"], "Server Status");
        assert!(value["embeds"][0].get("image").is_none());
        assert_eq!(
            value["embeds"][1]["image"]["url"],
            "https://minotar.net/helm/Alice/30"
        );
        assert!(value["embeds"][1].get("description").is_none());
    }
}
