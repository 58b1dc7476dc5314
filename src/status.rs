use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const STATUS_API_BASE: &str = "https://api.mcsrvstat.us/3";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
// Name reported by the status API for servers that hide player identities.
const ANONYMOUS_PLAYER: &str = "Anonymous Player";

/// Normalized status of one server: formatting codes already stripped from
/// the motd, the sentinel name dropped, and the sample sorted so downstream
/// output is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub online: bool,
    pub motd: String,
    pub online_count: u64,
    pub players: Vec<String>,
}

impl ServerStatus {
    pub fn offline() -> Self {
        Self {
            online: false,
            motd: String::new(),
            online_count: 0,
            players: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    online: bool,
    #[serde(default)]
    motd: Option<Motd>,
    #[serde(default)]
    players: Option<Players>,
}

#[derive(Debug, Deserialize)]
struct Motd {
    #[serde(default)]
    clean: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Players {
    online: u64,
    #[serde(default)]
    list: Vec<PlayerEntry>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    name: String,
}

/// Queries the status API for the given `host[:port]` address. Timeouts and
/// any other query failure are reported as an offline status rather than an
/// error, so the run always produces a notification.
pub async fn fetch(address: &str) -> ServerStatus {
    match try_fetch(address).await {
        Ok(status) => status,
        Err(e) => {
            warn!("status query for {address} failed: {e:#}");
            ServerStatus::offline()
        }
    }
}

async fn try_fetch(address: &str) -> Result<ServerStatus> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = client
        .get(format!("{STATUS_API_BASE}/{address}"))
        .send()
        .await?
        .error_for_status()?
        .json::<StatusResponse>()
        .await?;
    Ok(normalize(response))
}

fn normalize(response: StatusResponse) -> ServerStatus {
    if !response.online {
        return ServerStatus::offline();
    }
    let motd = response
        .motd
        .map(|motd| motd.clean.join("\n"))
        .unwrap_or_default();
    let (online_count, players) = match response.players {
        Some(players) => {
            let names = players
                .list
                .into_iter()
                .map(|player| player.name)
                .filter(|name| name != ANONYMOUS_PLAYER)
                .sorted()
                .collect();
            (players.online, names)
        }
        None => (0, Vec::new()),
    };
    ServerStatus {
        online: true,
        motd,
        online_count,
        players,
    }
}
