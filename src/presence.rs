use anyhow::{Context as _, Result};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

pub const STATE_FILE: &str = "playerStatuses.json";

/// Player name mapped to the timestamp of the first run that saw them online.
/// Only players in the most recent non-empty sample have an entry.
pub type PresenceRecord = BTreeMap<String, NaiveDateTime>;

/// Reads the persisted record. A missing, empty, or unparsable file counts
/// as an empty record; only unexpected I/O failures are errors.
pub fn load(path: &Path) -> Result<PresenceRecord> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PresenceRecord::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()))
        }
    };
    if contents.trim().is_empty() {
        return Ok(PresenceRecord::new());
    }
    match serde_json::from_str(&contents) {
        Ok(record) => Ok(record),
        Err(e) => {
            warn!("{} is corrupt, starting over: {e}", path.display());
            Ok(PresenceRecord::new())
        }
    }
}

/// Builds the next record from the current sample: sampled names keep their
/// existing first-seen timestamp or get `now`, everyone else is dropped.
/// An empty sample (including the offline case) clears the record entirely.
pub fn reconcile(current: &PresenceRecord, sample: &[String], now: NaiveDateTime) -> PresenceRecord {
    sample
        .iter()
        .map(|name| (name.clone(), current.get(name).copied().unwrap_or(now)))
        .collect()
}

/// Replaces the persisted record, via a sibling temp file and rename so a
/// crash mid-write cannot leave a truncated file behind.
pub fn save(path: &Path, record: &PresenceRecord) -> Result<()> {
    let contents = serde_json::to_string(record).context("failed to serialize presence record")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
