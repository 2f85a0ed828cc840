//! Rich Presence activity payload.
//!
//! [`RichPresence`] serializes to the `activity` object of a `SET_ACTIVITY`
//! command. Unset optional fields are omitted from the JSON; empty
//! `details`/`state` strings are omitted as well since the peer rejects
//! zero-length values.
//!
//! # Example
//!
//! ```
//! use presence_ipc::RichPresence;
//!
//! let presence = RichPresence::new()
//!     .details("Ranked match")
//!     .state("In queue")
//!     .large_image("map_dust", "Dust II")
//!     .party("lobby-1", 2, 5);
//! ```

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Activity shown on the user's profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichPresence {
    /// What the player is doing.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    /// Party status or sub-state.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    /// Whether this is an instanced session.
    pub instance: bool,
    /// Elapsed / remaining time display.
    #[serde(skip_serializing_if = "Timestamps::is_empty")]
    pub timestamps: Timestamps,
    /// Image keys and hover texts.
    #[serde(skip_serializing_if = "Assets::is_empty")]
    pub assets: Assets,
    /// Party identity and occupancy.
    #[serde(skip_serializing_if = "Party::is_empty")]
    pub party: Party,
    /// Join / spectate / match secrets.
    #[serde(skip_serializing_if = "Secrets::is_empty")]
    pub secrets: Secrets,
}

impl Default for RichPresence {
    fn default() -> Self {
        Self {
            details: String::new(),
            state: String::new(),
            instance: true,
            timestamps: Timestamps::default(),
            assets: Assets::default(),
            party: Party::default(),
            secrets: Secrets::default(),
        }
    }
}

impl RichPresence {
    /// Empty presence (instanced, nothing else set).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the details line.
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Set the state line.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Mark the session as instanced or not.
    pub fn instance(mut self, instance: bool) -> Self {
        self.instance = instance;
        self
    }

    /// Show elapsed time since `start`.
    pub fn started_at(mut self, start: DateTime<Utc>) -> Self {
        self.timestamps.start = Some(start);
        self
    }

    /// Show remaining time until `end`.
    pub fn ends_at(mut self, end: DateTime<Utc>) -> Self {
        self.timestamps.end = Some(end);
        self
    }

    /// Set the large image key and its hover text.
    pub fn large_image(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.assets.large_image = Some(key.into());
        self.assets.large_text = Some(text.into());
        self
    }

    /// Set the small image key and its hover text.
    pub fn small_image(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.assets.small_image = Some(key.into());
        self.assets.small_text = Some(text.into());
        self
    }

    /// Set the party id and occupancy.
    pub fn party(mut self, id: impl Into<String>, current: u32, max: u32) -> Self {
        self.party.id = Some(id.into());
        self.party.size = Some(PartySize { current, max });
        self
    }

    /// Secret handed to users who join this party.
    pub fn join_secret(mut self, secret: impl Into<String>) -> Self {
        self.secrets.join = Some(secret.into());
        self
    }

    /// Secret handed to spectators.
    pub fn spectate_secret(mut self, secret: impl Into<String>) -> Self {
        self.secrets.spectate = Some(secret.into());
        self
    }

    /// Secret for the current match instance.
    pub fn match_secret(mut self, secret: impl Into<String>) -> Self {
        self.secrets.match_secret = Some(secret.into());
        self
    }

    /// Serialize to the `activity` JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        // Derived Serialize on plain fields cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Session start / end, sent as Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    /// Session start.
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<DateTime<Utc>>,
    /// Session end.
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
}

impl Timestamps {
    fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Image asset keys and hover texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assets {
    /// Large image asset key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    /// Large image hover text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    /// Small image asset key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    /// Small image hover text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

impl Assets {
    fn is_empty(&self) -> bool {
        self.large_image.is_none()
            && self.large_text.is_none()
            && self.small_image.is_none()
            && self.small_text.is_none()
    }
}

/// Party identity and occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Party {
    /// Party id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Current and maximum size, sent together as `[current, max]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<PartySize>,
}

impl Party {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.size.is_none()
    }
}

/// Party occupancy. Both halves always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartySize {
    /// Members currently in the party.
    pub current: u32,
    /// Party capacity.
    pub max: u32,
}

impl Serialize for PartySize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.current, self.max].serialize(serializer)
    }
}

/// Secrets for the join / spectate flows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Secrets {
    /// Join secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    /// Match secret.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_secret: Option<String>,
    /// Spectate secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectate: Option<String>,
}

impl Secrets {
    fn is_empty(&self) -> bool {
        self.join.is_none() && self.match_secret.is_none() && self.spectate.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_default_presence_is_instanced_and_minimal() {
        assert_eq!(RichPresence::new().to_json(), json!({"instance": true}));
    }

    #[test]
    fn test_full_presence_shape() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let presence = RichPresence::new()
            .details("Ranked")
            .state("Playing")
            .instance(false)
            .started_at(start)
            .large_image("big", "Big text")
            .small_image("small", "Small text")
            .party("p1", 2, 4)
            .join_secret("j")
            .match_secret("m")
            .spectate_secret("s");

        assert_eq!(
            presence.to_json(),
            json!({
                "details": "Ranked",
                "state": "Playing",
                "instance": false,
                "timestamps": {"start": 1_700_000_000},
                "assets": {
                    "large_image": "big",
                    "large_text": "Big text",
                    "small_image": "small",
                    "small_text": "Small text"
                },
                "party": {"id": "p1", "size": [2, 4]},
                "secrets": {"join": "j", "match": "m", "spectate": "s"}
            })
        );
    }

    #[test]
    fn test_party_without_size_omits_size() {
        let mut presence = RichPresence::new();
        presence.party.id = Some("solo".to_string());
        let value = presence.to_json();
        assert_eq!(value["party"], json!({"id": "solo"}));
    }
}
