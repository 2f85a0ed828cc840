//! Join-request values and the caller's answer to them.
//!
//! The peer pushes an `ACTIVITY_JOIN_REQUEST` when another user asks to
//! join the party. The caller answers with [`crate::Client::reply`], which
//! sends one `SEND_ACTIVITY_JOIN_INVITE` (for [`JoinReply::Yes`]) or
//! `CLOSE_ACTIVITY_JOIN_REQUEST` (otherwise) keyed by the requester's id.
//! Duplicate replies are not filtered.

use serde::Deserialize;

/// A user asking to join the current party.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRequest {
    #[serde(rename = "id")]
    user_id: String,
    username: String,
    discriminator: String,
    #[serde(default)]
    avatar: Option<String>,
}

impl JoinRequest {
    /// Build a request by hand (the engine decodes them from the wire).
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        discriminator: impl Into<String>,
        avatar: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            discriminator: discriminator.into(),
            avatar,
        }
    }

    /// Requester's user id (wire field `id`).
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Requester's username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Requester's discriminator.
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Avatar hash, `None` for users without an avatar.
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }
}

/// Answer to a [`JoinRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinReply {
    /// Decline the request.
    No,
    /// Send an invite.
    Yes,
    /// Dismiss the request without answering.
    Ignore,
}

impl JoinReply {
    /// Command name sent for this reply.
    pub fn command(self) -> &'static str {
        match self {
            Self::Yes => "SEND_ACTIVITY_JOIN_INVITE",
            Self::No | Self::Ignore => "CLOSE_ACTIVITY_JOIN_REQUEST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_id_into_user_id() {
        let request: JoinRequest = serde_json::from_value(json!({
            "id": "42",
            "username": "u",
            "discriminator": "0001",
            "avatar": "a"
        }))
        .unwrap();

        assert_eq!(request.user_id(), "42");
        assert_eq!(request.username(), "u");
        assert_eq!(request.discriminator(), "0001");
        assert_eq!(request.avatar(), Some("a"));
    }

    #[test]
    fn test_null_avatar_is_accepted() {
        let request: JoinRequest = serde_json::from_value(json!({
            "id": "7",
            "username": "n",
            "discriminator": "0",
            "avatar": null
        }))
        .unwrap();
        assert_eq!(request.avatar(), None);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let result = serde_json::from_value::<JoinRequest>(json!({
            "username": "u",
            "discriminator": "0001"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_commands() {
        assert_eq!(JoinReply::Yes.command(), "SEND_ACTIVITY_JOIN_INVITE");
        assert_eq!(JoinReply::No.command(), "CLOSE_ACTIVITY_JOIN_REQUEST");
        assert_eq!(JoinReply::Ignore.command(), "CLOSE_ACTIVITY_JOIN_REQUEST");
    }
}
