//! Command payloads sent to the peer and the event names it dispatches.
//!
//! Every builder returns a ready-to-write [`Frame`]:
//!
//! | builder        | opcode    | payload                                                   |
//! |----------------|-----------|-----------------------------------------------------------|
//! | [`handshake`]  | Handshake | `{"v":1,"client_id":…}`                                   |
//! | [`subscribe`]  | Frame     | `{"cmd":"SUBSCRIBE","evt":…,"nonce":…}`                   |
//! | [`set_activity`]| Frame    | `{"cmd":"SET_ACTIVITY","args":{"pid":…,"activity":…},"nonce":…}` |
//! | [`join_reply`] | Frame     | `{"cmd":…,"args":{"user_id":…}}`                          |

use serde_json::json;
use uuid::Uuid;

use crate::constants::HANDSHAKE_VERSION;
use crate::ipc::framing::{Frame, Opcode};
use crate::join::JoinReply;
use crate::presence::RichPresence;

/// Events the peer dispatches in `Frame` payloads (`evt` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Handshake accepted.
    Ready,
    /// Application error reported by the peer.
    Error,
    /// User accepted an invite / clicked join.
    ActivityJoin,
    /// User clicked spectate.
    ActivitySpectate,
    /// Another user asks to join.
    ActivityJoinRequest,
}

impl EventName {
    /// Events subscribed to right after the handshake.
    pub const SUBSCRIPTIONS: [EventName; 3] = [
        EventName::ActivityJoin,
        EventName::ActivitySpectate,
        EventName::ActivityJoinRequest,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Error => "ERROR",
            Self::ActivityJoin => "ACTIVITY_JOIN",
            Self::ActivitySpectate => "ACTIVITY_SPECTATE",
            Self::ActivityJoinRequest => "ACTIVITY_JOIN_REQUEST",
        }
    }

    /// Parse a wire name; `None` for events this client does not handle.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(Self::Ready),
            "ERROR" => Some(Self::Error),
            "ACTIVITY_JOIN" => Some(Self::ActivityJoin),
            "ACTIVITY_SPECTATE" => Some(Self::ActivitySpectate),
            "ACTIVITY_JOIN_REQUEST" => Some(Self::ActivityJoinRequest),
            _ => None,
        }
    }
}

/// Fresh random nonce for a command.
fn nonce() -> String {
    Uuid::new_v4().to_string()
}

/// First frame on every connection.
pub fn handshake(app_id: &str) -> Frame {
    Frame::json(
        Opcode::Handshake,
        &json!({
            "v": HANDSHAKE_VERSION,
            "client_id": app_id,
        }),
    )
}

/// Subscribe to one event kind.
pub fn subscribe(event: EventName) -> Frame {
    Frame::json(
        Opcode::Frame,
        &json!({
            "cmd": "SUBSCRIBE",
            "evt": event.as_str(),
            "nonce": nonce(),
        }),
    )
}

/// Publish `presence` as the activity of process `pid`.
pub fn set_activity(pid: u32, presence: &RichPresence) -> Frame {
    Frame::json(
        Opcode::Frame,
        &json!({
            "cmd": "SET_ACTIVITY",
            "args": {
                "pid": pid,
                "activity": presence.to_json(),
            },
            "nonce": nonce(),
        }),
    )
}

/// Answer a join request. Keyed by user id only; the secret is not resent.
pub fn join_reply(user_id: &str, reply: JoinReply) -> Frame {
    Frame::json(
        Opcode::Frame,
        &json!({
            "cmd": reply.command(),
            "args": {
                "user_id": user_id,
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(frame: &Frame) -> serde_json::Value {
        frame.json_payload().unwrap()
    }

    #[test]
    fn test_handshake_payload() {
        let frame = handshake("123456");
        assert_eq!(frame.opcode, Opcode::Handshake);
        assert_eq!(payload(&frame), json!({"v": 1, "client_id": "123456"}));
    }

    #[test]
    fn test_subscribe_uses_fresh_nonces() {
        let a = payload(&subscribe(EventName::ActivityJoin));
        let b = payload(&subscribe(EventName::ActivityJoin));
        assert_eq!(a["cmd"], "SUBSCRIBE");
        assert_eq!(a["evt"], "ACTIVITY_JOIN");
        assert!(Uuid::parse_str(a["nonce"].as_str().unwrap()).is_ok());
        assert_ne!(a["nonce"], b["nonce"]);
    }

    #[test]
    fn test_set_activity_embeds_presence_and_pid() {
        let presence = RichPresence::new().details("Exploring");
        let value = payload(&set_activity(77, &presence));
        assert_eq!(value["cmd"], "SET_ACTIVITY");
        assert_eq!(value["args"]["pid"], 77);
        assert_eq!(value["args"]["activity"]["details"], "Exploring");
        assert!(value["nonce"].is_string());
    }

    #[test]
    fn test_join_reply_has_no_nonce_or_secret() {
        let value = payload(&join_reply("42", JoinReply::Yes));
        assert_eq!(
            value,
            json!({"cmd": "SEND_ACTIVITY_JOIN_INVITE", "args": {"user_id": "42"}})
        );
    }

    #[test]
    fn test_event_names_round_trip() {
        for name in [
            EventName::Ready,
            EventName::Error,
            EventName::ActivityJoin,
            EventName::ActivitySpectate,
            EventName::ActivityJoinRequest,
        ] {
            assert_eq!(EventName::from_wire(name.as_str()), Some(name));
        }
        assert_eq!(EventName::from_wire("GUILD_CREATE"), None);
    }
}
