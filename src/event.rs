//! Typed events decoded from peer payloads.
//!
//! Decoding is fallible per event: a payload naming a known event whose
//! `data` is absent or ill-typed yields a [`DispatchError`] and the event is
//! dropped. Payloads naming an unknown event (command responses included)
//! decode to `Ok(None)`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DispatchError;
use crate::join::JoinRequest;
use crate::protocol::EventName;

/// Something the peer told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Handshake accepted; the connection is usable.
    Ready,
    /// Peer-reported application error. The connection stays up.
    Error {
        /// Error code.
        code: i64,
        /// Human-readable message.
        message: String,
    },
    /// The user joined a game through the peer.
    Join {
        /// Join secret from the inviting presence.
        secret: String,
    },
    /// The user started spectating through the peer.
    Spectate {
        /// Spectate secret from the watched presence.
        secret: String,
    },
    /// Another user asks to join.
    JoinRequest {
        /// Who is asking.
        request: JoinRequest,
        /// Join secret the request refers to.
        secret: String,
    },
    /// The connection ended: a Close frame (with its code and message) or a
    /// transport failure (neither).
    Disconnected {
        /// Close code, if the peer sent one.
        code: Option<i64>,
        /// Close message, if the peer sent one.
        message: Option<String>,
    },
}

/// Discriminant of [`Event`], used to key per-kind callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`Event::Ready`]
    Ready,
    /// [`Event::Error`]
    Error,
    /// [`Event::Join`]
    Join,
    /// [`Event::Spectate`]
    Spectate,
    /// [`Event::JoinRequest`]
    JoinRequest,
    /// [`Event::Disconnected`]
    Disconnected,
}

impl Event {
    /// Which kind of event this is.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready => EventKind::Ready,
            Self::Error { .. } => EventKind::Error,
            Self::Join { .. } => EventKind::Join,
            Self::Spectate { .. } => EventKind::Spectate,
            Self::JoinRequest { .. } => EventKind::JoinRequest,
            Self::Disconnected { .. } => EventKind::Disconnected,
        }
    }
}

#[derive(Deserialize)]
struct ErrorData {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct SecretData {
    secret: String,
}

#[derive(Deserialize)]
struct JoinRequestData {
    user: JoinRequest,
    secret: String,
}

/// Decode a `Frame`-opcode payload into an event.
pub fn decode_event(payload: &Value) -> Result<Option<Event>, DispatchError> {
    let Some(name) = payload
        .get("evt")
        .and_then(Value::as_str)
        .and_then(EventName::from_wire)
    else {
        return Ok(None);
    };
    let event = name.as_str();

    let data = match payload.get("data") {
        None | Some(Value::Null) => return Err(DispatchError::MissingData { event }),
        Some(data) => data,
    };
    let invalid = |source| DispatchError::InvalidField { event, source };

    let decoded = match name {
        EventName::Ready => Event::Ready,
        EventName::Error => {
            let ErrorData { code, message } = ErrorData::deserialize(data).map_err(invalid)?;
            Event::Error { code, message }
        }
        EventName::ActivityJoin => {
            let SecretData { secret } = SecretData::deserialize(data).map_err(invalid)?;
            Event::Join { secret }
        }
        EventName::ActivitySpectate => {
            let SecretData { secret } = SecretData::deserialize(data).map_err(invalid)?;
            Event::Spectate { secret }
        }
        EventName::ActivityJoinRequest => {
            let JoinRequestData { user, secret } =
                JoinRequestData::deserialize(data).map_err(invalid)?;
            Event::JoinRequest {
                request: user,
                secret,
            }
        }
    };

    Ok(Some(decoded))
}

/// Code and message carried by a Close frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReason {
    /// Close code.
    pub code: Option<i64>,
    /// Close message.
    pub message: Option<String>,
}

/// Decode a Close payload. Never fails: whatever cannot be read is `None`.
pub fn decode_close(payload: &[u8]) -> CloseReason {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => CloseReason {
            code: value.get("code").and_then(Value::as_i64),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
        },
        Err(e) => {
            log::warn!("[Dispatch] Unreadable Close payload: {e}");
            CloseReason::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready() {
        let payload = json!({"cmd": "DISPATCH", "evt": "READY", "data": {"v": 1}});
        assert_eq!(decode_event(&payload).unwrap(), Some(Event::Ready));
    }

    #[test]
    fn test_error_event() {
        let payload = json!({"evt": "ERROR", "data": {"code": 4000, "message": "bad"}});
        assert_eq!(
            decode_event(&payload).unwrap(),
            Some(Event::Error {
                code: 4000,
                message: "bad".to_string()
            })
        );
    }

    #[test]
    fn test_join_and_spectate() {
        let join = json!({"evt": "ACTIVITY_JOIN", "data": {"secret": "js"}});
        let spectate = json!({"evt": "ACTIVITY_SPECTATE", "data": {"secret": "ss"}});
        assert_eq!(
            decode_event(&join).unwrap(),
            Some(Event::Join {
                secret: "js".to_string()
            })
        );
        assert_eq!(
            decode_event(&spectate).unwrap(),
            Some(Event::Spectate {
                secret: "ss".to_string()
            })
        );
    }

    #[test]
    fn test_join_request() {
        let payload = json!({
            "cmd": "DISPATCH",
            "evt": "ACTIVITY_JOIN_REQUEST",
            "data": {
                "user": {"id": "42", "username": "u", "discriminator": "0001", "avatar": "a"},
                "secret": "s"
            }
        });
        let Some(Event::JoinRequest { request, secret }) = decode_event(&payload).unwrap() else {
            panic!("expected JoinRequest");
        };
        assert_eq!(request.user_id(), "42");
        assert_eq!(secret, "s");
    }

    #[test]
    fn test_unknown_or_absent_evt_is_ignored() {
        assert_eq!(decode_event(&json!({"evt": "GUILD_CREATE", "data": {}})).unwrap(), None);
        assert_eq!(decode_event(&json!({"cmd": "SET_ACTIVITY", "evt": null})).unwrap(), None);
        assert_eq!(decode_event(&json!([1, 2, 3])).unwrap(), None);
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let result = decode_event(&json!({"evt": "READY"}));
        assert!(matches!(
            result,
            Err(DispatchError::MissingData { event: "READY" })
        ));
    }

    #[test]
    fn test_wrong_field_type_is_an_error() {
        let payload = json!({"evt": "ERROR", "data": {"code": "4000", "message": "bad"}});
        assert!(matches!(
            decode_event(&payload),
            Err(DispatchError::InvalidField { event: "ERROR", .. })
        ));

        let payload = json!({"evt": "ACTIVITY_JOIN", "data": {}});
        assert!(decode_event(&payload).is_err());
    }

    #[test]
    fn test_close_reason() {
        let reason = decode_close(br#"{"code":4000,"message":"bye"}"#);
        assert_eq!(reason.code, Some(4000));
        assert_eq!(reason.message.as_deref(), Some("bye"));

        assert_eq!(decode_close(b"garbage"), CloseReason::default());
    }
}
