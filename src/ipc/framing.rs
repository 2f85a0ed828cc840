//! Wire protocol codec for the presence IPC socket.
//!
//! Every message is a fixed 8-byte header followed by the payload:
//!
//! ```text
//! [u32 LE opcode] [u32 LE length] [payload: length bytes]
//! ```
//!
//! Opcodes:
//! - `0`: Handshake (client → peer, first frame on every connection)
//! - `1`: Frame (JSON command or dispatched event)
//! - `2`: Close (peer → client, `{code, message}`)
//! - `3`: Ping (peer → client, answered with an identical Pong)
//! - `4`: Pong
//!
//! Payloads are UTF-8 JSON text with no terminator. No padding, no checksum.

use crate::constants::{HEADER_LEN, MAX_FRAME_SIZE};
use crate::error::ProtocolError;

/// Frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Connection handshake `{v, client_id}`.
    Handshake = 0,
    /// JSON command or event.
    Frame = 1,
    /// Channel closed by the peer.
    Close = 2,
    /// Keepalive request.
    Ping = 3,
    /// Keepalive answer.
    Pong = 4,
}

impl TryFrom<u32> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Handshake),
            1 => Ok(Self::Frame),
            2 => Ok(Self::Close),
            3 => Ok(Self::Ping),
            4 => Ok(Self::Pong),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message kind.
    pub opcode: Opcode,
    /// Raw payload bytes (UTF-8 JSON for every defined command).
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame from raw payload bytes.
    pub fn new(opcode: Opcode, payload: Vec<u8>) -> Self {
        Self { opcode, payload }
    }

    /// Create a frame carrying a JSON value as compact text.
    pub fn json(opcode: Opcode, value: &serde_json::Value) -> Self {
        Self::new(opcode, value.to_string().into_bytes())
    }

    /// Payload length as written in the header.
    pub fn length(&self) -> u32 {
        self.payload.len() as u32
    }

    /// Encode this frame into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.opcode, &self.payload)
    }

    /// Parse the payload as JSON.
    pub fn json_payload(&self) -> Result<serde_json::Value, ProtocolError> {
        decode_payload(&self.payload)
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Message kind.
    pub opcode: Opcode,
    /// Payload length in bytes.
    pub length: u32,
}

impl Header {
    /// Zero-length records carry no frame and are skipped by readers.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Encode `[opcode][length][payload]`.
pub fn encode(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let length = payload.len() as u32;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&(opcode as u32).to_le_bytes());
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Decode an 8-byte header.
///
/// # Errors
///
/// [`ProtocolError::UnknownOpcode`] when the opcode is not one of the five
/// defined values.
pub fn decode_header(header: [u8; HEADER_LEN]) -> Result<Header, ProtocolError> {
    let raw_opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let opcode = Opcode::try_from(raw_opcode)?;
    Ok(Header { opcode, length })
}

/// Decode a JSON payload.
///
/// # Errors
///
/// [`ProtocolError::DecodeFailure`] on invalid UTF-8 or invalid JSON.
pub fn decode_payload(payload: &[u8]) -> Result<serde_json::Value, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Incremental frame decoder that handles partial reads.
///
/// Bytes left over from an incomplete frame stay buffered until the next
/// [`FrameDecoder::feed`]. Errors are per frame: a frame with an unknown
/// opcode is consumed and reported, and decoding continues with the next one.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create a new decoder with empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the decoder and extract all complete frames.
    ///
    /// Zero-length records are consumed without producing anything.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Frame, ProtocolError>> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while self.buf.len() >= HEADER_LEN {
            let mut raw = [0u8; HEADER_LEN];
            raw.copy_from_slice(&self.buf[..HEADER_LEN]);

            let length = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
            if length > MAX_FRAME_SIZE {
                // Stream is out of sync, nothing after this point is trustworthy
                self.buf.clear();
                frames.push(Err(ProtocolError::FrameTooLarge(length)));
                break;
            }

            let total = HEADER_LEN + length as usize;
            if self.buf.len() < total {
                break; // Incomplete frame, wait for more data
            }

            let payload: Vec<u8> = self.buf.drain(..total).skip(HEADER_LEN).collect();
            match decode_header(raw) {
                Ok(header) if header.is_empty() => {
                    log::trace!("[Ipc] Skipping empty {:?} record", header.opcode);
                }
                Ok(header) => frames.push(Ok(Frame::new(header.opcode, payload))),
                Err(e) => frames.push(Err(e)),
            }
        }

        frames
    }

    /// Returns true if the decoder has buffered partial data.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(opcode: u32, length: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&opcode.to_le_bytes());
        buf.extend_from_slice(&length.to_le_bytes());
        buf
    }

    #[test]
    fn test_encode_layout_is_exact() {
        let encoded = encode(Opcode::Ping, b"abc");
        assert_eq!(encoded, vec![3, 0, 0, 0, 3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn test_header_round_trip() {
        let frame = Frame::json(Opcode::Frame, &serde_json::json!({"cmd": "SUBSCRIBE"}));
        let encoded = frame.encode();

        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&encoded[..HEADER_LEN]);
        let header = decode_header(raw).unwrap();

        assert_eq!(header.opcode, Opcode::Frame);
        assert_eq!(header.length, frame.length());
        assert_eq!(&encoded[HEADER_LEN..], frame.payload.as_slice());
    }

    #[test]
    fn test_every_opcode_round_trips_through_decoder() {
        let opcodes = [
            Opcode::Handshake,
            Opcode::Frame,
            Opcode::Close,
            Opcode::Ping,
            Opcode::Pong,
        ];
        let mut buf = Vec::new();
        for opcode in opcodes {
            buf.extend_from_slice(&encode(opcode, b"{}"));
        }

        let mut decoder = FrameDecoder::new();
        let frames: Vec<Frame> = decoder.feed(&buf).into_iter().map(Result::unwrap).collect();
        let decoded: Vec<Opcode> = frames.iter().map(|f| f.opcode).collect();
        assert_eq!(decoded, opcodes);
    }

    #[test]
    fn test_unknown_opcode_rejected() {
        let raw: [u8; HEADER_LEN] = header_bytes(7, 2).try_into().unwrap();
        assert!(matches!(
            decode_header(raw),
            Err(ProtocolError::UnknownOpcode(7))
        ));
    }

    #[test]
    fn test_unknown_opcode_frame_is_skipped_and_reported() {
        let mut buf = header_bytes(9, 4);
        buf.extend_from_slice(b"junk");
        buf.extend_from_slice(&encode(Opcode::Ping, b"\"p\""));

        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(&buf);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(ProtocolError::UnknownOpcode(9))));
        let ping = results[1].as_ref().unwrap();
        assert_eq!(ping.opcode, Opcode::Ping);
        assert_eq!(ping.payload, b"\"p\"");
    }

    #[test]
    fn test_zero_length_record_produces_nothing() {
        let mut buf = header_bytes(Opcode::Frame as u32, 0);
        buf.extend_from_slice(&header_bytes(Opcode::Ping as u32, 0));

        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&buf).is_empty());
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_partial_frame_reassembly() {
        let frame = Frame::json(Opcode::Frame, &serde_json::json!({"evt": "READY"}));
        let encoded = frame.encode();
        let mut decoder = FrameDecoder::new();

        // Split inside the header
        assert!(decoder.feed(&encoded[..5]).is_empty());
        assert!(decoder.has_partial());

        // Split inside the payload
        assert!(decoder.feed(&encoded[5..12]).is_empty());

        let frames = decoder.feed(&encoded[12..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &frame);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_oversized_frame_discards_buffer() {
        let mut buf = header_bytes(Opcode::Frame as u32, MAX_FRAME_SIZE + 1);
        buf.extend_from_slice(b"trailing");

        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(&buf);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ProtocolError::FrameTooLarge(_))));
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_decode_payload_rejects_malformed_json() {
        assert!(matches!(
            decode_payload(b"{\"evt\": "),
            Err(ProtocolError::DecodeFailure(_))
        ));
        assert!(matches!(
            decode_payload(&[0xff, 0xfe]),
            Err(ProtocolError::DecodeFailure(_))
        ));
    }

    #[test]
    fn test_json_payload_is_compact_utf8() {
        let frame = Frame::json(Opcode::Handshake, &serde_json::json!({"v": 1}));
        assert_eq!(frame.payload, b"{\"v\":1}");
        assert_eq!(frame.json_payload().unwrap()["v"], 1);
    }
}
