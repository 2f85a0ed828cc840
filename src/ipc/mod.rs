//! Local IPC plumbing: frame codec and socket transport.
//!
//! # Architecture
//!
//! ```text
//! Engine task                               Desktop peer
//! ┌──────────────────┐                ┌──────────────────┐
//! │ Transport        │                │ discord-ipc-N    │
//! │  Box<IpcStream>  │◄──────────────►│  listener        │
//! │  FrameDecoder    │  frames over   │                  │
//! └──────────────────┘  local socket  └──────────────────┘
//! ```
//!
//! # Wire Protocol
//!
//! `[u32 LE opcode][u32 LE length][payload]`
//!
//! See [`framing`] for opcodes and codec.

pub mod framing;
pub mod transport;

pub use framing::{Frame, FrameDecoder, Opcode};
pub use transport::{candidate_path, Connector, IpcStream, LocalConnector, Transport};
