//! presence-ipc - client for the local Rich Presence IPC protocol.
//!
//! A long-lived process connects over a local socket (or named pipe) to the
//! companion desktop application, announces what the user is doing, and
//! receives join, spectate and join-request callbacks pushed by the peer.
//!
//! # Architecture
//!
//! The crate follows a single-owner engine pattern:
//!
//! - **Client** - cloneable handle; every call becomes a command
//! - **Engine** - one tokio task owning the transport, timers and pending presence
//! - **Ipc** - frame codec and transport to the peer
//! - **Observers** - global and per-kind event callbacks, run on the engine
//!
//! # Modules
//!
//! - [`client`] - public handle, builder and the engine task
//! - [`ipc`] - wire framing and transport
//! - [`protocol`] - command payload builders
//! - [`event`] - typed events decoded from peer payloads
//! - [`presence`] - the activity payload
//! - [`config`] - configuration loading/saving
//!
//! # Example
//!
//! ```no_run
//! use presence_ipc::{Client, JoinReply, RichPresence};
//!
//! # async fn run() -> Result<(), presence_ipc::ClientError> {
//! let client = Client::builder("123456789012345678")
//!     .on_join_request(|client, request, _secret| {
//!         client.reply(request, JoinReply::No);
//!     })
//!     .build();
//!
//! client.set_presence(RichPresence::new().details("Main menu"));
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

// Library modules
pub mod client;
pub mod ipc;
pub mod observer;
pub mod protocol;

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod join;
pub mod presence;
pub mod register;

// Re-export commonly used types
pub use client::{Client, ClientBuilder, ConnectionState};
pub use config::Config;
pub use error::{ClientError, DispatchError, ProtocolError};
pub use event::{Event, EventKind};
pub use ipc::{Connector, IpcStream, LocalConnector};
pub use join::{JoinReply, JoinRequest};
pub use observer::EventHandler;
pub use presence::RichPresence;
pub use register::{DesktopRegistrar, NoopRegistrar, Registrar};
