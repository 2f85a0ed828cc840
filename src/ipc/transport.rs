//! Duplex byte-stream transport to the desktop peer.
//!
//! A [`Connector`] opens the stream for one candidate ordinal; the
//! [`Transport`] wrapper owns it afterwards and tracks liveness. Reads are
//! never awaited: [`Transport::try_read`] polls the stream exactly once so
//! the engine's Read Loop tick cannot hang on a quiet socket.

#[cfg(unix)]
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::framing::Frame;
use crate::constants::SOCKET_NAME_PREFIX;

/// Any duplex byte stream the engine can drive.
pub trait IpcStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IpcStream for T {}

/// Opens a stream to candidate address `index`.
///
/// The engine calls this for `0..ADDRESS_CANDIDATES` in increasing order and
/// stops at the first success.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to candidate `index`.
    async fn connect(&self, index: u8) -> io::Result<Box<dyn IpcStream>>;
}

/// Connector for the platform's local sockets (Unix domain sockets or
/// Windows named pipes).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConnector;

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self, index: u8) -> io::Result<Box<dyn IpcStream>> {
        let path = candidate_path(index);
        log::trace!("[Ipc] Trying {}", path.display());
        connect_local(path).await
    }
}

/// Path of candidate address `index`.
///
/// Unix: first non-empty of `$XDG_RUNTIME_DIR`, `$TMPDIR`, `$TMP`, `$TEMP`,
/// falling back to `/tmp`, joined with `discord-ipc-{index}`.
#[cfg(unix)]
pub fn candidate_path(index: u8) -> PathBuf {
    runtime_dir().join(format!("{SOCKET_NAME_PREFIX}{index}"))
}

/// Path of candidate address `index` (`\\?\pipe\discord-ipc-{index}`).
#[cfg(windows)]
pub fn candidate_path(index: u8) -> PathBuf {
    PathBuf::from(format!(r"\\?\pipe\{SOCKET_NAME_PREFIX}{index}"))
}

#[cfg(unix)]
fn runtime_dir() -> PathBuf {
    runtime_dir_from(|key| std::env::var_os(key))
}

#[cfg(unix)]
fn runtime_dir_from(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .into_iter()
        .filter_map(lookup)
        .find(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

#[cfg(unix)]
async fn connect_local(path: PathBuf) -> io::Result<Box<dyn IpcStream>> {
    let stream = tokio::net::UnixStream::connect(&path).await?;
    Ok(Box::new(stream))
}

#[cfg(windows)]
async fn connect_local(path: PathBuf) -> io::Result<Box<dyn IpcStream>> {
    let client = tokio::net::windows::named_pipe::ClientOptions::new().open(&path)?;
    Ok(Box::new(client))
}

/// Errors after which the stream is considered gone.
fn is_fatal(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

/// An established connection to one candidate address.
pub struct Transport {
    stream: Box<dyn IpcStream>,
    index: u8,
    connected: bool,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("index", &self.index)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Wrap a freshly connected stream.
    pub fn new(stream: Box<dyn IpcStream>, index: u8) -> Self {
        Self {
            stream,
            index,
            connected: true,
        }
    }

    /// Candidate ordinal this transport connected to.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Liveness as last observed by a read or write.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// One non-blocking read attempt.
    ///
    /// Returns `Ok(0)` when nothing is available yet. End of stream also
    /// returns `Ok(0)` but marks the transport disconnected.
    pub fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.connected {
            return Err(io::ErrorKind::NotConnected.into());
        }

        match self.stream.read(buf).now_or_never() {
            None => Ok(0),
            Some(Ok(0)) => {
                log::debug!("[Ipc] End of stream on candidate {}", self.index);
                self.connected = false;
                Ok(0)
            }
            Some(Ok(n)) => Ok(n),
            Some(Err(e)) => {
                if is_fatal(&e) {
                    self.connected = false;
                }
                Err(e)
            }
        }
    }

    /// Encode and write one frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if !self.connected {
            return Err(io::ErrorKind::NotConnected.into());
        }

        let bytes = frame.encode();
        let result = match self.stream.write_all(&bytes).await {
            Ok(()) => self.stream.flush().await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => log::trace!("[Ipc] Sent {:?} ({} bytes)", frame.opcode, frame.length()),
            Err(e) if is_fatal(e) => self.connected = false,
            Err(_) => {}
        }
        result
    }

    /// Shut the stream down. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.connected {
            if let Err(e) = self.stream.shutdown().await {
                log::debug!("[Ipc] Shutdown error on candidate {}: {e}", self.index);
            }
            self.connected = false;
        }
    }
}
