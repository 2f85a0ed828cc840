//! The engine task: sole owner of the transport, the pending presence and
//! both timers.
//!
//! Everything that touches the connection runs here, one step at a time,
//! so the transport never sees concurrent access and the presence slot
//! needs no lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use super::{Client, Command, ConnectionState};
use crate::constants::{ADDRESS_CANDIDATES, READ_CHUNK_SIZE};
use crate::error::{ClientError, ProtocolError};
use crate::event::{decode_close, decode_event, CloseReason, Event};
use crate::ipc::framing::{Frame, FrameDecoder, Opcode};
use crate::ipc::transport::{Connector, Transport};
use crate::join::JoinReply;
use crate::observer::Observers;
use crate::presence::RichPresence;
use crate::protocol::{self, EventName};

/// Fixed per-client parameters.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) app_id: Arc<str>,
    pub(crate) pid: u32,
    pub(crate) read_interval: Duration,
    pub(crate) presence_interval: Duration,
}

/// A live connection and its reassembly state.
struct Link {
    transport: Transport,
    decoder: FrameDecoder,
    scratch: Vec<u8>,
}

impl Link {
    fn new(transport: Transport) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::new(),
            scratch: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// One non-blocking read, returning every frame it completed.
    fn read(&mut self) -> std::io::Result<Vec<Result<Frame, ProtocolError>>> {
        let n = self.transport.try_read(&mut self.scratch)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        Ok(self.decoder.feed(&self.scratch[..n]))
    }
}

pub(crate) struct Engine {
    settings: Settings,
    connector: Box<dyn Connector>,
    observers: Observers,
    state: watch::Sender<ConnectionState>,
    /// Weak so that dropping every `Client` stops the engine.
    handle: mpsc::WeakUnboundedSender<Command>,
    link: Option<Link>,
    pending: Option<RichPresence>,
    read_timer: Option<Interval>,
    presence_timer: Option<Interval>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("state", &*self.state.borrow())
            .field("connected", &self.link.is_some())
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub(crate) fn new(
        settings: Settings,
        connector: Box<dyn Connector>,
        observers: Observers,
        state: watch::Sender<ConnectionState>,
        client: &Client,
    ) -> Self {
        Self {
            settings,
            connector,
            observers,
            state,
            handle: client.commands.downgrade(),
            link: None,
            pending: None,
            read_timer: None,
            presence_timer: None,
        }
    }

    /// Main loop. Returns once every `Client` handle is gone.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        log::debug!("[Engine] Started for app {}", self.settings.app_id);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                () = next_tick(&mut self.read_timer) => self.poll_transport().await,
                () = next_tick(&mut self.presence_timer) => self.flush_presence().await,
            }
        }

        self.close_link().await;
        log::debug!("[Engine] All handles dropped, stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(done) => {
                let result = self.connect().await;
                // The caller may have stopped waiting
                let _ = done.send(result);
            }
            Command::SetPresence(presence) => {
                log::trace!("[Presence] Pending presence replaced");
                self.pending = Some(presence);
            }
            Command::Reply { user_id, reply } => self.send_reply(&user_id, reply).await,
            Command::Shutdown(done) => {
                self.shutdown().await;
                let _ = done.send(());
            }
        }
    }

    // === Connection ===

    async fn connect(&mut self) -> Result<(), ClientError> {
        if self.link.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        self.set_state(ConnectionState::Connecting);
        let Some(mut transport) = sweep(self.connector.as_ref()).await else {
            log::warn!("[Ipc] No peer on any of {ADDRESS_CANDIDATES} candidate addresses");
            self.set_state(ConnectionState::Disconnected);
            return Err(ClientError::PeerNotFound(ADDRESS_CANDIDATES));
        };

        let handshake = protocol::handshake(&self.settings.app_id);
        if let Err(e) = transport.write_frame(&handshake).await {
            log::warn!("[Ipc] Handshake failed on candidate {}: {e}", transport.index());
            transport.close().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(ClientError::Transport(e));
        }

        self.link = Some(Link::new(transport));

        for event in EventName::SUBSCRIPTIONS {
            let frame = protocol::subscribe(event);
            self.send(&frame).await;
        }

        self.set_state(ConnectionState::Ready);
        self.read_timer = Some(interval_after(self.settings.read_interval));
        log::info!("[Engine] Connected as app {}", self.settings.app_id);
        Ok(())
    }

    async fn shutdown(&mut self) {
        if self.close_link().await {
            log::info!("[Engine] Connection shut down by caller");
        }
        self.set_state(ConnectionState::Closed);
    }

    /// Close the transport and report the end of the connection once.
    async fn teardown(&mut self, code: Option<i64>, message: Option<String>) {
        if !self.close_link().await {
            return;
        }
        self.set_state(ConnectionState::Closed);
        self.notify(&Event::Disconnected { code, message });
    }

    /// Stop both timers and drop the link. Returns whether a link existed.
    async fn close_link(&mut self) -> bool {
        self.read_timer = None;
        self.presence_timer = None;

        let Some(mut link) = self.link.take() else {
            return false;
        };
        link.transport.close().await;
        if link.decoder.has_partial() {
            log::debug!("[Ipc] Discarding partial frame on close");
        }
        true
    }

    // === Read Loop ===

    async fn poll_transport(&mut self) {
        let Some(link) = self.link.as_mut() else {
            self.read_timer = None;
            return;
        };

        if !link.transport.is_connected() {
            log::warn!(
                "[Ipc] Transport to candidate {} lost",
                link.transport.index()
            );
            self.teardown(None, None).await;
            return;
        }

        let frames = match link.read() {
            Ok(frames) => frames,
            Err(e) => {
                log::debug!("[Ipc] Read error this tick: {e}");
                return;
            }
        };

        for result in frames {
            match result {
                Ok(frame) => self.handle_frame(frame).await,
                Err(e) => log::warn!("[Ipc] Dropped frame: {e}"),
            }
            if self.link.is_none() {
                break;
            }
        }
    }

    async fn handle_frame(&mut self, frame: Frame) {
        log::trace!(
            "[Ipc] Received {:?} ({} bytes)",
            frame.opcode,
            frame.length()
        );

        match frame.opcode {
            Opcode::Ping => {
                let pong = Frame::new(Opcode::Pong, frame.payload);
                self.send(&pong).await;
            }
            Opcode::Close => {
                let CloseReason { code, message } = decode_close(&frame.payload);
                log::info!("[Engine] Peer closed the connection: code={code:?} message={message:?}");
                self.teardown(code, message).await;
            }
            Opcode::Frame => self.dispatch(&frame).await,
            Opcode::Handshake | Opcode::Pong => {}
        }
    }

    // === Dispatch ===

    async fn dispatch(&mut self, frame: &Frame) {
        let payload = match frame.json_payload() {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("[Dispatch] Dropped frame: {e}");
                return;
            }
        };

        let event = match decode_event(&payload) {
            Ok(Some(event)) => event,
            Ok(None) => {
                log::trace!("[Dispatch] No event in payload (cmd={})", payload["cmd"]);
                return;
            }
            Err(e) => {
                log::warn!("[Dispatch] Dropped event: {e}");
                return;
            }
        };

        log::debug!("[Dispatch] {:?}", event.kind());
        self.notify(&event);

        if matches!(event, Event::Ready) {
            self.start_presence().await;
        }
    }

    fn notify(&mut self, event: &Event) {
        let Some(commands) = self.handle.upgrade() else {
            return;
        };
        let client = Client {
            commands,
            state: self.state.subscribe(),
            app_id: Arc::clone(&self.settings.app_id),
        };
        self.observers.notify(&client, event);
    }

    // === Presence Scheduler ===

    async fn start_presence(&mut self) {
        if self.presence_timer.is_some() {
            return;
        }
        log::debug!(
            "[Presence] Scheduler armed every {:?}",
            self.settings.presence_interval
        );
        self.presence_timer = Some(interval_after(self.settings.presence_interval));
        self.flush_presence().await;
    }

    /// Send the pending presence, if any. The slot is cleared either way.
    async fn flush_presence(&mut self) {
        let Some(presence) = self.pending.take() else {
            return;
        };
        let frame = protocol::set_activity(self.settings.pid, &presence);
        if self.send(&frame).await {
            log::debug!("[Presence] Activity sent");
        }
    }

    // === Join replies ===

    async fn send_reply(&mut self, user_id: &str, reply: JoinReply) {
        let frame = protocol::join_reply(user_id, reply);
        if self.send(&frame).await {
            log::debug!("[Engine] {} for user {user_id}", reply.command());
        }
    }

    /// Write one frame. Failures are logged; a dead transport is picked up
    /// by the next Read Loop tick.
    async fn send(&mut self, frame: &Frame) -> bool {
        let Some(link) = self.link.as_mut() else {
            log::warn!("[Engine] Not connected, dropping {:?} frame", frame.opcode);
            return false;
        };

        match link.transport.write_frame(frame).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[Ipc] Write failed: {e}");
                false
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            log::debug!("[Engine] {previous:?} -> {state:?}");
        }
    }
}

/// Try each candidate address in order, stopping at the first that accepts.
async fn sweep(connector: &dyn Connector) -> Option<Transport> {
    for index in 0..ADDRESS_CANDIDATES {
        match connector.connect(index).await {
            Ok(stream) => {
                log::info!("[Ipc] Connected to candidate {index}");
                return Some(Transport::new(stream, index));
            }
            Err(e) => log::trace!("[Ipc] Candidate {index} unavailable: {e}"),
        }
    }
    None
}

/// Repeating timer whose first tick is one full period away.
fn interval_after(period: Duration) -> Interval {
    // interval_at panics on a zero period
    let period = period.max(Duration::from_millis(1));
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Next tick of an optional timer; never resolves while the timer is off.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_after_skips_immediate_tick() {
        let start = Instant::now();
        let mut interval = interval_after(Duration::from_secs(15));
        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_after_zero_period_does_not_panic() {
        let mut interval = interval_after(Duration::ZERO);
        interval.tick().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_tick_pending_without_timer() {
        let mut timer = None;
        let result = time::timeout(Duration::from_secs(60), next_tick(&mut timer)).await;
        assert!(result.is_err());
    }
}
