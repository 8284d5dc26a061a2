//! Session management
//!
//! Bridges the shell and the connected clients. Shell output is drained and
//! fed to the terminal once per tick; each connection then gets its own
//! incremental update frame and a periodic heartbeat.

use std::io;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::pty::{PtyError, PtyEvent, ShellIo, ShellLauncher};
use super::term::{CursorShape, Terminal};
use crate::config::Config;
use crate::protocol::frame::{self, ScreenOptions, HEARTBEAT};
use crate::protocol::{ClientMessage, DiffTracker};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Failed to send frame: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Pty(#[from] PtyError),

    #[error("Connection limit of {0} reached")]
    TooManyConnections(usize),
}

/// Outgoing side of one client connection.
pub trait Transport: Send {
    /// Whether the connection can take a frame right now.
    fn is_open(&self) -> bool;

    fn send(&mut self, frame: &str) -> Result<(), TransportError>;
}

pub type ConnectionId = u64;

struct Connection {
    id: ConnectionId,
    transport: Box<dyn Transport>,
    tracker: DiffTracker,
    next_heartbeat: Instant,
}

/// Session events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Shell output was fed to the terminal
    Output,
    /// The shell ended
    Exited(String),
    /// The shell was started again
    Restarted,
    TitleChanged(String),
    Bell,
}

/// A shell session
pub struct Session {
    terminal: Terminal,
    config: Config,
    options: ScreenOptions,
    launcher: Box<dyn ShellLauncher>,
    shell: Option<Box<dyn ShellIo>>,
    output_rx: Option<Receiver<PtyEvent>>,
    exited: bool,
    restarted: bool,
    connections: Vec<Connection>,
    next_id: ConnectionId,
    last_title: String,
    last_bell: u64,
}

impl Session {
    pub fn new(config: &Config, launcher: Box<dyn ShellLauncher>) -> Self {
        let screen = &config.screen;
        let terminal = Terminal::configured(
            screen.width,
            screen.height,
            CursorShape::from_decscusr(screen.cursor_shape),
            screen.crlf,
        );

        Self {
            terminal,
            config: config.clone(),
            options: ScreenOptions::from_config(config),
            launcher,
            shell: None,
            output_rx: None,
            exited: false,
            restarted: false,
            connections: Vec::new(),
            next_id: 1,
            last_title: String::new(),
            last_bell: 0,
        }
    }

    /// Start the shell
    pub fn start(&mut self) -> Result<(), PtyError> {
        let handle = self
            .launcher
            .launch(self.terminal.width(), self.terminal.height())?;
        self.shell = Some(handle.io);
        self.output_rx = Some(handle.events);
        self.exited = false;
        Ok(())
    }

    /// Check if the shell is running
    pub fn is_running(&self) -> bool {
        self.shell.is_some()
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &ScreenOptions {
        &self.options
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Register a client. It immediately gets the legacy title frame; the
    /// next tick sends it a full update.
    pub fn add_connection(
        &mut self,
        mut transport: Box<dyn Transport>,
        now: Instant,
    ) -> Result<ConnectionId, SessionError> {
        let limit = self.config.session.max_connections;
        if self.connections.len() >= limit {
            tracing::warn!("Rejecting connection: limit of {} reached", limit);
            return Err(SessionError::TooManyConnections(limit));
        }

        let id = self.next_id;
        self.next_id += 1;

        let title = frame::title_frame(
            self.options.display_title(self.terminal.state()),
            &self.options.button_labels,
        );
        if let Err(e) = transport.send(&title) {
            tracing::debug!("Connection {}: title frame dropped: {}", id, e);
        }

        self.connections.push(Connection {
            id,
            transport,
            tracker: DiffTracker::new(),
            next_heartbeat: now + self.heartbeat_interval(),
        });
        tracing::info!("Connection {} added", id);
        Ok(id)
    }

    /// Drop a client together with its tracker and heartbeat deadline.
    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|conn| conn.id != id);
        let removed = self.connections.len() != before;
        if removed {
            tracing::info!("Connection {} removed", id);
        }
        removed
    }

    /// Handle one message from a client.
    pub fn handle_message(&mut self, message: &str) -> Result<(), PtyError> {
        let message = match ClientMessage::parse(message) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Ignoring client message: {}", e);
                return Ok(());
            }
        };

        match message {
            ClientMessage::Input(text) => self.inject_input(text.as_bytes()),
            ClientMessage::Button(index) => self.press_button(index),
            ClientMessage::Mouse(event) => {
                if !self.terminal.state().modes.mouse_tracking {
                    return Ok(());
                }
                match event.to_report() {
                    Some(report) => self.inject_input(&report),
                    None => Ok(()),
                }
            }
        }
    }

    /// Forward user input to the shell. After the shell has exited, input
    /// restarts it instead (when configured to).
    pub fn inject_input(&mut self, bytes: &[u8]) -> Result<(), PtyError> {
        if self.exited && self.config.session.restart_on_exit {
            self.restart()?;
            return Ok(());
        }

        match self.shell.as_mut() {
            Some(shell) => shell.write_input(bytes),
            None => Err(PtyError::NotRunning),
        }
    }

    /// Send the configured message of a button to the shell and notify
    /// every client.
    pub fn press_button(&mut self, index: u32) -> Result<(), PtyError> {
        let notification = frame::button_frame(index);
        for conn in self.connections.iter_mut().filter(|c| c.transport.is_open()) {
            if let Err(e) = conn.transport.send(&notification) {
                tracing::debug!("Connection {}: button frame dropped: {}", conn.id, e);
            }
        }

        match self.config.buttons.message_bytes(index) {
            Some(bytes) => self.inject_input(&bytes),
            None => {
                tracing::debug!("Button {} has no message", index);
                Ok(())
            }
        }
    }

    /// Change options at runtime. Every client is re-sent the screen and
    /// static options on its next update.
    pub fn update_options(&mut self, update: impl FnOnce(&mut Config)) {
        update(&mut self.config);
        let revision = self.options.revision + 1;
        self.options = ScreenOptions::from_config(&self.config);
        self.options.revision = revision;
        tracing::info!("Options updated (revision {})", revision);
    }

    /// Run one tick: feed pending shell output, then send updates and
    /// heartbeats.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if std::mem::take(&mut self.restarted) {
            events.push(SessionEvent::Restarted);
        }

        let (data, eof) = self.drain_output();
        if !data.is_empty() {
            self.terminal.feed(&data);
            events.push(SessionEvent::Output);
        }
        if eof {
            events.push(self.handle_exit());
        }

        let state = self.terminal.state();
        if state.title() != self.last_title {
            self.last_title = state.title().to_string();
            events.push(SessionEvent::TitleChanged(self.last_title.clone()));
        }
        if state.bell_count() != self.last_bell {
            self.last_bell = state.bell_count();
            events.push(SessionEvent::Bell);
        }

        let heartbeat = self.heartbeat_interval();
        for conn in &mut self.connections {
            if !conn.transport.is_open() {
                // Whatever was missed is resent in full once it reopens
                conn.tracker.reset();
                continue;
            }

            if let Some(update) = conn.tracker.poll(state, &self.options) {
                if let Err(e) = conn.transport.send(&update) {
                    tracing::debug!("Connection {}: update dropped: {}", conn.id, e);
                    conn.tracker.reset();
                }
            }

            if now >= conn.next_heartbeat {
                if let Err(e) = conn.transport.send(HEARTBEAT) {
                    tracing::debug!("Connection {}: heartbeat dropped: {}", conn.id, e);
                }
                conn.next_heartbeat = now + heartbeat;
            }
        }

        events
    }

    /// Concatenate every pending chunk. Returns the bytes and whether the
    /// shell's output has ended.
    fn drain_output(&mut self) -> (Vec<u8>, bool) {
        let mut data = Vec::new();
        let Some(rx) = &self.output_rx else {
            return (data, false);
        };

        loop {
            match rx.try_recv() {
                Ok(PtyEvent::Output(chunk)) => data.extend_from_slice(&chunk),
                Ok(PtyEvent::Eof) | Err(TryRecvError::Disconnected) => return (data, true),
                Err(TryRecvError::Empty) => return (data, false),
            }
        }
    }

    fn handle_exit(&mut self) -> SessionEvent {
        self.output_rx = None;
        let status = match self.shell.take() {
            Some(mut shell) => shell.wait_exit(),
            None => "unknown".to_string(),
        };
        self.exited = true;
        tracing::info!("Shell exited ({})", status);

        let mut message = format!("\x1b[0;41m\x1b[2K\x1b[GExited ({})\x1b[0m", status);
        if self.config.session.restart_on_exit {
            message.push_str("\r\nPress return to restart");
        }
        message.push_str("\x1b[?25l");
        self.terminal.feed(message.as_bytes());

        SessionEvent::Exited(status)
    }

    fn restart(&mut self) -> Result<(), PtyError> {
        self.terminal.feed(b"\x1b[?25h\r\n");
        self.start()?;
        self.restarted = true;
        tracing::info!("Shell restarted");
        Ok(())
    }

    fn heartbeat_interval(&self) -> Duration {
        self.config.session.heartbeat_interval()
    }

    /// Whether the last tick saw the shell exit and no restart happened yet.
    pub fn has_exited(&self) -> bool {
        self.exited
    }
}
