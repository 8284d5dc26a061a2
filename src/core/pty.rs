//! Shell process inside a pseudo terminal.
//!
//! The PTY is opened with `portable-pty`. A reader thread forwards output
//! chunks over an `mpsc` channel so the session can drain them without
//! blocking.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;

use crate::config::SessionConfig;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open PTY: {0}")]
    Open(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Failed to clone PTY reader: {0}")]
    Reader(String),

    #[error("Failed to take PTY writer: {0}")]
    Writer(String),

    #[error("Failed to write to PTY: {0}")]
    Write(#[source] io::Error),

    #[error("Process is not running")]
    NotRunning,
}

pub type Result<T> = std::result::Result<T, PtyError>;

/// Messages from the reader thread
#[derive(Debug, PartialEq, Eq)]
pub enum PtyEvent {
    Output(Vec<u8>),
    /// The shell closed its side; no more output follows
    Eof,
}

/// The input side of a running shell.
pub trait ShellIo: Send {
    fn write_input(&mut self, bytes: &[u8]) -> Result<()>;

    /// Wait for the process to end and describe how it ended.
    fn wait_exit(&mut self) -> String;
}

/// A freshly started shell: its input side plus the output channel.
pub struct ShellHandle {
    pub io: Box<dyn ShellIo>,
    pub events: Receiver<PtyEvent>,
}

/// Starts shells. The session calls this once at start and again on restart.
pub trait ShellLauncher: Send {
    fn launch(&mut self, cols: u16, rows: u16) -> Result<ShellHandle>;
}

/// Launches the configured shell in a real PTY.
pub struct PtyLauncher {
    program: String,
    args: Vec<String>,
}

impl PtyLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.shell.clone(), config.args.clone())
    }
}

impl ShellLauncher for PtyLauncher {
    fn launch(&mut self, cols: u16, rows: u16) -> Result<ShellHandle> {
        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args(&self.args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let (pty, events) = Pty::spawn(cmd, cols, rows)?;
        Ok(ShellHandle {
            io: Box::new(pty),
            events,
        })
    }
}

/// A spawned shell attached to a PTY
pub struct Pty {
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    // Closing the master hangs up the shell
    _master: Box<dyn MasterPty + Send>,
    reader_thread: Option<JoinHandle<()>>,
}

impl Pty {
    /// Spawn `cmd` in a new PTY of the given size.
    pub fn spawn(mut cmd: CommandBuilder, cols: u16, rows: u16) -> Result<(Self, Receiver<PtyEvent>)> {
        cmd.env("TERM", "xterm-256color");
        cmd.env("TERM_PROGRAM", "ESPTerm");

        let pair = native_pty_system()
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(e.to_string()))?;
        // Only the child keeps the slave open, so the reader sees EOF on exit
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Reader(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Writer(e.to_string()))?;

        tracing::info!("Spawned shell (pid {:?}) in {}x{} PTY", child.process_id(), cols, rows);

        let (tx, rx) = mpsc::channel::<PtyEvent>();
        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(PtyEvent::Output(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // Linux reports EIO once the slave side is gone
                        tracing::debug!("PTY read ended: {}", e);
                        break;
                    }
                }
            }
            let _ = tx.send(PtyEvent::Eof);
        });

        Ok((
            Self {
                child,
                writer,
                _master: pair.master,
                reader_thread: Some(reader_thread),
            },
            rx,
        ))
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl ShellIo for Pty {
    fn write_input(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if !self.is_running() {
            return Err(PtyError::NotRunning);
        }
        self.writer.write_all(bytes).map_err(PtyError::Write)?;
        self.writer.flush().map_err(PtyError::Write)
    }

    fn wait_exit(&mut self) -> String {
        match self.child.wait() {
            Ok(status) => format!("exit status: {}", status.exit_code()),
            Err(e) => format!("wait failed: {}", e),
        }
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        if self.is_running() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(handle) = self.reader_thread.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}
