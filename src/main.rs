//! espterm-host - headless terminal emulator host
//!
//! Runs a shell in a pseudo terminal, emulates the screen, and streams
//! diff-encoded screen updates to a thin client.
//!
//! # Bridge mode (default)
//!
//! Client messages are read from stdin, one per line (`s<text>`,
//! `b<button>`, `p`/`r`/`m` mouse events). Newlines and backslashes inside
//! a message are escaped as `\n` and `\\`. Frames are written to stdout,
//! each terminated by a NUL byte.
//!
//! # Dump mode
//!
//! ```text
//! espterm-host --dump capture.log     # replay a byte capture, print the screen
//! some-program | espterm-host --dump  # same, from stdin
//! ```

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use espterm_host::config::{self, Config};
use espterm_host::core::pty::PtyLauncher;
use espterm_host::core::session::{Session, SessionEvent, Transport, TransportError};
use espterm_host::core::term::{CursorShape, Terminal};
use espterm_host::protocol::input::read_message;
use espterm_host::ui::{DebugRenderer, Renderer};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    log: Option<PathBuf>,
    debug: bool,
    shell: Option<String>,
    /// `Some(None)` dumps stdin
    dump: Option<Option<PathBuf>>,
    plain: bool,
}

fn print_help() {
    eprintln!("espterm-host {} - headless terminal emulator host", VERSION);
    eprintln!();
    eprintln!("Usage: espterm-host [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>   Configuration file (default: ~/.espterm/config.toml)");
    eprintln!("  -s, --shell <CMD>     Shell to run (overrides the configuration)");
    eprintln!("      --log <PATH>      Log file (default: ~/.espterm/espterm.log)");
    eprintln!("  -d, --debug           Debug logging and diagnostic frames");
    eprintln!("      --dump [PATH]     Feed a byte capture (or stdin) and print the screen");
    eprintln!("      --plain           With --dump, print plain text instead of colors");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("RUST_LOG overrides the log level.");
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut parsed = Args::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                eprintln!("espterm-host {}", VERSION);
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    bail!("Missing config path");
                };
                parsed.config = Some(PathBuf::from(path));
            }
            "-s" | "--shell" => {
                i += 1;
                let Some(shell) = args.get(i) else {
                    bail!("Missing shell argument");
                };
                parsed.shell = Some(shell.clone());
            }
            "--log" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    bail!("Missing log path");
                };
                parsed.log = Some(PathBuf::from(path));
            }
            "-d" | "--debug" => parsed.debug = true,
            "--plain" => parsed.plain = true,
            "--dump" => {
                // Optional path argument
                match args.get(i + 1) {
                    Some(next) if !next.starts_with('-') => {
                        parsed.dump = Some(Some(PathBuf::from(next)));
                        i += 1;
                    }
                    _ => parsed.dump = Some(None),
                }
            }
            arg => bail!("Unknown argument: {}. Use -h for help.", arg),
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to a file; stdout carries frames.
fn init_logging(args: &Args) {
    let log_path = args.log.clone().unwrap_or_else(|| {
        config::config_dir()
            .map(|dir| dir.join("espterm.log"))
            .unwrap_or_else(|| PathBuf::from("espterm.log"))
    });

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let level = if args.debug { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(shell) = &args.shell {
        config.session.shell = shell.clone();
    }
    if args.debug {
        config.session.debug = true;
    }
    Ok(config)
}

/// Frames on stdout, NUL terminated
struct StdoutTransport {
    out: io::Stdout,
    closed: bool,
}

impl Transport for StdoutTransport {
    fn is_open(&self) -> bool {
        !self.closed
    }

    fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let mut out = self.out.lock();
        let result = out
            .write_all(frame.as_bytes())
            .and_then(|_| out.write_all(b"\0"))
            .and_then(|_| out.flush());
        if let Err(e) = result {
            self.closed = true;
            return Err(e.into());
        }
        Ok(())
    }
}

fn run_bridge(config: &Config) -> anyhow::Result<()> {
    let mut session = Session::new(config, Box::new(PtyLauncher::from_config(&config.session)));
    session
        .start()
        .with_context(|| format!("Failed to start {}", config.session.shell))?;

    let transport = StdoutTransport {
        out: io::stdout(),
        closed: false,
    };
    session.add_connection(Box::new(transport), Instant::now())?;

    // Client messages
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        loop {
            match read_message(&mut stdin) {
                Ok(Some(message)) => {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    let tick = config.session.tick_interval();
    loop {
        loop {
            match rx.try_recv() {
                Ok(message) => {
                    if let Err(e) = session.handle_message(&message) {
                        error!("Input dropped: {}", e);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Client input closed, shutting down");
                    return Ok(());
                }
            }
        }

        for event in session.tick(Instant::now()) {
            match event {
                SessionEvent::Exited(status) => {
                    info!("Shell exited: {}", status);
                    if !config.session.restart_on_exit {
                        // One last tick so the client sees the exit message
                        session.tick(Instant::now());
                        return Ok(());
                    }
                }
                SessionEvent::TitleChanged(title) => info!("Title: {}", title),
                _ => {}
            }
        }

        thread::sleep(tick);
    }
}

fn run_dump(config: &Config, path: Option<&PathBuf>, plain: bool) -> anyhow::Result<()> {
    let bytes = match path {
        Some(path) => fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            bytes
        }
    };

    let screen = &config.screen;
    let mut terminal = Terminal::configured(
        screen.width,
        screen.height,
        CursorShape::from_decscusr(screen.cursor_shape),
        screen.crlf,
    );
    terminal.feed(&bytes);
    info!("Dumped {} bytes", bytes.len());

    let mut stdout = io::stdout();
    if plain {
        stdout.write_all(DebugRenderer::render(terminal.state()).as_bytes())?;
        stdout.flush()?;
    } else {
        Renderer::render(&mut stdout, terminal.state())?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    init_logging(&args);
    info!("espterm-host {} starting", VERSION);

    let config = load_config(&args)?;

    let result = match &args.dump {
        Some(path) => run_dump(&config, path.as_ref(), args.plain),
        None => run_bridge(&config),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
