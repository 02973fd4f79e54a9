//! turtle-console - operator console for the turtle fleet
//!
//! Connects to the backend's state socket, shows the roster, the head of the
//! notification queue and the connection status, and reads operator commands
//! from stdin, one per line:
//!
//! ```text
//! toggle <position>     enable/disable the turtle at a roster position
//! dismiss               dismiss the current notification
//! page <settings|refbox>
//! send <command>        send a referee command (e.g. kick_off_magenta)
//! connect / disconnect
//! quit
//! ```

use std::path::PathBuf;

use clap::Parser as ClapParser;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turtle_console::{
    config::{self, ConfigError, FleetConfig},
    endpoint::{Endpoint, EndpointError},
    error::{ParseError, SessionError},
    protocol::{Command, ProtocolError},
    render,
    session::{ActivePage, SessionController},
};

/// Operator console for the turtle fleet.
#[derive(ClapParser, Debug)]
#[command(name = "turtle-console", version, about, long_about = None)]
struct Cli {
    /// Origin of the page the console belongs to (http or https); the state
    /// socket is derived from it
    #[arg(long, env = "TURTLE_CONSOLE_ORIGIN")]
    origin: Option<String>,

    /// Fleet configuration file
    #[arg(long, env = "TURTLE_CONSOLE_CONFIG")]
    config: Option<PathBuf>,

    /// Page to show first
    #[arg(long, default_value = "settings")]
    page: String,

    /// Do not connect on startup
    #[arg(long)]
    no_connect: bool,
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an operator line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
enum InputError {
    #[error("invalid position: {0:?}")]
    InvalidPosition(String),

    #[error("unrecognized input: {0:?}")]
    Unrecognized(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// One operator line, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    Toggle(usize),
    Dismiss,
    Page(ActivePage),
    Send(Command),
    Connect,
    Disconnect,
    Show,
    Quit,
}

fn parse_intent(line: &str) -> Result<Option<Intent>, InputError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let intent = match (verb, arg) {
        ("toggle", Some(pos)) => Intent::Toggle(
            pos.parse()
                .map_err(|_| InputError::InvalidPosition(pos.to_string()))?,
        ),
        ("dismiss", None) => Intent::Dismiss,
        ("page", Some(page)) => Intent::Page(page.parse()?),
        ("send", Some(cmd)) => Intent::Send(cmd.parse()?),
        ("connect", None) => Intent::Connect,
        ("disconnect", None) => Intent::Disconnect,
        ("show", None) => Intent::Show,
        ("quit" | "exit", None) => Intent::Quit,
        _ => return Err(InputError::Unrecognized(line.trim().to_string())),
    };
    Ok(Some(intent))
}

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let fleet = FleetConfig::load_or_default(&config_path)?;
    let origin = fleet.resolve_origin(cli.origin.as_deref());
    let endpoint = Endpoint::from_page_origin(&origin)?;
    let page: ActivePage = cli.page.parse()?;

    let mut session = SessionController::new(fleet, endpoint)?;
    tracing::info!(
        endpoint = %session.endpoint(),
        secure = session.endpoint().is_secure(),
        config = %config_path.display(),
        "turtle-console starting"
    );

    session.change_active_page(page);
    if !cli.no_connect {
        session.start();
    }

    run(&mut session).await?;

    session.stop();
    tracing::info!("turtle-console exiting");
    Ok(())
}

/// The single control loop: operator lines and transport events are applied
/// one at a time, and every published snapshot is redrawn.
async fn run(session: &mut SessionController) -> Result<(), ConsoleError> {
    let mut snapshots = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("{}", render::screen(&session.snapshot()));

    loop {
        tokio::select! {
            event = session.next_event() => {
                session.handle_event(event);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_intent(&line) {
                    Ok(Some(Intent::Quit)) => break,
                    Ok(Some(intent)) => apply(session, intent)?,
                    Ok(None) => {}
                    Err(e) => eprintln!("turtle-console: {}", e),
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print!("{}", render::screen(&snapshot));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received Ctrl+C");
                break;
            }
        }
    }
    Ok(())
}

fn apply(session: &mut SessionController, intent: Intent) -> Result<(), ConsoleError> {
    match intent {
        Intent::Toggle(position) => {
            if let Err(e) = session.toggle_robot(position) {
                eprintln!("turtle-console: {}", e);
            }
        }
        Intent::Dismiss => session.dismiss_notification(),
        Intent::Page(page) => session.change_active_page(page),
        Intent::Send(command) => {
            session.send_command(command)?;
        }
        Intent::Connect => session.start(),
        Intent::Disconnect => session.stop(),
        Intent::Show => print!("{}", render::screen(&session.snapshot())),
        Intent::Quit => {}
    }
    Ok(())
}

/// Tracing goes to stderr; stdout is the operator display.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "turtle_console=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
