use std::cell::Cell;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;
use tracing::{debug, info, warn};
use trayd::actor::broadcast::{BroadcastEvent, BroadcastReceiver};
use trayd::actor::config_watcher::ConfigWatcher;
use trayd::actor::reactor::{self, Collaborators, Event, Reactor};
use trayd::common::config::{Config, config_file};
use trayd::common::log;
use trayd::sys::geometry::{Point, Rect};
use trayd::sys::pointer::SharedPointer;
use trayd::sys::surface::{SimulatedSurface, SurfaceKind, VisualSurface};
use trayd::sys::timer::{IdleClock, TokioTimers};

const SCREEN_WIDTH: f64 = 1920.0;
const SCREEN_HEIGHT: f64 = 1080.0;

#[derive(Parser)]
struct Cli {
    /// Disable animations.
    #[arg(long)]
    no_animate: bool,

    /// Check whether the config file is valid without starting.
    #[arg(long)]
    validate: bool,

    /// Record reactor events to the specified file path. Overwrites the file if
    /// exists.
    #[arg(long)]
    record: Option<PathBuf>,

    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a file written with --record back through a headless reactor and
    /// print what it broadcasts.
    Replay { file: PathBuf },
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();

    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: We are single threaded at this point.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    log::init_logging();
    install_panic_hook();

    if let Some(Commands::Replay { file }) = &opt.command {
        if let Err(e) = reactor::replay(file, |event| print_broadcast(&event)) {
            eprintln!("replay failed: {e:#}");
            process::exit(1);
        }
        return;
    }

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let mut config = match Config::read_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", config_path.display());
            process::exit(1);
        }
    };

    if opt.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
        } else {
            for issue in issues {
                eprintln!("{}", issue);
            }
            process::exit(1);
        }
        return;
    }
    config.settings.animate &= !opt.no_animate;

    let record = match reactor::Record::new(opt.record.as_deref()) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start the runtime: {e}");
            process::exit(1);
        }
    };
    LocalSet::new().block_on(&runtime, run(config, config_path, record));
}

/// Runs until stdin closes or the process is interrupted.
async fn run(config: Config, config_path: PathBuf, record: reactor::Record) {
    let (events_tx, events_rx) = trayd::actor::channel();
    let (broadcast_tx, broadcast_rx) = trayd::actor::channel();

    let surface = |kind, frame| {
        let events_tx = events_tx.clone();
        SimulatedSurface::new(kind, frame, config.settings.animation_fps, move |token, outcome| {
            events_tx.send(Event::TransitionFinished(token, outcome))
        })
    };
    let banner = surface(
        SurfaceKind::NotificationBanner,
        Rect::new((SCREEN_WIDTH - 400.0) / 2.0, SCREEN_HEIGHT, 400.0, 100.0),
    );
    let tray = surface(SurfaceKind::TrayShelf, Rect::new(0.0, SCREEN_HEIGHT, SCREEN_WIDTH, 300.0));
    let popup = surface(
        SurfaceKind::SourcePopup,
        Rect::new((SCREEN_WIDTH - 360.0) / 2.0, SCREEN_HEIGHT - 300.0, 360.0, 240.0),
    );
    let dim = surface(SurfaceKind::DesktopDim, Rect::new(0.0, 0.0, SCREEN_WIDTH, SCREEN_HEIGHT));

    let idle = IdleClock::new({
        let events_tx = events_tx.clone();
        move || events_tx.send(Event::UserBecameActive)
    });
    let timers = TokioTimers::new(idle.clone(), {
        let events_tx = events_tx.clone();
        move |handle| events_tx.send(Event::TimerFired(handle))
    });
    let pointer = SharedPointer::default();

    let collaborators = Collaborators {
        banner: Box::new(banner.clone()),
        tray: Box::new(tray),
        popup: Box::new(popup),
        dim: Box::new(dim),
        timers: Box::new(timers),
        pointer: Box::new(pointer.clone()),
    };
    let reactor = Reactor::new(config.clone(), collaborators, broadcast_tx, record);

    if let Err(e) = ConfigWatcher::new(events_tx.clone(), &config, config_path).spawn() {
        warn!("not watching the config file: {e}");
    }

    let (quit_tx, mut quit_rx) = trayd::actor::channel::<()>();
    if let Err(e) = ctrlc::set_handler(move || quit_tx.send(())) {
        warn!("error setting Ctrl+C handler: {e}");
    }

    let input = Input { events_tx, pointer, idle, banner, hovered: Cell::new(false) };
    tokio::select! {
        _ = reactor.run(events_rx) => {}
        _ = input.run() => info!("input closed, exiting"),
        _ = print_broadcasts(broadcast_rx) => {}
        _ = quit_rx.recv() => info!("interrupted, exiting"),
    }
}

/// Reads one RON [`Event`] per line from stdin. Pointer motion also drives
/// idle tracking and banner hover, which a compositor would report itself.
struct Input {
    events_tx: reactor::Sender,
    pointer: SharedPointer,
    idle: IdleClock,
    banner: SimulatedSurface,
    hovered: Cell<bool>,
}

impl Input {
    async fn run(&self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => self.on_line(&line),
                Ok(None) => return,
                Err(e) => {
                    warn!("reading stdin: {e}");
                    return;
                }
            }
        }
    }

    fn on_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return;
        }
        let event: Event = match ron::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("ignoring malformed event: {e}");
                return;
            }
        };
        let moved_to = match &event {
            Event::PointerMoved(point) => Some(*point),
            _ => None,
        };
        self.events_tx.send(event);
        if let Some(point) = moved_to {
            self.pointer_moved(point);
        }
    }

    fn pointer_moved(&self, point: Point) {
        self.pointer.set(point);
        self.idle.note_input();
        let hovered = self.banner.contains(point);
        if self.hovered.replace(hovered) != hovered {
            debug!(hovered, "banner hover changed");
            self.events_tx.send(Event::BannerHoverChanged(hovered));
        }
    }
}

async fn print_broadcasts(mut rx: BroadcastReceiver) {
    while let Some((_span, event)) = rx.recv().await {
        print_broadcast(&event);
    }
}

fn print_broadcast(event: &BroadcastEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("could not serialize {event:?}: {e}"),
    }
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of unwinding out of a half-updated reactor.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
