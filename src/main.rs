//! NextWM
//!
//! A WindowMaker-style X11 window manager: framed windows, miniwindows,
//! workspaces with a pager map and Alt+Tab cycling with a switch panel.

mod config;
mod dbus;
mod ipc;
mod shared;
mod wm;
mod x11_async;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dbus::AlertService;
use crate::ipc::IpcHandle;
use crate::wm::notify::Notification;
use crate::wm::{Screen, X11Conn};
use crate::x11_async::X11EventStream;

/// Timers (workspace name overlay, urgency bounce) are checked this often
const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Replace the running window manager
    #[arg(long)]
    replace: bool,

    /// Configuration file (default: ~/.config/nextwm/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// X display to manage (default: $DISPLAY)
    #[arg(long)]
    display: Option<String>,

    /// Start without the workspace clip
    #[arg(long)]
    no_clip: bool,

    /// Number of workspaces to create when no session is saved
    #[arg(long, value_name = "N")]
    workspaces: Option<usize>,

    /// Don't open the control socket
    #[arg(long)]
    no_ipc: bool,
}

impl Args {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if self.no_clip {
            config.workspaces.no_clip = true;
        }
        if let Some(count) = self.workspaces {
            config.workspaces.initial_count = count;
        }
        Ok(config)
    }
}

/// Hand queued notifications to socket peers and the desktop
fn dispatch_notifications(screen: &mut Screen, ipc: Option<&IpcHandle>, alerts: &AlertService) {
    for notification in screen.notifications.drain() {
        if let Notification::Alert { title, message } = &notification {
            let (alerts, title, message) = (alerts.clone(), title.clone(), message.clone());
            tokio::spawn(async move { alerts.alert(&title, &message).await });
        }
        if let Some(ipc) = ipc {
            ipc.broadcast(notification.to_event(&screen.workspaces));
        }
    }
}

async fn next_command(ipc: &mut Option<IpcHandle>) -> Option<nextwm_ipc::WmCommand> {
    match ipc {
        Some(handle) => handle.command_rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn alert_service() -> AlertService {
    let conn = match dbus::session().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Alerts will only be logged: {:#}", e);
            return AlertService::log_only();
        }
    };
    AlertService::new(&conn).await.unwrap_or_else(|e| {
        warn!("Alerts will only be logged: {:#}", e);
        AlertService::log_only()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "nextwm=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting NextWM (replace={})", args.replace);

    let config = args.load_config()?;
    let x11 = X11Conn::connect(args.display.as_deref(), args.replace)?;
    let stream = X11EventStream::new(x11.connection())?;
    let mut screen = Screen::new(Box::new(x11), config)?;
    let mut exits = screen
        .processes
        .take_exits()
        .context("Child exit channel already taken")?;

    let alerts = alert_service().await;
    let mut ipc = if args.no_ipc {
        None
    } else {
        match ipc::start(&nextwm_ipc::socket_path()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Control socket disabled: {:#}", e);
                None
            }
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    screen.start()?;
    info!("NextWM is managing {} windows", screen.windows.len());

    loop {
        screen.process_pending_events();
        if screen.flags.reconfigure {
            screen.flags.reconfigure = false;
            match args.load_config() {
                Ok(config) => screen.apply_config(config),
                Err(e) => warn!("Keeping the current configuration: {:#}", e),
            }
        }
        dispatch_notifications(&mut screen, ipc.as_ref(), &alerts);
        if let Err(e) = screen.conn.flush() {
            error!("X connection lost: {:#}", e);
            break;
        }

        tokio::select! {
            () = stream.wait_readable() => {}
            Some(exit) = exits.recv() => screen.reap(exit.pid, exit.status),
            Some(command) = next_command(&mut ipc) => ipc::apply_command(&mut screen, command),
            _ = tick.tick() => screen.tick(Instant::now()),
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                screen.flags.reconfigure = true;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    screen.shutdown();
    Ok(())
}
