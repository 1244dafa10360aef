//! Child processes
//!
//! Commands run from key bindings, relaunched applications and the
//! background helper. Children are awaited on tokio tasks; their exits come
//! back to the main loop over a channel and `reap` fires the one-shot
//! handler registered for the pid.

use std::collections::HashMap;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use nextwm_ipc::helper::{HelperKind, HelperMessage};

use crate::wm::error::WmError;
use crate::wm::screen::Screen;
use crate::wm::xconn::Xid;

/// Exit status code the shell uses for "command not found"
const COMMAND_NOT_FOUND: i32 = 127;

/// Runs once when the child with its pid exits
pub type DeathHandler = Box<dyn FnOnce(&mut Screen, ExitStatus)>;

/// A child that exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub pid: u32,
    pub status: ExitStatus,
}

struct Helper {
    pid: u32,
    /// Frames for the writer task owning the helper's stdin
    input: mpsc::UnboundedSender<Vec<u8>>,
}

/// Registered death handlers and the running helper
pub struct ProcessRegistry {
    handlers: HashMap<u32, DeathHandler>,
    exits_tx: mpsc::UnboundedSender<ChildExit>,
    exits_rx: Option<mpsc::UnboundedReceiver<ChildExit>>,
    helper: Option<Helper>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        Self {
            handlers: HashMap::new(),
            exits_tx,
            exits_rx: Some(exits_rx),
            helper: None,
        }
    }

    /// Receiver of child exits, for the main loop (once)
    pub fn take_exits(&mut self) -> Option<mpsc::UnboundedReceiver<ChildExit>> {
        self.exits_rx.take()
    }

    /// Run `handler` once when `pid` exits
    pub fn add_death_handler(&mut self, pid: u32, handler: impl FnOnce(&mut Screen, ExitStatus) + 'static) {
        self.handlers.insert(pid, Box::new(handler));
    }

    pub fn has_handler(&self, pid: u32) -> bool {
        self.handlers.contains_key(&pid)
    }

    pub fn helper_pid(&self) -> Option<u32> {
        self.helper.as_ref().map(|helper| helper.pid)
    }

    /// Start `command` and await it in the background
    fn spawn(&self, mut command: Command) -> io::Result<(u32, Option<tokio::process::ChildStdin>)> {
        let runtime = tokio::runtime::Handle::try_current().map_err(io::Error::other)?;
        let _guard = runtime.enter();
        // SAFETY: setsid is async-signal-safe and touches no parent state
        unsafe {
            command.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
        let mut child: Child = command.spawn()?;
        let pid = child.id().ok_or_else(|| io::Error::other("child exited before its pid was read"))?;
        let stdin = child.stdin.take();
        let exits = self.exits_tx.clone();
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    let _ = exits.send(ChildExit { pid, status });
                }
                Err(e) => warn!("Waiting for child {} failed: {}", pid, e),
            }
        });
        Ok((pid, stdin))
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    /// Fire and forget the death handler of `pid`; unknown pids are ignored
    pub fn reap(&mut self, pid: u32, status: ExitStatus) {
        match self.processes.handlers.remove(&pid) {
            Some(handler) => {
                debug!("Child {} exited with {}", pid, status);
                handler(self, status);
            }
            None => debug!("Untracked child {} exited", pid),
        }
    }

    /// Run a command line through `/bin/sh -c`
    ///
    /// Exit status 127 from the shell is reported as an alert.
    pub fn execute_shell_command(&mut self, command: &str) -> Result<u32, WmError> {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        let pid = match self.processes.spawn(cmd) {
            Ok((pid, _)) => pid,
            Err(source) => {
                self.notifications
                    .alert("Run Error", format!("Could not execute command: {}", command));
                return Err(WmError::Spawn {
                    command: command.to_string(),
                    source,
                });
            }
        };
        info!("Started {:?} as {}", command, pid);

        let command = command.to_string();
        self.processes.add_death_handler(pid, move |screen, status| {
            if status.code() == Some(COMMAND_NOT_FOUND) {
                screen
                    .notifications
                    .alert("Run Error", format!("Could not execute command: {}", command));
            }
        });
        Ok(pid)
    }

    /// Start another instance of the application owning `window`
    pub fn relaunch_window(&mut self, window: Xid) -> Result<u32, WmError> {
        let main = self
            .windows
            .get(&window)
            .and_then(|win| win.main_window)
            .unwrap_or(window);
        let argv = self
            .windows
            .get(&main)
            .and_then(|win| win.command.clone())
            .or_else(|| self.apps.get(main).and_then(|app| app.command.clone()))
            .or_else(|| self.windows.get(&window).and_then(|win| win.command.clone()));
        let Some((program, args)) = argv.as_deref().and_then(|argv| argv.split_first()) else {
            self.notifications.alert(
                "Error",
                "Program was started from a command line that cannot be determined.",
            );
            return Err(WmError::NoCommand(window));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        let (pid, _) = match self.processes.spawn(cmd) {
            Ok(spawned) => spawned,
            Err(source) => {
                let command = argv.as_deref().unwrap_or_default().join(" ");
                self.notifications
                    .alert("Run Error", format!("Could not execute command: {}", command));
                return Err(WmError::Spawn { command, source });
            }
        };
        info!("Relaunched {:?} as {}", program, pid);
        Ok(pid)
    }

    /// Start the background helper named in the config, if any
    pub fn start_helper(&mut self) {
        if self.processes.helper.is_some() {
            return;
        }
        let Some(command) = self.config.helper.command.clone() else {
            return;
        };
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(&command).stdin(Stdio::piped());
        let (pid, stdin) = match self.processes.spawn(cmd) {
            Ok((pid, Some(stdin))) => (pid, stdin),
            Ok((pid, None)) => {
                warn!("Helper {} started without a stdin pipe", pid);
                return;
            }
            Err(e) => {
                warn!("Could not start helper {:?}: {}", command, e);
                return;
            }
        };

        let (input, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(frame) = frames.recv().await {
                if let Err(e) = stdin.write_all(&frame).await {
                    warn!("Writing to helper failed: {}", e);
                    break;
                }
            }
        });

        self.processes.helper = Some(Helper { pid, input });
        self.processes.add_death_handler(pid, move |screen, status| {
            warn!("Background helper exited with {}", status);
            if screen.processes.helper_pid() == Some(pid) {
                screen.processes.helper = None;
            }
        });
        info!("Background helper started as {}", pid);
    }

    /// Ask the helper to exit and close its input
    pub fn stop_helper(&mut self) {
        if self.processes.helper.is_none() {
            return;
        }
        self.send_helper_message(HelperMessage::new(HelperKind::Kill, None, Vec::new()));
        self.processes.helper = None;
    }

    /// Queue a message for the helper; skipped when none runs
    pub fn send_helper_message(&mut self, message: HelperMessage) {
        let Some(helper) = self.processes.helper.as_ref() else {
            return;
        };
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Not sending helper message: {}", e);
                return;
            }
        };
        if helper.input.send(frame).is_err() {
            warn!("Background helper input is closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::notify::Notification;
    use crate::wm::testing::{FakeConn, screen_with, screen_with_config, test_config};
    use std::os::unix::process::ExitStatusExt;

    fn alerts(screen: &mut Screen) -> Vec<(String, String)> {
        screen
            .notifications
            .drain()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Alert { title, message } => Some((title, message)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_reap_fires_handler_once() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        screen.processes.add_death_handler(42, |screen, status| {
            screen.notifications.alert("exit", format!("{:?}", status.code()));
        });
        screen.reap(42, ExitStatus::from_raw(3 << 8));
        screen.reap(42, ExitStatus::from_raw(3 << 8));
        screen.reap(7, ExitStatus::from_raw(0));
        assert_eq!(alerts(&mut screen), vec![("exit".to_string(), "Some(3)".to_string())]);
        assert!(!screen.processes.has_handler(42));
    }

    #[test]
    fn test_relaunch_without_command_alerts() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        screen.manage_window(a).unwrap();
        assert!(matches!(screen.relaunch_window(a), Err(WmError::NoCommand(w)) if w == a));
        assert_eq!(alerts(&mut screen).len(), 1);
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        assert!(matches!(screen.execute_shell_command("true"), Err(WmError::Spawn { .. })));
        assert_eq!(alerts(&mut screen).len(), 1);
    }

    #[test]
    fn test_helper_messages_skipped_without_helper() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        screen.start_helper();
        assert!(screen.processes.helper_pid().is_none());
        screen.send_helper_message(HelperMessage::change_workspace(1));
        screen.stop_helper();
    }

    #[tokio::test]
    async fn test_missing_command_alerts_once() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        let mut exits = screen.processes.take_exits().unwrap();
        let pid = screen.execute_shell_command("exit 127").unwrap();

        let exit = exits.recv().await.unwrap();
        assert_eq!(exit.pid, pid);
        screen.reap(exit.pid, exit.status);
        screen.reap(exit.pid, exit.status);
        assert_eq!(
            alerts(&mut screen),
            vec![(
                "Run Error".to_string(),
                "Could not execute command: exit 127".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_successful_command_is_quiet() {
        let (mut screen, _fake) = screen_with(FakeConn::new());
        let mut exits = screen.processes.take_exits().unwrap();
        screen.execute_shell_command("true").unwrap();
        let exit = exits.recv().await.unwrap();
        assert!(exit.status.success());
        screen.reap(exit.pid, exit.status);
        assert!(alerts(&mut screen).is_empty());
    }

    #[tokio::test]
    async fn test_relaunch_uses_main_window_command() {
        let (mut screen, fake) = screen_with(FakeConn::new());
        let a = fake.add_client(0x100, "a");
        fake.set_property8(a, crate::wm::xconn::predefined::WM_COMMAND, b"true\0--flag\0");
        screen.manage_window(a).unwrap();
        let mut exits = screen.processes.take_exits().unwrap();
        let pid = screen.relaunch_window(a).unwrap();
        assert_eq!(exits.recv().await.unwrap().pid, pid);
    }

    #[tokio::test]
    async fn test_helper_lifecycle() {
        let mut config = test_config();
        config.helper.command = Some("cat > /dev/null".to_string());
        let (mut screen, _fake) = screen_with_config(FakeConn::new(), config);
        let mut exits = screen.processes.take_exits().unwrap();

        screen.start_helper();
        let pid = screen.processes.helper_pid().unwrap();
        screen.send_helper_message(HelperMessage::change_workspace(2));
        screen.stop_helper();
        assert!(screen.processes.helper_pid().is_none());

        let exit = exits.recv().await.unwrap();
        assert_eq!(exit.pid, pid);
        screen.reap(exit.pid, exit.status);
        assert!(!screen.processes.has_handler(pid));
    }
}
