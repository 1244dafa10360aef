//! X11 Async Event Stream
//!
//! Readiness of the X connection for the tokio main loop. A blocking task
//! polls the socket with mio and wakes the loop, which then drains events
//! through the screen's connection.

use anyhow::{Context, Result};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// Wakes the main loop when the X socket becomes readable
pub struct X11EventStream {
    notify: Arc<Notify>,
    /// Dropping this stops the polling task
    _stop: oneshot::Receiver<()>,
    _conn: Arc<RustConnection>,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 fd with mio")?;

        tokio::task::spawn_blocking(move || {
            let mut events = mio::Events::with_capacity(1);
            let timeout = Duration::from_millis(100);
            while !stop_tx.is_closed() {
                if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                    tracing::warn!("X11 socket poll failed: {:?}", err);
                    continue;
                }
                if events.iter().any(|event| event.token() == X11_TOKEN) {
                    task_notify.notify_one();
                }
            }
            tracing::debug!("X11 socket polling stopped");
        });

        Ok(Self {
            notify,
            _stop: stop_rx,
            _conn: conn,
        })
    }

    /// Wait until the X socket has data
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }
}
