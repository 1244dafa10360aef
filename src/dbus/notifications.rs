//! Desktop notifications via org.freedesktop.Notifications
//!
//! Alerts the core raises (a command that could not be run, a relaunch
//! without a known command line) are shown as desktop notifications when
//! a notification daemon is on the bus, and logged otherwise.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, warn};
use zbus::{Connection, proxy};

/// How long an alert stays up, in milliseconds
const ALERT_TIMEOUT: i32 = 5000;

/// Proxy for org.freedesktop.Notifications
#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// Show a notification
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Shows alerts, or logs them when no daemon is reachable
#[derive(Clone, Default)]
pub struct AlertService {
    proxy: Option<NotificationsProxy<'static>>,
}

impl AlertService {
    pub async fn new(conn: &Connection) -> Result<Self> {
        let proxy = NotificationsProxy::new(conn).await?;
        Ok(Self { proxy: Some(proxy) })
    }

    /// Alerts go to the log only
    pub fn log_only() -> Self {
        Self::default()
    }

    pub async fn alert(&self, title: &str, message: &str) {
        let Some(proxy) = &self.proxy else {
            warn!("{}: {}", title, message);
            return;
        };
        match proxy
            .notify("NextWM", 0, "dialog-error", title, message, &[], HashMap::new(), ALERT_TIMEOUT)
            .await
        {
            Ok(id) => debug!("Alert shown as notification {}", id),
            Err(e) => warn!("{}: {} (notification failed: {})", title, message, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_only_alert_does_not_touch_the_bus() {
        let service = AlertService::log_only();
        assert!(service.proxy.is_none());
        service.alert("Run Error", "Could not execute command: nope").await;
    }
}
