use chrono::{Local, Timelike, Utc};
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::NotificationHub;

/// Periodic wall-clock check that feeds the morning and evening reminders
/// into the hub. Stops on `stop()`, on drop, or once the hub is gone.
#[derive(Debug)]
pub struct ReminderTimer {
    handle: JoinHandle<()>,
}

impl ReminderTimer {
    pub fn spawn(hub: Weak<NotificationHub>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(hub) = hub.upgrade() else {
                    break;
                };
                let hour = Local::now().hour();
                let added = hub.fire_reminders(hour, Utc::now()).await;
                if added > 0 {
                    debug!(added, hour, "time-of-day reminders added");
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ReminderTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
