use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use climate_core::{FanState, SettingsHandle};
use climate_store::FanStateStore;
use tracing::{error, info};

use crate::actuator::FanActuator;
use crate::error::Result;

/// State of the manual-override window at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideWindow {
    pub active: bool,
    /// End of the window opened by the latest override, if any.
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct FanController {
    store: FanStateStore,
    actuator: Arc<dyn FanActuator>,
    settings: SettingsHandle,
    /// Serializes read-previous + append so concurrent toggles chain.
    toggle_lock: Mutex<()>,
}

impl FanController {
    pub fn new(
        store: FanStateStore,
        actuator: Arc<dyn FanActuator>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            store,
            actuator,
            settings,
            toggle_lock: Mutex::new(()),
        }
    }

    /// Latest recorded state; `None` when the fan has never been switched.
    pub fn current_status(&self) -> Result<Option<FanState>> {
        Ok(self.store.latest()?)
    }

    /// Invert the current state as a manual override.
    ///
    /// The new entry is persisted before the hardware sync is started. The
    /// sync runs in the background and a failure there is only logged.
    pub fn toggle(&self) -> Result<FanState> {
        let next = {
            let _guard = self.toggle_lock.lock().unwrap_or_else(|p| p.into_inner());
            let previous = self.store.latest()?;

            let now = Utc::now().trunc_subsecs(6);
            let timestamp = match &previous {
                Some(prev) if prev.timestamp >= now => prev.timestamp + Duration::microseconds(1),
                _ => now,
            };
            let next = FanState {
                timestamp,
                running: !previous.map(|p| p.running).unwrap_or(false),
                override_at: Some(timestamp),
            };
            self.store.append(&next)?;
            next
        };

        info!(running = next.running, ts = %next.timestamp, "fan toggled manually");
        self.spawn_sync(next.running);
        Ok(next)
    }

    fn spawn_sync(&self, running: bool) {
        let actuator = Arc::clone(&self.actuator);
        tokio::spawn(async move {
            if let Err(e) = actuator.apply(running).await {
                error!(actuator = %actuator.name(), running, error = %e, "fan hardware sync failed");
            }
        });
    }

    /// Most recent `limit` transitions, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<FanState>> {
        Ok(self.store.history(limit)?)
    }

    /// Whether the latest override still holds at `now`, using the live
    /// override duration.
    pub fn override_window(&self, now: DateTime<Utc>) -> Result<OverrideWindow> {
        let duration = self.settings.current().fan_override_duration_seconds;
        let window = match self.store.latest()? {
            Some(state) => OverrideWindow {
                active: state.override_active(duration, now),
                expires_at: state.override_expires_at(duration),
            },
            None => OverrideWindow {
                active: false,
                expires_at: None,
            },
        };
        Ok(window)
    }

    /// `false` while a manual override is in effect.
    pub fn automatic_control_allowed(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(!self.override_window(now)?.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::LogActuator;
    use crate::error::FanError;
    use async_trait::async_trait;
    use climate_core::Settings;
    use rusqlite::Connection;
    use tokio::sync::mpsc;

    struct Recording(mpsc::UnboundedSender<bool>);

    #[async_trait]
    impl FanActuator for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn apply(&self, running: bool) -> Result<()> {
            let _ = self.0.send(running);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl FanActuator for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn apply(&self, _running: bool) -> Result<()> {
            Err(FanError::Actuator {
                actuator: "broken".to_string(),
                reason: "relay not responding".to_string(),
            })
        }
    }

    fn controller(actuator: Arc<dyn FanActuator>) -> (FanController, SettingsHandle) {
        let store = FanStateStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let settings = SettingsHandle::new(Settings::default());
        (FanController::new(store, actuator, settings.clone()), settings)
    }

    #[tokio::test]
    async fn empty_history_has_no_status() {
        let (fan, _) = controller(Arc::new(LogActuator));
        assert!(fan.current_status().unwrap().is_none());
        assert!(fan.automatic_control_allowed(Utc::now()).unwrap());
    }

    #[tokio::test]
    async fn toggles_alternate_starting_with_running() {
        let (fan, _) = controller(Arc::new(LogActuator));

        for k in 0..6 {
            let state = fan.toggle().unwrap();
            assert_eq!(state.running, k % 2 == 0);
            assert_eq!(state.override_at, Some(state.timestamp));
            assert_eq!(fan.current_status().unwrap(), Some(state));
        }

        let history = fan.history(100).unwrap();
        assert_eq!(history.len(), 6);
        // Newest first; strictly decreasing timestamps.
        for pair in history.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp);
            assert_ne!(pair[0].running, pair[1].running);
        }
        assert!(history.last().unwrap().running);
    }

    #[tokio::test]
    async fn hardware_receives_new_state() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (fan, _) = controller(Arc::new(Recording(tx)));

        fan.toggle().unwrap();
        assert_eq!(rx.recv().await, Some(true));
        fan.toggle().unwrap();
        assert_eq!(rx.recv().await, Some(false));
    }

    #[tokio::test]
    async fn sync_failure_keeps_recorded_state() {
        let (fan, _) = controller(Arc::new(Broken));
        let state = fan.toggle().unwrap();
        tokio::task::yield_now().await;
        assert_eq!(fan.current_status().unwrap(), Some(state));
    }

    #[tokio::test]
    async fn override_window_uses_live_duration() {
        let (fan, settings) = controller(Arc::new(LogActuator));
        let state = fan.toggle().unwrap();

        let soon = state.timestamp + Duration::minutes(10);
        assert!(!fan.automatic_control_allowed(soon).unwrap());
        let window = fan.override_window(soon).unwrap();
        assert_eq!(window.expires_at, Some(state.timestamp + Duration::hours(1)));

        settings.replace(Settings {
            fan_override_duration_seconds: 300,
            ..Settings::default()
        });
        assert!(fan.automatic_control_allowed(soon).unwrap());
    }
}
