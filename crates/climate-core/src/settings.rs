//! Process-wide live copy of the [`Settings`] record.
//!
//! The handle is cloned into every component that needs the current
//! settings. Updates replace the whole value at once, so a reader never
//! observes a half-updated record.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::types::Settings;

#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<Arc<Settings>>>,
}

impl SettingsHandle {
    pub fn new(initial: Settings) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Consistent snapshot of the current settings.
    pub fn current(&self) -> Arc<Settings> {
        self.tx.borrow().clone()
    }

    /// Atomically swap in a new record. Returns the previous one.
    pub fn replace(&self, next: Settings) -> Arc<Settings> {
        debug!(
            poll_interval = %next.poll_interval_expression,
            "live settings replaced"
        );
        self.tx.send_replace(Arc::new(next))
    }

}
