use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::services::watch_service::{AutoRunHandle, WatcherHandle};

/// Process-wide state: the single-flight run flag plus the lifecycle handles
/// for the inbox watcher and the auto-run timer.
#[derive(Default)]
pub struct AppState {
    run_active: AtomicBool,
    pub watcher_handle: Mutex<Option<WatcherHandle>>,
    auto_run: Mutex<Option<AutoRunHandle>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single run slot. Callers hold the returned guard for the
    /// whole run; dropping it (on any exit path) returns the state to idle.
    pub fn try_begin_run(&self) -> Result<RunGuard<'_>> {
        if self.run_active.swap(true, Ordering::AcqRel) {
            return Err(AppError::RunInProgress);
        }
        Ok(RunGuard { state: self })
    }

    pub fn run_active(&self) -> bool {
        self.run_active.load(Ordering::Acquire)
    }

    pub fn set_watcher(&self, handle: Option<WatcherHandle>) {
        let mut slot = self
            .watcher_handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = handle;
    }

    /// Idempotent: stopping with no timer installed is a no-op.
    pub fn stop_auto_run(&self) {
        let handle = self
            .auto_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// Replace the auto-run timer wholesale; the old one is always stopped
    /// first.
    pub fn replace_auto_run(&self, handle: Option<AutoRunHandle>) {
        self.stop_auto_run();
        let mut slot = self
            .auto_run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = handle;
    }
}

pub struct RunGuard<'a> {
    state: &'a AppState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.run_active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_run_is_rejected_while_guard_is_held() {
        let state = AppState::new();
        let guard = state.try_begin_run().unwrap();
        assert!(matches!(
            state.try_begin_run(),
            Err(AppError::RunInProgress)
        ));
        drop(guard);
        assert!(state.try_begin_run().is_ok());
    }

    #[test]
    fn guard_resets_on_early_return() {
        let state = AppState::new();
        fn fallible(state: &AppState) -> Result<()> {
            let _guard = state.try_begin_run()?;
            Err(AppError::Config("boom".to_string()))
        }
        assert!(fallible(&state).is_err());
        assert!(!state.run_active());
    }

    #[test]
    fn stop_auto_run_is_idempotent() {
        let state = AppState::new();
        state.stop_auto_run();
        state.stop_auto_run();
    }
}
