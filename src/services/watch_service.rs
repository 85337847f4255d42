//! Inbox watcher and auto-run timer. The debounce window doubles as the
//! settle delay for freshly created notes, so half-written files are not
//! sent to the model.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::notify;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::note::NoteFile;
use crate::services::run_service::RunCoordinator;
use crate::state::AppState;
use crate::vault_path;

/// How long a new file must sit quiet before it is classified.
pub const CREATE_SETTLE_DELAY: Duration = Duration::from_secs(2);

pub struct WatcherHandle {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

/// Decide whether a filesystem event path is an inbox candidate: a markdown
/// file sitting directly in the watch folder.
pub fn vault_note_for_event(path: &Path, vault_root: &Path, watch_folder: &str) -> Option<NoteFile> {
    let rel = path.strip_prefix(vault_root).ok()?;
    let rel = vault_path::normalize(&rel.to_string_lossy());
    let note = NoteFile::from_vault_path(&rel);
    if !note.is_markdown() {
        return None;
    }
    if !vault_path::is_direct_child(&note.path, watch_folder) {
        return None;
    }
    Some(note)
}

/// Watch the vault for created notes. Each admitted file is classified on
/// its own; bulk runs triggered elsewhere stay subject to the single-flight
/// guard, this path intentionally is not.
pub fn start_watching(
    coordinator: Arc<RunCoordinator>,
    settings: Arc<Settings>,
) -> Result<WatcherHandle> {
    let vault_root = settings.vault_dir.clone();
    let watch_target = settings.vault_dir.clone();
    if !vault_root.is_dir() {
        return Err(AppError::Watcher(format!(
            "not a directory: {}",
            vault_root.display()
        )));
    }

    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|_| AppError::Watcher("watcher requires a running async runtime".to_string()))?;

    let mut debouncer = new_debouncer(CREATE_SETTLE_DELAY, move |result: DebounceEventResult| {
        match result {
            Ok(events) => {
                for event in events {
                    if !matches!(
                        event.kind,
                        DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                    ) {
                        continue;
                    }
                    // Rename targets and deletions also raise events; only
                    // files that still exist are candidates.
                    if !event.path.is_file() {
                        continue;
                    }
                    let Some(note) =
                        vault_note_for_event(&event.path, &vault_root, &settings.watch_folder)
                    else {
                        continue;
                    };
                    debug!(path = %note.path, "created note admitted for classification");
                    let coordinator = coordinator.clone();
                    let settings = settings.clone();
                    runtime.spawn(async move {
                        coordinator.classify_created_note(&note, &settings).await;
                    });
                }
            }
            Err(err) => warn!(%err, "watcher error"),
        }
    })
    .map_err(|err| AppError::Watcher(err.to_string()))?;

    debouncer
        .watcher()
        .watch(&watch_target, notify::RecursiveMode::Recursive)
        .map_err(|err| AppError::Watcher(err.to_string()))?;

    Ok(WatcherHandle {
        _debouncer: debouncer,
    })
}

pub struct AutoRunHandle {
    task: tokio::task::JoinHandle<()>,
}

impl AutoRunHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Spawn the periodic bulk-run task, or nothing when auto-run is off. A tick
/// that collides with an active run is dropped, not queued.
pub fn start_auto_run(
    coordinator: Arc<RunCoordinator>,
    settings: Arc<Settings>,
) -> Option<AutoRunHandle> {
    if !settings.auto_run_enabled || settings.auto_run_interval_minutes == 0 {
        return None;
    }
    let period = Duration::from_secs(settings.auto_run_interval_minutes * 60);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; swallow it so the first run
        // happens one full period after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match coordinator.start_run(&settings).await {
                Ok(_) => {}
                Err(AppError::RunInProgress) => {
                    debug!("auto run skipped, another run is active");
                }
                Err(err) => warn!(%err, "auto run failed"),
            }
        }
    });
    Some(AutoRunHandle { task })
}

/// Tear down and rebuild the timer after a settings change. The old timer is
/// always stopped first, even when the new settings disable auto-run.
pub fn restart_auto_run(
    state: &AppState,
    coordinator: Arc<RunCoordinator>,
    settings: Arc<Settings>,
) {
    state.replace_auto_run(start_auto_run(coordinator, settings));
}
