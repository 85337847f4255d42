//! Drives one classification run end to end: claims the single-flight slot,
//! discovers inbox candidates, classifies them (batched or per note), moves
//! classified notes, and folds everything into a summary. A per-note failure
//! never aborts the run; a run-level failure releases the slot on the way
//! out.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;
use crate::models::note::NoteFile;
use crate::models::outcome::{ClassificationOutcome, Decision, OutcomeKind, RunSummary};
use crate::services::classify_service::{CandidateNote, Classifier};
use crate::services::gemini_service::GenerationBackend;
use crate::services::vault_service::Vault;
use crate::state::AppState;
use crate::vault_path;

pub struct RunCoordinator {
    state: Arc<AppState>,
    vault: Arc<dyn Vault>,
    classifier: Classifier,
}

impl RunCoordinator {
    pub fn new(
        state: Arc<AppState>,
        vault: Arc<dyn Vault>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            state,
            vault,
            classifier: Classifier::new(backend),
        }
    }

    /// Markdown files sitting directly in the watch folder, in stable path
    /// order.
    pub fn discover_candidates(&self, settings: &Settings) -> Result<Vec<NoteFile>> {
        let notes = self
            .vault
            .list_markdown_files()?
            .into_iter()
            .filter(|note| vault_path::is_direct_child(&note.path, &settings.watch_folder))
            .collect();
        Ok(notes)
    }

    /// Run a bulk classification over the current inbox. Rejected with
    /// `RunInProgress` when another run is active; the caller retries later,
    /// nothing is queued.
    pub async fn start_run(&self, settings: &Settings) -> Result<RunSummary> {
        let _guard = self.state.try_begin_run()?;
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, watch_folder = %settings.watch_folder, "classification run started");

        let result = self.run_inner(settings, started).await;
        match &result {
            Ok(summary) => info!(%run_id, %summary, "classification run finished"),
            Err(err) => warn!(%run_id, %err, "classification run aborted"),
        }
        result
        // _guard drops here, returning the run state to idle on every path.
    }

    async fn run_inner(&self, settings: &Settings, started: Instant) -> Result<RunSummary> {
        let notes = self.discover_candidates(settings)?;
        let mut summary = RunSummary::new(notes.len());
        if notes.is_empty() {
            summary.duration = started.elapsed();
            return Ok(summary);
        }

        // Bodies load lazily here; a note that cannot be read fails alone.
        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        for note in notes {
            match self.vault.read_content(&note) {
                Ok(content) => candidates.push(CandidateNote { note, content }),
                Err(err) => {
                    failures.push(ClassificationOutcome::failed(note.path, err.to_string()))
                }
            }
        }

        let outcomes = if Classifier::use_batch(candidates.len(), settings) {
            let decisions = self.classifier.classify_batch(&candidates, settings).await?;
            candidates
                .iter()
                .map(|candidate| match decisions.get(&candidate.note.path) {
                    Some(Decision::Folder(folder)) => ClassificationOutcome::classified(
                        candidate.note.path.clone(),
                        folder.clone(),
                    ),
                    // Absent from the reply means unanswered, which is
                    // skipped, not failed.
                    Some(Decision::Unclassified) | None => {
                        ClassificationOutcome::skipped(candidate.note.path.clone())
                    }
                })
                .collect()
        } else {
            self.classifier
                .classify_individually(&candidates, settings)
                .await
        };

        for outcome in failures.into_iter().chain(outcomes) {
            let finished = self.apply_outcome(outcome, settings);
            summary.record(&finished);
        }
        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// Single-note path used by the inbox watcher. Deliberately not gated by
    /// the bulk-run guard.
    pub async fn classify_created_note(
        &self,
        note: &NoteFile,
        settings: &Settings,
    ) -> ClassificationOutcome {
        let content = match self.vault.read_content(note) {
            Ok(content) => content,
            Err(err) => {
                let outcome = ClassificationOutcome::failed(note.path.clone(), err.to_string());
                warn!(path = %note.path, error = %err, "could not read created note");
                return outcome;
            }
        };
        let outcome = self.classifier.classify_one(note, &content, settings).await;
        self.apply_outcome(outcome, settings)
    }

    /// Execute the move step for a classified note and log the final state.
    fn apply_outcome(
        &self,
        outcome: ClassificationOutcome,
        settings: &Settings,
    ) -> ClassificationOutcome {
        let destination = match outcome.kind {
            OutcomeKind::Classified => outcome.decision.folder().map(str::to_string),
            _ => None,
        };
        let finished = match destination {
            Some(folder) => match self.move_note(&outcome.path, &folder, settings) {
                Ok(new_path) => {
                    info!(from = %outcome.path, to = %new_path, "note filed");
                    outcome
                }
                Err(err) => outcome.into_move_failure(err.to_string()),
            },
            None => outcome,
        };

        match finished.kind {
            OutcomeKind::Skipped if !settings.run.skip_unclassified => {
                info!(path = %finished.path, "note left in place");
            }
            OutcomeKind::Failed => {
                warn!(
                    path = %finished.path,
                    error = finished.error.as_deref().unwrap_or("unknown"),
                    "note classification failed"
                );
            }
            _ => {}
        }
        if settings.run.log_results {
            info!(path = %finished.path, result = %finished.kind, "note outcome");
        }
        finished
    }

    /// Destinations resolve under the watch folder: `<watch>/<folder>/<name>`.
    fn move_note(&self, path: &str, folder: &str, settings: &Settings) -> Result<String> {
        let destination_folder = vault_path::join(&settings.watch_folder, folder);
        if !self.vault.folder_exists(&destination_folder) {
            self.vault.create_folder(&destination_folder)?;
        }
        let basename = path.rsplit('/').next().unwrap_or(path);
        let destination = vault_path::join(&destination_folder, basename);
        self.vault.rename(path, &destination)?;
        Ok(destination)
    }
}
