//! Classification of notes against the configured folder set, including the
//! policy that decides between one combined batch request and per-note
//! requests issued in rate-limited chunks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::note::NoteFile;
use crate::models::outcome::{ClassificationOutcome, Decision};
use crate::services::gemini_service::{GenerateOptions, GenerationBackend};
use crate::services::parse_service;
use crate::services::prompt_service::{self, BatchItem};

/// Minimum group size before a combined batch request is worthwhile.
pub const BATCH_THRESHOLD: usize = 3;
/// Per-note requests fire at most this many at a time.
pub const CHUNK_SIZE: usize = 5;
/// Pause between chunks so the upstream request-rate ceiling is respected.
/// Skipped after the final chunk.
pub const CHUNK_PAUSE: Duration = Duration::from_secs(2);

/// A note paired with its (lazily loaded, still untruncated) body text.
pub struct CandidateNote {
    pub note: NoteFile,
    pub content: String,
}

pub struct Classifier {
    backend: Arc<dyn GenerationBackend>,
}

impl Classifier {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Batch when the group is big enough and the user has not asked for
    /// per-note precision.
    pub fn use_batch(count: usize, settings: &Settings) -> bool {
        count >= BATCH_THRESHOLD && !settings.run.high_accuracy
    }

    /// Classify one note. Every failure becomes a `Failed` outcome here;
    /// nothing propagates past this boundary.
    pub async fn classify_one(
        &self,
        note: &NoteFile,
        content: &str,
        settings: &Settings,
    ) -> ClassificationOutcome {
        if settings.resolved_api_key().trim().is_empty() {
            return ClassificationOutcome::failed(
                note.path.clone(),
                AppError::MissingCredential.to_string(),
            );
        }

        let prompt = prompt_service::build_single_prompt(
            &note.title(),
            content,
            &settings.folders,
            settings.run.max_content_length,
        );
        let opts = GenerateOptions::single(settings.run.request_timeout());

        match self.backend.generate(&prompt, opts).await {
            Ok(reply) => match parse_service::parse_single(reply.first_text(), &settings.folders) {
                Decision::Folder(folder) => {
                    ClassificationOutcome::classified(note.path.clone(), folder)
                }
                Decision::Unclassified => ClassificationOutcome::skipped(note.path.clone()),
            },
            Err(err) => ClassificationOutcome::failed(note.path.clone(), err.to_string()),
        }
    }

    /// One combined request for the whole group. A model-level failure here
    /// is a run-level error: no per-note outcome exists yet, so the caller
    /// reports it and releases the run.
    pub async fn classify_batch(
        &self,
        candidates: &[CandidateNote],
        settings: &Settings,
    ) -> Result<HashMap<String, Decision>> {
        if settings.resolved_api_key().trim().is_empty() {
            return Err(AppError::MissingCredential);
        }

        let mut items = Vec::with_capacity(candidates.len());
        let mut id_to_path = HashMap::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            let id = prompt_service::batch_id(index);
            id_to_path.insert(id.clone(), candidate.note.path.clone());
            items.push(BatchItem {
                id,
                title: candidate.note.title(),
                content: candidate.content.clone(),
            });
        }

        let prompt = prompt_service::build_batch_prompt(&items, &settings.folders);
        let opts = GenerateOptions::batch(settings.run.request_timeout());
        let reply = self.backend.generate(&prompt, opts).await?;

        Ok(parse_service::parse_batch(
            reply.first_text(),
            &id_to_path,
            &settings.folders,
        ))
    }

    /// Per-note fallback path: chunks of `CHUNK_SIZE` fire concurrently,
    /// with `CHUNK_PAUSE` between chunks.
    pub async fn classify_individually(
        &self,
        candidates: &[CandidateNote],
        settings: &Settings,
    ) -> Vec<ClassificationOutcome> {
        let mut outcomes = Vec::with_capacity(candidates.len());
        let chunks: Vec<&[CandidateNote]> = candidates.chunks(CHUNK_SIZE).collect();
        let last = chunks.len().saturating_sub(1);

        for (index, chunk) in chunks.iter().enumerate() {
            debug!(chunk = index + 1, total = chunks.len(), "classifying chunk");
            let requests = chunk
                .iter()
                .map(|candidate| self.classify_one(&candidate.note, &candidate.content, settings));
            outcomes.extend(join_all(requests).await);
            if index != last {
                tokio::time::sleep(CHUNK_PAUSE).await;
            }
        }
        outcomes
    }
}
