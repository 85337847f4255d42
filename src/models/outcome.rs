use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Marker the model is told to emit when no folder fits. Also recognized in
/// replies, so it never reaches the vault as a folder name.
pub const NO_CLASSIFICATION: &str = "no classification";

/// Validated destination decision for one note. The only way model text
/// becomes a `Folder` value is through the response parser, which checks it
/// against the configured folder set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Folder(String),
    Unclassified,
}

impl Decision {
    pub fn folder(&self) -> Option<&str> {
        match self {
            Self::Folder(name) => Some(name),
            Self::Unclassified => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Classified,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classified => write!(f, "classified"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-note result, produced once when classification (and the follow-up
/// move) finishes and then folded into the run summary.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub path: String,
    pub decision: Decision,
    pub kind: OutcomeKind,
    pub error: Option<String>,
}

impl ClassificationOutcome {
    pub fn classified(path: String, folder: String) -> Self {
        Self {
            path,
            decision: Decision::Folder(folder),
            kind: OutcomeKind::Classified,
            error: None,
        }
    }

    pub fn skipped(path: String) -> Self {
        Self {
            path,
            decision: Decision::Unclassified,
            kind: OutcomeKind::Skipped,
            error: None,
        }
    }

    pub fn failed(path: String, message: String) -> Self {
        Self {
            path,
            decision: Decision::Unclassified,
            kind: OutcomeKind::Failed,
            error: Some(message),
        }
    }

    /// Downgrade a classified outcome whose move step failed. The decision is
    /// kept so logs show where the note was headed.
    pub fn into_move_failure(self, message: String) -> Self {
        Self {
            kind: OutcomeKind::Failed,
            error: Some(message),
            ..self
        }
    }
}

/// Aggregate counters for one run. Owned exclusively by the active run;
/// every outcome is recorded exactly once.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub classified: usize,
    pub skipped: usize,
    pub failed: usize,
    pub per_folder: BTreeMap<String, usize>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            classified: 0,
            skipped: 0,
            failed: 0,
            per_folder: BTreeMap::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, outcome: &ClassificationOutcome) {
        match outcome.kind {
            OutcomeKind::Classified => {
                self.classified += 1;
                if let Some(folder) = outcome.decision.folder() {
                    *self.per_folder.entry(folder.to_string()).or_insert(0) += 1;
                }
            }
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "classified {}, skipped {}, failed {} of {} notes in {:.1}s",
            self.classified,
            self.skipped,
            self.failed,
            self.total,
            self.duration.as_secs_f64()
        )?;
        if !self.per_folder.is_empty() {
            let folders = self
                .per_folder
                .iter()
                .map(|(folder, count)| format!("{folder}: {count}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ({folders})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_each_kind_once() {
        let mut summary = RunSummary::new(3);
        summary.record(&ClassificationOutcome::classified(
            "a.md".to_string(),
            "Work".to_string(),
        ));
        summary.record(&ClassificationOutcome::skipped("b.md".to_string()));
        summary.record(&ClassificationOutcome::failed(
            "c.md".to_string(),
            "boom".to_string(),
        ));

        assert_eq!(summary.classified, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.per_folder.get("Work"), Some(&1));
    }

    #[test]
    fn move_failure_keeps_decision() {
        let outcome = ClassificationOutcome::classified("a.md".to_string(), "Work".to_string())
            .into_move_failure("destination already exists".to_string());
        assert_eq!(outcome.kind, OutcomeKind::Failed);
        assert_eq!(outcome.decision.folder(), Some("Work"));
        assert!(outcome.error.is_some());
    }

    #[test]
    fn summary_line_is_human_readable() {
        let mut summary = RunSummary::new(2);
        summary.record(&ClassificationOutcome::classified(
            "a.md".to_string(),
            "Journal".to_string(),
        ));
        summary.record(&ClassificationOutcome::skipped("b.md".to_string()));
        let line = summary.to_string();
        assert!(line.contains("classified 1"));
        assert!(line.contains("Journal: 1"));
    }
}
