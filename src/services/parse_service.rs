//! Turns loosely structured model output into validated decisions. This is
//! the trust boundary: nothing the model says becomes a folder name unless
//! it matches the configured set exactly, and malformed output degrades to
//! "unclassified" instead of failing the run.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::outcome::{Decision, NO_CLASSIFICATION};

#[derive(Debug, Deserialize)]
struct BatchAssignment {
    #[serde(default)]
    id: String,
    #[serde(default)]
    folder: String,
}

/// Parse a single-note reply. First-declared folder wins when several names
/// could match the same text; that tie-break follows configuration order.
pub fn parse_single(text: Option<&str>, folders: &[String]) -> Decision {
    let Some(text) = text else {
        return Decision::Unclassified;
    };
    let text = text.trim();
    if text.is_empty() {
        return Decision::Unclassified;
    }
    if text.to_lowercase().contains(NO_CLASSIFICATION) {
        return Decision::Unclassified;
    }
    for folder in folders {
        let name = folder.as_str();
        if text == name || text.ends_with(name) || text.contains(name) {
            return Decision::Folder(folder.clone());
        }
    }
    Decision::Unclassified
}

/// Find the first bracket-delimited JSON array in free-form output. Models
/// often wrap the array in prose or a code fence, so the whole reply is
/// never assumed to be JSON.
pub fn extract_json_array(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            let body = rest[..end].trim();
            if body.starts_with('[') {
                return Some(body.to_string());
            }
        }
    }

    let first = trimmed.find('[')?;
    let last = trimmed.rfind(']')?;
    if first <= last {
        return Some(trimmed[first..=last].to_string());
    }
    None
}

/// Parse a batch reply into per-note decisions, keyed by the originating
/// note path. Notes absent from the returned map were not answered and are
/// treated as unclassified by the caller; an unparseable reply therefore
/// yields an empty map, never an error.
pub fn parse_batch(
    text: Option<&str>,
    id_to_path: &HashMap<String, String>,
    folders: &[String],
) -> HashMap<String, Decision> {
    let mut decisions = HashMap::new();
    let Some(text) = text else {
        return decisions;
    };
    let Some(payload) = extract_json_array(text) else {
        warn!("batch reply contained no JSON array");
        return decisions;
    };
    let assignments: Vec<BatchAssignment> = match serde_json::from_str(&payload) {
        Ok(assignments) => assignments,
        Err(err) => {
            warn!(%err, "batch reply array failed to parse");
            return decisions;
        }
    };

    for assignment in assignments {
        let Some(path) = id_to_path.get(&assignment.id) else {
            warn!(id = %assignment.id, "batch reply referenced an unknown note id");
            continue;
        };
        let folder = assignment.folder.trim();
        let decision = if folder.eq_ignore_ascii_case(NO_CLASSIFICATION) {
            Decision::Unclassified
        } else if let Some(known) = folders.iter().find(|known| known.as_str() == folder) {
            Decision::Folder(known.clone())
        } else {
            debug!(%folder, "model proposed a folder outside the configured set");
            Decision::Unclassified
        };
        decisions.insert(path.clone(), decision);
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folders() -> Vec<String> {
        vec!["Work".to_string(), "Journal".to_string()]
    }

    #[test]
    fn sentinel_text_is_unclassified() {
        assert_eq!(
            parse_single(Some("no classification"), &folders()),
            Decision::Unclassified
        );
        assert_eq!(
            parse_single(Some("I think: No Classification."), &folders()),
            Decision::Unclassified
        );
    }

    #[test]
    fn missing_or_empty_candidate_is_unclassified() {
        assert_eq!(parse_single(None, &folders()), Decision::Unclassified);
        assert_eq!(parse_single(Some("  \n"), &folders()), Decision::Unclassified);
    }

    #[test]
    fn exact_folder_name_matches() {
        assert_eq!(
            parse_single(Some("Work"), &folders()),
            Decision::Folder("Work".to_string())
        );
    }

    #[test]
    fn suffix_match_still_resolves() {
        assert_eq!(
            parse_single(Some("The best folder is Journal"), &folders()),
            Decision::Folder("Journal".to_string())
        );
    }

    #[test]
    fn first_declared_folder_wins_on_ambiguity() {
        let folders = vec!["Log".to_string(), "Logbook".to_string()];
        assert_eq!(
            parse_single(Some("Logbook"), &folders),
            Decision::Folder("Log".to_string())
        );
    }

    #[test]
    fn unknown_text_is_unclassified() {
        assert_eq!(
            parse_single(Some("Recipes"), &folders()),
            Decision::Unclassified
        );
    }

    #[test]
    fn batch_array_embedded_in_prose() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        let text = "Here you go:\n[{\"id\":\"file_1\",\"folder\":\"Work\"}]\nDone.";
        let decisions = parse_batch(Some(text), &ids, &folders());
        assert_eq!(
            decisions.get("Notes/a.md"),
            Some(&Decision::Folder("Work".to_string()))
        );
    }

    #[test]
    fn batch_code_fence_parses() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        let text = "```json\n[{\"id\":\"file_1\",\"folder\":\"Journal\"}]\n```";
        let decisions = parse_batch(Some(text), &ids, &folders());
        assert_eq!(
            decisions.get("Notes/a.md"),
            Some(&Decision::Folder("Journal".to_string()))
        );
    }

    #[test]
    fn invented_folder_degrades_to_unclassified() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        let text = "[{\"id\":\"file_1\",\"folder\":\"Recipes\"}]";
        let decisions = parse_batch(Some(text), &ids, &folders());
        assert_eq!(decisions.get("Notes/a.md"), Some(&Decision::Unclassified));
    }

    #[test]
    fn sentinel_value_in_batch_is_unclassified() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        let text = "[{\"id\":\"file_1\",\"folder\":\"no classification\"}]";
        let decisions = parse_batch(Some(text), &ids, &folders());
        assert_eq!(decisions.get("Notes/a.md"), Some(&Decision::Unclassified));
    }

    #[test]
    fn unknown_id_is_dropped_not_fatal() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        let text = "[{\"id\":\"file_9\",\"folder\":\"Work\"},{\"id\":\"file_1\",\"folder\":\"Work\"}]";
        let decisions = parse_batch(Some(text), &ids, &folders());
        assert_eq!(decisions.len(), 1);
        assert_eq!(
            decisions.get("Notes/a.md"),
            Some(&Decision::Folder("Work".to_string()))
        );
    }

    #[test]
    fn output_without_array_yields_empty_map() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        assert!(parse_batch(Some("sorry, no JSON today"), &ids, &folders()).is_empty());
        assert!(parse_batch(Some("{\"id\": \"file_1\"}"), &ids, &folders()).is_empty());
        assert!(parse_batch(None, &ids, &folders()).is_empty());
    }

    #[test]
    fn garbage_array_yields_empty_map() {
        let mut ids = HashMap::new();
        ids.insert("file_1".to_string(), "Notes/a.md".to_string());
        assert!(parse_batch(Some("[not json at all"), &ids, &folders()).is_empty());
    }
}
