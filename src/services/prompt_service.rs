//! Prompt construction for classification requests. Pure string assembly;
//! deterministic for a given input.

use crate::models::outcome::NO_CLASSIFICATION;

/// Per-item content cap for batch prompts, smaller than the single-note cap
/// so total prompt size stays linear in group size.
pub const BATCH_CONTENT_MAX: usize = 400;

const TRUNCATION_MARKER: &str = "...";

/// One note inside a batch prompt. The id is synthetic (`file_1`, `file_2`,
/// ...) so real vault paths never reach the model.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: String,
    pub title: String,
    pub content: String,
}

pub fn batch_id(index: usize) -> String {
    format!("file_{}", index + 1)
}

pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

pub fn build_single_prompt(
    title: &str,
    content: &str,
    folders: &[String],
    max_chars: usize,
) -> String {
    let mut prompt = format!(
        "You are filing notes in a personal vault. Pick the single folder from the list \
         below that best matches the note, or answer \"{NO_CLASSIFICATION}\" if none of \
         them fits.\n\nFolders:\n"
    );
    for folder in folders {
        prompt.push_str("- ");
        prompt.push_str(folder);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "\nTitle: {title}\nContent:\n{}\n",
        truncate_content(content, max_chars)
    ));
    prompt.push_str("\nAnswer with the folder name only, nothing else.\n");
    prompt
}

pub fn build_batch_prompt(items: &[BatchItem], folders: &[String]) -> String {
    let mut prompt = format!(
        "You are filing notes in a personal vault. For each note below, pick the single \
         folder from the list that best matches it, or use \"{NO_CLASSIFICATION}\" if none \
         of them fits.\n\nFolders:\n"
    );
    for folder in folders {
        prompt.push_str("- ");
        prompt.push_str(folder);
        prompt.push('\n');
    }
    for item in items {
        prompt.push_str(&format!(
            "\nNote {}\nTitle: {}\nContent:\n{}\n",
            item.id,
            item.title,
            truncate_content(&item.content, BATCH_CONTENT_MAX)
        ));
    }
    prompt.push_str(
        "\nAnswer with a JSON array only, one object per note, in the form \
         [{\"id\": \"file_1\", \"folder\": \"<folder name>\"}]. Use \
         \"no classification\" as the folder for notes that match nothing.\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folders() -> Vec<String> {
        vec!["Work".to_string(), "Journal".to_string()]
    }

    #[test]
    fn single_prompt_lists_folders_and_note() {
        let prompt = build_single_prompt("Standup", "notes from the meeting", &folders(), 1000);
        assert!(prompt.contains("- Work\n"));
        assert!(prompt.contains("- Journal\n"));
        assert!(prompt.contains("Title: Standup"));
        assert!(prompt.contains("notes from the meeting"));
        assert!(prompt.contains(NO_CLASSIFICATION));
    }

    #[test]
    fn single_prompt_is_deterministic() {
        let a = build_single_prompt("T", "c", &folders(), 100);
        let b = build_single_prompt("T", "c", &folders(), 100);
        assert_eq!(a, b);
    }

    #[test]
    fn truncation_adds_marker_only_when_needed() {
        assert_eq!(truncate_content("short", 10), "short");
        assert_eq!(truncate_content("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_content("0123456789x", 10), "0123456789...");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "日本語のメモです";
        let cut = truncate_content(text, 3);
        assert_eq!(cut, "日本語...");
    }

    #[test]
    fn batch_prompt_uses_synthetic_ids_not_paths() {
        let items = vec![
            BatchItem {
                id: batch_id(0),
                title: "A".to_string(),
                content: "alpha".to_string(),
            },
            BatchItem {
                id: batch_id(1),
                title: "B".to_string(),
                content: "beta".to_string(),
            },
        ];
        let prompt = build_batch_prompt(&items, &folders());
        assert!(prompt.contains("Note file_1"));
        assert!(prompt.contains("Note file_2"));
        assert!(prompt.contains("JSON array"));
        assert!(!prompt.contains("Notes/"));
    }

    #[test]
    fn batch_prompt_caps_item_content() {
        let long = "x".repeat(BATCH_CONTENT_MAX * 2);
        let items = vec![BatchItem {
            id: batch_id(0),
            title: "Long".to_string(),
            content: long,
        }];
        let prompt = build_batch_prompt(&items, &folders());
        assert!(prompt.contains(&format!("{}...", "x".repeat(BATCH_CONTENT_MAX))));
        assert!(!prompt.contains(&"x".repeat(BATCH_CONTENT_MAX + 1)));
    }
}
