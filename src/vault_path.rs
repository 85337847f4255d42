//! Vault-relative path helpers. Paths are `/`-separated regardless of host
//! platform; the watch-folder membership check is the gate every candidate
//! file passes before entering the classification pipeline.

pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

/// True when `path` sits immediately inside `watch_folder`, with no
/// intervening subfolder. An empty watch folder degrades to matching only
/// root-level files, so an unconfigured inbox never swallows the whole vault.
pub fn is_direct_child(path: &str, watch_folder: &str) -> bool {
    let path = normalize(path);
    let watch = normalize(watch_folder);

    if watch.is_empty() {
        return !path.is_empty() && !path.contains('/');
    }

    match path.strip_prefix(&format!("{watch}/")) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

/// Join two vault-relative segments without doubling separators.
pub fn join(parent: &str, name: &str) -> String {
    let parent = normalize(parent);
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize("Notes/"), "Notes");
        assert_eq!(normalize("Notes///"), "Notes");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize("Notes\\a.md"), "Notes/a.md");
    }

    #[test]
    fn direct_child_of_watch_folder() {
        assert!(is_direct_child("Notes/a.md", "Notes"));
        assert!(is_direct_child("Notes/a.md", "Notes/"));
    }

    #[test]
    fn nested_file_is_not_direct_child() {
        assert!(!is_direct_child("Notes/Sub/a.md", "Notes"));
    }

    #[test]
    fn sibling_prefix_does_not_match() {
        assert!(!is_direct_child("Notebook/a.md", "Notes"));
        assert!(!is_direct_child("Notes.md", "Notes"));
    }

    #[test]
    fn empty_watch_folder_matches_root_files_only() {
        assert!(is_direct_child("a.md", ""));
        assert!(!is_direct_child("Notes/a.md", ""));
        assert!(!is_direct_child("", ""));
    }

    #[test]
    fn folder_itself_is_not_a_member() {
        assert!(!is_direct_child("Notes", "Notes"));
    }

    #[test]
    fn join_handles_empty_parent() {
        assert_eq!(join("", "a.md"), "a.md");
        assert_eq!(join("Notes", "a.md"), "Notes/a.md");
        assert_eq!(join("Notes/", "Work"), "Notes/Work");
    }
}
