use std::path::Path;

/// Narrow view of a vault file admitted into the pipeline. External file
/// objects are reduced to this shape instead of being trusted wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    /// Vault-relative path, `/`-separated.
    pub path: String,
    /// File name including the extension.
    pub basename: String,
    pub extension: Option<String>,
}

impl NoteFile {
    pub fn from_vault_path(path: &str) -> Self {
        let path = crate::vault_path::normalize(path);
        let basename = path
            .rsplit('/')
            .next()
            .unwrap_or(path.as_str())
            .to_string();
        let extension = Path::new(&basename)
            .extension()
            .map(|e| e.to_string_lossy().to_string());
        Self {
            path,
            basename,
            extension,
        }
    }

    /// Title shown to the model: the filename stem.
    pub fn title(&self) -> String {
        Path::new(&self.basename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.basename.clone())
    }

    pub fn is_markdown(&self) -> bool {
        self.extension
            .as_deref()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
    }
}
