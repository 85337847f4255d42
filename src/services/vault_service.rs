//! Filesystem access to the note vault behind a narrow trait, so the run
//! coordinator never touches paths outside the vault root and tests can run
//! against a throwaway directory.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{AppError, Result};
use crate::models::note::NoteFile;
use crate::vault_path;

pub trait Vault: Send + Sync {
    /// Every markdown file in the vault, as vault-relative paths. Callers
    /// apply their own membership filtering.
    fn list_markdown_files(&self) -> Result<Vec<NoteFile>>;
    fn read_content(&self, note: &NoteFile) -> Result<String>;
    fn folder_exists(&self, folder: &str) -> bool;
    fn create_folder(&self, folder: &str) -> Result<()>;
    /// Move a file to a new vault-relative path. Refuses to overwrite.
    fn rename(&self, from: &str, to: &str) -> Result<()>;
}

pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let rel = vault_path::normalize(rel);
        let rel = rel.trim_start_matches('/');
        if rel.split('/').any(|segment| segment == "..") {
            return Err(AppError::InvalidPath(rel.to_string()));
        }
        Ok(self.root.join(rel))
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(vault_path::normalize(&rel.to_string_lossy()))
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

impl Vault for FsVault {
    fn list_markdown_files(&self) -> Result<Vec<NoteFile>> {
        let mut notes = Vec::new();
        // depth 0 is the vault root itself; its name is not subject to the
        // hidden-entry rule.
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = self.relative(entry.path()) else {
                continue;
            };
            let note = NoteFile::from_vault_path(&rel);
            if note.is_markdown() {
                notes.push(note);
            }
        }
        notes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(notes)
    }

    fn read_content(&self, note: &NoteFile) -> Result<String> {
        let path = self.resolve(&note.path)?;
        Ok(fs::read_to_string(path)?)
    }

    fn folder_exists(&self, folder: &str) -> bool {
        self.resolve(folder)
            .map(|path| path.is_dir())
            .unwrap_or(false)
    }

    fn create_folder(&self, folder: &str) -> Result<()> {
        let path = self.resolve(folder)?;
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from)?;
        let destination = self.resolve(to)?;

        if !source.exists() {
            return Err(AppError::Move {
                path: from.to_string(),
                message: "source does not exist".to_string(),
            });
        }
        if destination.exists() {
            return Err(AppError::Move {
                path: from.to_string(),
                message: format!("destination already exists: {to}"),
            });
        }

        fs::rename(&source, &destination).map_err(|err| AppError::Move {
            path: from.to_string(),
            message: err.to_string(),
        })
    }
}
