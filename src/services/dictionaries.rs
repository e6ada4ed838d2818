//! Dictionary library — the word lists rooms can be created with.
//!
//! DESIGN
//! ======
//! Every dictionary is a JSON file `{title, description, words}` under one
//! directory, next to an `index.json` listing `{title, description, file}`
//! for each of them. The title is the identifier clients use; the file name
//! is a slug of the title. `default.json` is the default dictionary: rooms
//! fall back to it, and it can be renamed but never deleted.
//!
//! Loaded word lists are cached as `Arc<Dictionary>`. A room holds its own
//! `Arc`, so deleting or renaming a dictionary never disturbs a game that is
//! already running.
//!
//! ERROR HANDLING
//! ==============
//! Index writes happen after the dictionary file write succeeds, so a failed
//! write leaves the previous index in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::game::dictionary::{Dictionary, DictionaryFile};

pub const INDEX_FILE: &str = "index.json";
pub const DEFAULT_FILE: &str = "default.json";

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("dictionary not found: {0}")]
    NotFound(String),
    #[error("a dictionary titled {0} already exists")]
    TitleTaken(String),
    #[error("the default dictionary cannot be deleted")]
    DefaultLocked,
    #[error("invalid dictionary: {0}")]
    Invalid(&'static str),
    #[error("dictionary file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dictionary format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl crate::frame::ErrorCode for DictionaryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_DICTIONARY_NOT_FOUND",
            Self::TitleTaken(_) => "E_DICTIONARY_TITLE_TAKEN",
            Self::DefaultLocked => "E_DICTIONARY_DEFAULT",
            Self::Invalid(_) => "E_DICTIONARY_INVALID",
            Self::Io(_) => "E_DICTIONARY_IO",
            Self::Format(_) => "E_DICTIONARY_FORMAT",
        }
    }
}

/// One `index.json` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryInfo {
    pub title: String,
    pub description: String,
    pub file: String,
}

impl DictionaryInfo {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.file == DEFAULT_FILE
    }
}

#[derive(Default)]
struct Library {
    index: Vec<DictionaryInfo>,
    cache: HashMap<String, Arc<Dictionary>>,
}

pub struct DictionaryLibrary {
    dir: PathBuf,
    inner: RwLock<Library>,
}

/// File name for a dictionary title: lowercase ASCII letters and digits,
/// every other run of characters collapsed to one `-`.
#[must_use]
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in crate::game::dictionary::normalize(title).chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("dictionary");
    }
    out
}

// =============================================================================
// LOADING
// =============================================================================

impl DictionaryLibrary {
    /// Open the library in `dir` and load the default dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or the default dictionary cannot be read.
    pub async fn load(dir: impl Into<PathBuf>) -> Result<Self, DictionaryError> {
        let dir = dir.into();
        let raw = tokio::fs::read_to_string(dir.join(INDEX_FILE)).await?;
        let index: Vec<DictionaryInfo> = serde_json::from_str(&raw)?;
        if !index.iter().any(DictionaryInfo::is_default) {
            return Err(DictionaryError::NotFound(DEFAULT_FILE.into()));
        }

        let library = Self { dir, inner: RwLock::new(Library { index, cache: HashMap::new() }) };
        let default = library.default_dictionary().await?;
        info!(dir = %library.dir.display(), default = default.title(), words = default.len(), "dictionaries: loaded");
        Ok(library)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    async fn read_file(path: &Path) -> Result<DictionaryFile, DictionaryError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn write_file(path: &Path, file: &DictionaryFile) -> Result<(), DictionaryError> {
        let json = serde_json::to_string_pretty(file)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn write_index(&self, index: &[DictionaryInfo]) -> Result<(), DictionaryError> {
        let json = serde_json::to_string_pretty(index)?;
        tokio::fs::write(self.path(INDEX_FILE), json).await?;
        Ok(())
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl DictionaryLibrary {
    pub async fn list(&self) -> Vec<DictionaryInfo> {
        self.inner.read().await.index.clone()
    }

    pub async fn default_title(&self) -> String {
        let inner = self.inner.read().await;
        inner
            .index
            .iter()
            .find(|d| d.is_default())
            .map(|d| d.title.clone())
            .unwrap_or_default()
    }

    pub async fn contains(&self, title: &str) -> bool {
        self.inner.read().await.index.iter().any(|d| d.title == title)
    }

    /// The word list titled `title`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown title, or the read error.
    pub async fn get(&self, title: &str) -> Result<Arc<Dictionary>, DictionaryError> {
        if let Some(dict) = self.inner.read().await.cache.get(title) {
            return Ok(dict.clone());
        }

        let mut inner = self.inner.write().await;
        if let Some(dict) = inner.cache.get(title) {
            return Ok(dict.clone());
        }
        let Some(info) = inner.index.iter().find(|d| d.title == title).cloned() else {
            return Err(DictionaryError::NotFound(title.to_owned()));
        };
        let file = Self::read_file(&self.path(&info.file)).await?;
        let dict = Arc::new(Dictionary::new(info.title.clone(), info.description, file.words));
        inner.cache.insert(info.title, dict.clone());
        Ok(dict)
    }

    /// # Errors
    ///
    /// Returns an error if the default dictionary file cannot be read.
    pub async fn default_dictionary(&self) -> Result<Arc<Dictionary>, DictionaryError> {
        let title = self.default_title().await;
        self.get(&title).await
    }

    /// Full contents of a dictionary, for download.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown title.
    pub async fn download(&self, title: &str) -> Result<DictionaryFile, DictionaryError> {
        let dict = self.get(title).await?;
        Ok(DictionaryFile::from(dict.as_ref()))
    }
}

// =============================================================================
// ADMINISTRATION
// =============================================================================

impl DictionaryLibrary {
    /// Store a new dictionary under its own title.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for an empty title or word list and `TitleTaken` when
    /// the title (or its file name) is already used.
    pub async fn add(&self, upload: DictionaryFile) -> Result<DictionaryInfo, DictionaryError> {
        let title = upload.title.trim().to_owned();
        if title.is_empty() {
            return Err(DictionaryError::Invalid("a title is required"));
        }
        let dict = Dictionary::new(title.clone(), upload.description.clone(), upload.words);
        if dict.is_empty() {
            return Err(DictionaryError::Invalid("the word list is empty"));
        }

        let mut inner = self.inner.write().await;
        let file = format!("{}.json", slug(&title));
        if inner.index.iter().any(|d| d.title == title || d.file == file) {
            return Err(DictionaryError::TitleTaken(title));
        }

        Self::write_file(&self.path(&file), &DictionaryFile::from(&dict)).await?;
        let info = DictionaryInfo { title: title.clone(), description: upload.description, file };
        let mut index = inner.index.clone();
        index.push(info.clone());
        self.write_index(&index).await?;
        inner.index = index;
        inner.cache.insert(title, Arc::new(dict));
        info!(title = %info.title, file = %info.file, "dictionaries: added");
        Ok(info)
    }

    /// Change a dictionary's title and description. The default dictionary
    /// keeps its file name; others move to the slug of the new title.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `TitleTaken`, or the file error.
    pub async fn update(&self, title: &str, new_title: &str, description: &str) -> Result<DictionaryInfo, DictionaryError> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(DictionaryError::Invalid("a title is required"));
        }

        let mut inner = self.inner.write().await;
        let Some(pos) = inner.index.iter().position(|d| d.title == title) else {
            return Err(DictionaryError::NotFound(title.to_owned()));
        };
        let current = inner.index[pos].clone();
        let file = if current.is_default() { current.file.clone() } else { format!("{}.json", slug(new_title)) };
        let clash = inner
            .index
            .iter()
            .enumerate()
            .any(|(i, d)| i != pos && (d.title == new_title || d.file == file));
        if clash {
            return Err(DictionaryError::TitleTaken(new_title.to_owned()));
        }

        let mut contents = Self::read_file(&self.path(&current.file)).await?;
        new_title.clone_into(&mut contents.title);
        description.clone_into(&mut contents.description);
        Self::write_file(&self.path(&file), &contents).await?;
        if file != current.file {
            if let Err(e) = tokio::fs::remove_file(self.path(&current.file)).await {
                warn!(file = %current.file, error = %e, "dictionaries: stale file not removed");
            }
        }

        let info = DictionaryInfo { title: new_title.to_owned(), description: description.to_owned(), file };
        let mut index = inner.index.clone();
        index[pos] = info.clone();
        self.write_index(&index).await?;
        inner.index = index;
        inner.cache.remove(title);
        info!(from = %title, to = %info.title, "dictionaries: updated");
        Ok(info)
    }

    /// # Errors
    ///
    /// Returns `DefaultLocked` for the default dictionary and `NotFound` for
    /// an unknown title.
    pub async fn delete(&self, title: &str) -> Result<(), DictionaryError> {
        let mut inner = self.inner.write().await;
        let Some(pos) = inner.index.iter().position(|d| d.title == title) else {
            return Err(DictionaryError::NotFound(title.to_owned()));
        };
        if inner.index[pos].is_default() {
            return Err(DictionaryError::DefaultLocked);
        }

        let mut index = inner.index.clone();
        let removed = index.remove(pos);
        self.write_index(&index).await?;
        inner.index = index;
        inner.cache.remove(title);
        if let Err(e) = tokio::fs::remove_file(self.path(&removed.file)).await {
            warn!(file = %removed.file, error = %e, "dictionaries: file not removed");
        }
        info!(%title, "dictionaries: deleted");
        Ok(())
    }

    /// Delete every dictionary except the default. Returns the removed titles.
    ///
    /// # Errors
    ///
    /// Returns the index write error.
    pub async fn reset(&self) -> Result<Vec<String>, DictionaryError> {
        let mut inner = self.inner.write().await;
        let (kept, removed): (Vec<_>, Vec<_>) = inner.index.iter().cloned().partition(DictionaryInfo::is_default);
        self.write_index(&kept).await?;
        inner.index = kept;
        for info in &removed {
            inner.cache.remove(&info.title);
            if let Err(e) = tokio::fs::remove_file(self.path(&info.file)).await {
                warn!(file = %info.file, error = %e, "dictionaries: file not removed");
            }
        }
        Ok(removed.into_iter().map(|d| d.title).collect())
    }
}

#[cfg(test)]
#[path = "dictionaries_test.rs"]
mod tests;
