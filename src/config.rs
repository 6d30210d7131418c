use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::io::{join_path, split_path};

/// Where automatically created notes are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FolderLocation {
    /// `<stem>.md` at the vault root.
    Root,
    /// `<folder_location_path>/<stem>.md`.
    Folder,
    /// Next to the document.
    #[default]
    SameFolder,
    /// `<document folder>/<folder_location_path>/<stem>.md`.
    RelativeFolder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_auto_create_notes")]
    pub auto_create_notes: bool,
    #[serde(default)]
    pub folder_location: FolderLocation,
    #[serde(default)]
    pub folder_location_path: Option<String>,
    #[serde(default = "default_is_page_mode")]
    pub is_page_mode: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

fn default_auto_create_notes() -> bool { true }
fn default_is_page_mode() -> bool { true }
fn default_debounce_ms() -> u64 { 500 }
fn default_index_file() -> String { "pagenotes-index.json".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_create_notes: default_auto_create_notes(),
            folder_location: FolderLocation::default(),
            folder_location_path: None,
            is_page_mode: default_is_page_mode(),
            debounce_ms: default_debounce_ms(),
            index_file: default_index_file(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => warn!(path = %path.display(), "failed to parse settings: {e}"),
                },
                Err(e) => warn!(path = %path.display(), "failed to read settings: {e}"),
            }
        }
        Self::default()
    }

    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            if let Some(dir) = path.parent() {
                let _ = fs::create_dir_all(dir);
            }
            if let Ok(toml_string) = toml::to_string_pretty(&Self::default()) {
                let _ = fs::write(path, toml_string);
            }
        }
        Self::load(path)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagenotes")
    }

    /// Folder a new note for `document_path` goes in, per `folder_location`.
    pub fn note_folder_for(&self, document_path: &str) -> String {
        let (doc_folder, _, _) = split_path(document_path);
        let configured = self.folder_location_path.as_deref().unwrap_or("");
        match self.folder_location {
            FolderLocation::Root => String::new(),
            FolderLocation::Folder => join_path(&[configured]),
            FolderLocation::SameFolder => join_path(&[doc_folder]),
            FolderLocation::RelativeFolder => join_path(&[doc_folder, configured]),
        }
    }

    /// Vault path of the note that would be created for `document_path`.
    pub fn note_path_for(&self, document_path: &str) -> String {
        let (_, stem, _) = split_path(document_path);
        let file_name = format!("{stem}.md");
        join_path(&[&self.note_folder_for(document_path), &file_name])
    }
}
