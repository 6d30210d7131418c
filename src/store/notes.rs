use std::rc::Rc;

use tracing::debug;

use super::{LinkIndex, NoteError};
use crate::core::{PageNotes, PageNumber, generate_pages, parse_pages};
use crate::io::{EolStyle, Vault};

/// Note content for the active document.
///
/// Page-mode notes are cached per document and written back whole on every
/// save. Raw reads and writes go straight to the vault.
pub struct NoteStore {
    vault: Rc<dyn Vault>,
    pages: PageNotes,
    loaded_for: Option<String>,
    eol: EolStyle,
}

impl NoteStore {
    pub fn new(vault: Rc<dyn Vault>) -> Self {
        Self {
            vault,
            pages: PageNotes::new(),
            loaded_for: None,
            eol: EolStyle::Lf,
        }
    }

    pub fn is_initialized_for(&self, document_path: &str) -> bool {
        self.loaded_for.as_deref() == Some(document_path)
    }

    /// Loads the page notes of the note linked to `document_path`.
    /// Does nothing if they are already loaded.
    pub fn initialize(&mut self, links: &LinkIndex, document_path: &str) -> Result<(), NoteError> {
        if self.is_initialized_for(document_path) {
            return Ok(());
        }
        let link = links
            .find_by_document(document_path)
            .ok_or_else(|| NoteError::NoLinkedNote {
                document: document_path.to_string(),
            })?;
        if !self.vault.exists(&link.note_path) {
            return Err(NoteError::NoteFileMissing {
                path: link.note_path.clone(),
            });
        }
        let data = self.vault.read(&link.note_path)?;
        self.pages = parse_pages(&data.text);
        self.eol = data.eol;
        self.loaded_for = Some(document_path.to_string());
        debug!(
            document = %document_path,
            note = %link.note_path,
            pages = self.pages.len(),
            "loaded page notes"
        );
        Ok(())
    }

    pub fn get_page(&self, page: PageNumber) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    pub fn pages(&self) -> &PageNotes {
        &self.pages
    }

    /// Sets the note of one page and rewrites the linked file.
    /// Blank `content` removes the page.
    pub fn save_page(
        &mut self,
        links: &LinkIndex,
        document_path: &str,
        page: PageNumber,
        content: &str,
    ) -> Result<(), NoteError> {
        let note_path = links
            .find_by_document(document_path)
            .map(|l| l.note_path.clone())
            .ok_or_else(|| NoteError::NoLinkedNote {
                document: document_path.to_string(),
            })?;
        self.initialize(links, document_path)?;

        let content = content.trim();
        if content.is_empty() {
            self.pages.remove(&page);
        } else {
            self.pages.insert(page, content.to_string());
        }
        let text = generate_pages(&self.pages);
        self.vault.write(&note_path, &text, self.eol)?;
        debug!(document = %document_path, note = %note_path, page, "saved page note");
        Ok(())
    }

    /// Overwrites an existing file with `content`, keeping its line endings.
    pub fn save_to_path(&self, path: &str, content: &str) -> Result<(), NoteError> {
        let eol = match self.vault.read(path) {
            Ok(data) => data.eol,
            Err(e) if e.is_not_found() => {
                return Err(NoteError::FileNotFound {
                    path: path.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        self.vault.write(path, content, eol)?;
        debug!(%path, "saved note file");
        Ok(())
    }

    pub fn read_content(&self, path: &str) -> Result<String, NoteError> {
        match self.vault.read(path) {
            Ok(data) => Ok(data.text),
            Err(e) if e.is_not_found() => Err(NoteError::FileNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Forgets the cached pages; the next access reloads from storage.
    pub fn invalidate(&mut self) {
        self.loaded_for = None;
        self.pages.clear();
        self.eol = EolStyle::Lf;
    }
}
