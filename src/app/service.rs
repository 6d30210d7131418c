//! Coordinates the link index, the note store and the application state in
//! response to viewer and storage events.

use std::rc::Rc;

use tracing::{debug, info, warn};

use super::state::{DocumentRef, StateManager};
use super::subnotes::SubNoteNavigator;
use crate::config::Settings;
use crate::core::PageNumber;
use crate::io::{Vault, extension_of};
use crate::store::{Link, LinkIndex, NoteError, NoteStore};

pub const DOCUMENT_EXTENSION: &str = "pdf";
pub const NOTE_EXTENSION: &str = "md";

/// User-facing message surface.
pub trait Notifier {
    fn notice(&mut self, message: &str);
    /// `document_path` has no usable note; the user should repair or create
    /// the link.
    fn broken_link(&mut self, document_path: &str);
}

/// Page changes reported by the document viewer, drained by the event loop.
pub trait PageEvents {
    fn next_page_change(&mut self) -> Option<PageNumber>;
}

pub fn is_document(path: &str) -> bool {
    extension_of(path).is_some_and(|e| e.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}

pub fn is_note(path: &str) -> bool {
    extension_of(path).is_some_and(|e| e.eq_ignore_ascii_case(NOTE_EXTENSION))
}

pub struct NotesService {
    pub(super) vault: Rc<dyn Vault>,
    pub(super) links: LinkIndex,
    pub(super) notes: NoteStore,
    pub(super) state: StateManager,
    notifier: Box<dyn Notifier>,
}

impl NotesService {
    pub fn new(vault: Rc<dyn Vault>, settings: Settings, notifier: Box<dyn Notifier>) -> Self {
        let links = LinkIndex::open(vault.clone(), settings.index_file.clone());
        let notes = NoteStore::new(vault.clone());
        Self {
            vault,
            links,
            notes,
            state: StateManager::new(settings),
            notifier,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateManager {
        &mut self.state
    }

    pub fn links(&self) -> &LinkIndex {
        &self.links
    }

    pub fn vault(&self) -> &Rc<dyn Vault> {
        &self.vault
    }

    pub fn sub_notes(&mut self) -> SubNoteNavigator<'_> {
        SubNoteNavigator::new(self)
    }

    pub(super) fn notify(&mut self, message: &str) {
        self.notifier.notice(message);
    }

    fn close_document(&mut self) {
        self.notes.invalidate();
        self.state.set_current_document(None, None);
    }

    /// Reacts to the viewer switching to `path` (`None` when nothing is
    /// open). Returns whether a document with a note is now current.
    pub fn open_document(&mut self, path: Option<&str>) -> bool {
        let Some(path) = path.filter(|p| is_document(p)) else {
            debug!(?path, "not a document, clearing current document");
            self.close_document();
            return false;
        };

        let link = match self.links.find_by_document(path) {
            Some(link) => link.clone(),
            None if self.state.settings().auto_create_notes => {
                match self.create_note_for_document(path, None) {
                    Ok(link) => link,
                    Err(e) => {
                        warn!(document = %path, "auto-creating note failed: {e}");
                        self.notify(&format!("Could not create a note for {path}: {e}"));
                        self.close_document();
                        return false;
                    }
                }
            }
            None => {
                info!(document = %path, "no linked note");
                self.notifier.broken_link(path);
                self.close_document();
                return false;
            }
        };

        self.notes.invalidate();
        self.state
            .set_current_document(Some(DocumentRef::new(path)), Some(link.is_page_mode));
        true
    }

    /// Page numbers are 1-based; page 0 is ignored.
    pub fn on_page_changed(&mut self, page: PageNumber) -> bool {
        if page == 0 {
            return false;
        }
        self.state.set_current_page(page)
    }

    /// Applies queued page changes in delivery order.
    pub fn pump_page_events(&mut self, events: &mut dyn PageEvents) -> usize {
        let mut applied = 0;
        while let Some(page) = events.next_page_change() {
            if self.on_page_changed(page) {
                applied += 1;
            }
        }
        applied
    }

    /// Note path linked to the current document.
    pub fn primary_note_path(&self) -> Option<&str> {
        let document = self.state.current_document()?;
        self.links
            .find_by_document(&document.path)
            .map(|l| l.note_path.as_str())
    }

    /// Writes `content` to whatever the editor is showing: the top sub-note,
    /// the whole single note, or the current page.
    pub fn save(&mut self, content: &str) -> Result<(), NoteError> {
        let Some(document) = self.state.current_document().cloned() else {
            debug!("save with no document open");
            return Ok(());
        };
        if self.state.is_in_sub_note() {
            return self.sub_notes().save_current(content);
        }
        if self.state.is_page_mode() == Some(false) {
            let note_path = self
                .links
                .find_by_document(&document.path)
                .map(|l| l.note_path.clone())
                .ok_or_else(|| NoteError::NoLinkedNote {
                    document: document.path.clone(),
                })?;
            return self.notes.save_to_path(&note_path, content);
        }
        let page = self.state.current_page();
        self.notes.save_page(&self.links, &document.path, page, content)
    }

    /// Content for the editor, following the same branching as [`save`].
    ///
    /// [`save`]: NotesService::save
    pub fn try_current_content(&mut self) -> Result<String, NoteError> {
        let Some(document) = self.state.current_document().cloned() else {
            return Ok(String::new());
        };
        if self.state.is_in_sub_note() {
            return self.sub_notes().current_content();
        }
        if self.state.is_page_mode() == Some(false) {
            let note_path = self
                .links
                .find_by_document(&document.path)
                .map(|l| l.note_path.clone())
                .ok_or_else(|| NoteError::NoLinkedNote {
                    document: document.path.clone(),
                })?;
            return match self.notes.read_content(&note_path) {
                Err(NoteError::FileNotFound { path }) => Err(NoteError::NoteFileMissing { path }),
                other => other,
            };
        }
        self.notes.initialize(&self.links, &document.path)?;
        Ok(self
            .notes
            .get_page(self.state.current_page())
            .unwrap_or_default()
            .to_string())
    }

    /// Like [`try_current_content`], but failures are reported to the user
    /// and leave an empty editor. A broken link also closes the document.
    ///
    /// [`try_current_content`]: NotesService::try_current_content
    pub fn current_content(&mut self) -> String {
        match self.try_current_content() {
            Ok(content) => content,
            Err(e) if e.is_broken_link() => {
                let document = self
                    .state
                    .current_document()
                    .map(|d| d.path.clone())
                    .unwrap_or_default();
                warn!(%document, "broken link: {e}");
                self.notify(&format!("Failed to load note: {e}"));
                self.notifier.broken_link(&document);
                self.close_document();
                String::new()
            }
            Err(e) => {
                warn!("failed to load note: {e}");
                self.notify(&format!("Failed to load note: {e}"));
                String::new()
            }
        }
    }

    /// Links `document` to an existing `note`, replacing any previous link.
    pub fn link_document(
        &mut self,
        document: &str,
        note: &str,
        is_page_mode: Option<bool>,
    ) -> Result<Link, NoteError> {
        if !is_document(document) {
            return Err(NoteError::InvalidLink {
                reason: format!("{document} is not a .{DOCUMENT_EXTENSION} file"),
            });
        }
        if !is_note(note) {
            return Err(NoteError::InvalidLink {
                reason: format!("{note} is not a .{NOTE_EXTENSION} file"),
            });
        }
        for path in [document, note] {
            if !self.vault.exists(path) {
                return Err(NoteError::InvalidLink {
                    reason: format!("{path} does not exist"),
                });
            }
        }
        let is_page_mode = is_page_mode.unwrap_or(self.state.settings().is_page_mode);
        let link = Link::new(document, note, is_page_mode);
        self.links.save(link.clone())?;
        self.after_link_changed(&link);
        self.notify(&format!("{document} linked to note: {note}"));
        Ok(link)
    }

    /// Creates (if needed) and links the note for `document`, placed by the
    /// folder-location settings.
    pub fn create_note_for_document(
        &mut self,
        document: &str,
        is_page_mode: Option<bool>,
    ) -> Result<Link, NoteError> {
        let settings = self.state.settings();
        let note_path = settings.note_path_for(document);
        let is_page_mode = is_page_mode.unwrap_or(settings.is_page_mode);

        if !self.vault.exists(&note_path) {
            self.vault.create(&note_path, "")?;
            info!(document = %document, note = %note_path, "created note file");
        }
        let link = Link::new(document, note_path, is_page_mode);
        self.links.save(link.clone())?;
        self.after_link_changed(&link);
        Ok(link)
    }

    /// Repair action for a broken link: create the note for `document` and
    /// make it current.
    pub fn repair_with_new_note(
        &mut self,
        document: &str,
        is_page_mode: Option<bool>,
    ) -> Result<Link, NoteError> {
        if !is_document(document) {
            return Err(NoteError::InvalidLink {
                reason: format!("{document} is not a .{DOCUMENT_EXTENSION} file"),
            });
        }
        let link = self.create_note_for_document(document, is_page_mode)?;
        self.notes.invalidate();
        self.state
            .set_current_document(Some(DocumentRef::new(document)), Some(link.is_page_mode));
        self.notify(&format!("Created note {}", link.note_path));
        Ok(link)
    }

    fn after_link_changed(&mut self, link: &Link) {
        let is_current = self
            .state
            .current_document()
            .is_some_and(|d| d.path == link.document_path);
        if is_current {
            self.notes.invalidate();
            self.state.set_page_mode(Some(link.is_page_mode));
        }
    }

    /// Flips page mode for the current document and persists it.
    pub fn toggle_page_mode(&mut self) -> Result<bool, NoteError> {
        let document = self
            .state
            .current_document()
            .map(|d| d.path.clone())
            .ok_or_else(|| NoteError::InvalidLink {
                reason: "no document is open".to_string(),
            })?;
        let current = self
            .links
            .find_by_document(&document)
            .map(|l| l.is_page_mode)
            .ok_or_else(|| NoteError::NoLinkedNote {
                document: document.clone(),
            })?;
        self.links.update_page_mode(&document, !current)?;
        self.notes.invalidate();
        self.state.set_page_mode(Some(!current));
        Ok(!current)
    }

    /// Storage reported `old` was renamed to `new`.
    pub fn on_renamed(&mut self, old: &str, new: &str) -> Result<(), NoteError> {
        if is_document(new) {
            if self.links.update_document_path(old, new)? {
                info!(%old, %new, "document renamed, link updated");
            }
            self.notes.invalidate();
            let was_current = self.state.current_document().is_some_and(|d| d.path == old);
            if was_current {
                let mode = self.links.find_by_document(new).map(|l| l.is_page_mode);
                self.state
                    .set_current_document(Some(DocumentRef::new(new)), mode);
            }
        } else if is_note(new) {
            let changed = self.links.update_note_path(old, new)?;
            if changed > 0 {
                info!(%old, %new, changed, "note renamed, links updated");
                if self.primary_note_path() == Some(new) {
                    self.notes.invalidate();
                }
            }
            self.state.rename_in_navigation(old, new);
        }
        Ok(())
    }

    /// Removes the link of a document, or of the document a note is linked
    /// from. Returns the unlinked document path.
    pub fn unlink(&mut self, path: &str) -> Result<Option<String>, NoteError> {
        let document = if is_document(path) {
            Some(path.to_string())
        } else {
            self.links.find_by_note(path).map(|l| l.document_path.clone())
        };
        let Some(document) = document else {
            return Ok(None);
        };
        if !self.links.delete(&document)? {
            return Ok(None);
        }
        if self.state.current_document().is_some_and(|d| d.path == document) {
            self.close_document();
        }
        Ok(Some(document))
    }

    /// Storage reported `path` was deleted.
    pub fn on_deleted(&mut self, path: &str) -> Result<(), NoteError> {
        if is_document(path) {
            if self.unlink(path)?.is_some() {
                self.notify(&format!("Link to document deleted: {path}"));
            }
        } else if is_note(path) {
            if self.state.remove_from_navigation(path) {
                debug!(%path, "deleted note dropped from sub-note stack");
            }
            match self.unlink(path)? {
                Some(_) => self.notify(&format!("Link to note deleted: {path}")),
                None => self.notify(&format!("No linked document found for note: {path}")),
            }
        }
        Ok(())
    }
}
