use tracing::trace;

use crate::config::Settings;
use crate::core::PageNumber;
use crate::io::split_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn stem(&self) -> &str {
        split_path(&self.path).1
    }

    pub fn extension(&self) -> Option<&str> {
        split_path(&self.path).2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub current_document: Option<DocumentRef>,
    pub current_page: PageNumber,
    /// Sub-note paths, innermost last.
    pub navigation_stack: Vec<String>,
    pub is_in_sub_note: bool,
    /// `None` while no document is open.
    pub is_page_mode: Option<bool>,
    pub settings: Settings,
}

impl AppState {
    fn new(settings: Settings) -> Self {
        Self {
            current_document: None,
            current_page: 1,
            navigation_stack: Vec::new(),
            is_in_sub_note: false,
            is_page_mode: None,
            settings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn FnMut(&AppState)>;

/// Owns the application state and tells subscribers about every change.
/// Setters that leave the state as it was notify nobody.
pub struct StateManager {
    state: AppState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl StateManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: AppState::new(settings),
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn current_document(&self) -> Option<&DocumentRef> {
        self.state.current_document.as_ref()
    }

    pub fn current_page(&self) -> PageNumber {
        self.state.current_page
    }

    pub fn is_in_sub_note(&self) -> bool {
        self.state.is_in_sub_note
    }

    pub fn is_page_mode(&self) -> Option<bool> {
        self.state.is_page_mode
    }

    pub fn peek_navigation(&self) -> Option<&str> {
        self.state.navigation_stack.last().map(String::as_str)
    }

    fn update(&mut self, change: impl FnOnce(&mut AppState)) -> bool {
        let before = self.state.clone();
        change(&mut self.state);
        self.state.is_in_sub_note = !self.state.navigation_stack.is_empty();
        if self.state == before {
            return false;
        }
        trace!(state = ?self.state, "state changed");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
        true
    }

    pub fn set_settings(&mut self, settings: Settings) -> bool {
        self.update(|s| s.settings = settings)
    }

    /// Opening a document (or closing with `None`) starts over at page 1
    /// with no sub-notes.
    pub fn set_current_document(
        &mut self,
        document: Option<DocumentRef>,
        is_page_mode: Option<bool>,
    ) -> bool {
        self.update(|s| {
            s.is_page_mode = document.as_ref().and(is_page_mode);
            s.current_document = document;
            s.current_page = 1;
            s.navigation_stack.clear();
        })
    }

    pub fn set_current_page(&mut self, page: PageNumber) -> bool {
        self.update(|s| s.current_page = page)
    }

    pub fn set_page_mode(&mut self, is_page_mode: Option<bool>) -> bool {
        self.update(|s| {
            if s.current_document.is_some() {
                s.is_page_mode = is_page_mode;
            }
        })
    }

    pub fn push_navigation(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.update(|s| s.navigation_stack.push(path));
    }

    pub fn pop_navigation(&mut self) -> Option<String> {
        let mut popped = None;
        self.update(|s| popped = s.navigation_stack.pop());
        popped
    }

    pub fn clear_navigation(&mut self) -> bool {
        self.update(|s| s.navigation_stack.clear())
    }

    /// Rewrites stack entries after a note file was renamed.
    pub fn rename_in_navigation(&mut self, old: &str, new: &str) -> bool {
        self.update(|s| {
            for entry in s.navigation_stack.iter_mut().filter(|e| *e == old) {
                *entry = new.to_string();
            }
        })
    }

    /// Drops stack entries for a deleted note file.
    pub fn remove_from_navigation(&mut self, path: &str) -> bool {
        self.update(|s| s.navigation_stack.retain(|e| e != path))
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AppState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Drops every subscriber.
    pub fn teardown(&mut self) {
        self.listeners.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}
