use tracing::{debug, info};

use super::service::{NOTE_EXTENSION, NotesService};
use crate::io::{join_path, split_path};
use crate::store::NoteError;

/// Push/pop navigation through notes linked from the primary note.
pub struct SubNoteNavigator<'a> {
    service: &'a mut NotesService,
}

/// Strips wiki-link decoration: `[[name#heading|alias]]` becomes `name`.
fn link_target(name: &str) -> &str {
    let name = name.trim();
    let name = name
        .strip_prefix("[[")
        .and_then(|n| n.strip_suffix("]]"))
        .unwrap_or(name);
    let name = name.split('|').next().unwrap_or(name);
    name.split('#').next().unwrap_or(name).trim()
}

impl<'a> SubNoteNavigator<'a> {
    pub(super) fn new(service: &'a mut NotesService) -> Self {
        Self { service }
    }

    /// Note the editor shows right now: the top sub-note or the primary note.
    fn current_note_path(&self) -> Option<String> {
        self.service
            .state
            .peek_navigation()
            .map(str::to_string)
            .or_else(|| self.service.primary_note_path().map(str::to_string))
    }

    /// Finds an existing note for a cross-reference: exact path first, then
    /// by file name anywhere in the vault (shortest path wins).
    pub fn resolve(&self, name: &str) -> Option<String> {
        let target = link_target(name);
        if target.is_empty() {
            return None;
        }
        let suffix = format!(".{NOTE_EXTENSION}");
        let candidate = if target.ends_with(&suffix) {
            target.to_string()
        } else {
            format!("{target}{suffix}")
        };
        let candidate = join_path(&[&candidate]);
        if self.service.vault.exists(&candidate) {
            return Some(candidate);
        }

        let (_, stem, _) = split_path(&candidate);
        let wants_folder = candidate.contains('/');
        self.service
            .vault
            .list_files(NOTE_EXTENSION)
            .into_iter()
            .filter(|path| {
                if wants_folder {
                    path.ends_with(&format!("/{candidate}"))
                } else {
                    split_path(path).1 == stem
                }
            })
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
    }

    /// Follows a cross-reference from the current note, creating the target
    /// next to the current note if it does not exist yet. Returns the
    /// sub-note's content.
    pub fn open(&mut self, name: &str) -> Result<String, NoteError> {
        if self.service.state.current_document().is_none() {
            return Err(NoteError::InvalidLink {
                reason: "no document is open".to_string(),
            });
        }
        let target = link_target(name);
        if target.is_empty() || target.split('/').any(|p| p == "..") {
            return Err(NoteError::InvalidLink {
                reason: format!("not a note name: {name}"),
            });
        }

        let path = match self.resolve(target) {
            Some(path) => path,
            None => {
                let folder = self
                    .current_note_path()
                    .map(|p| split_path(&p).0.to_string())
                    .unwrap_or_default();
                let file_name = format!("{}.{NOTE_EXTENSION}", target.trim_end_matches(".md"));
                let path = join_path(&[&folder, &file_name]);
                self.service.vault.create(&path, "")?;
                info!(%path, "created sub-note");
                path
            }
        };
        let content = self.service.notes.read_content(&path)?;
        let depth = self.service.state.state().navigation_stack.len() + 1;
        debug!(%path, depth, "entering sub-note");
        self.service.state.push_navigation(path);
        Ok(content)
    }

    /// Leaves the current sub-note. Returns the content now shown: the
    /// previous sub-note, or the primary note once the stack is empty.
    pub fn back(&mut self) -> Result<String, NoteError> {
        if self.service.state.pop_navigation().is_none() {
            return Err(NoteError::NoSubNote);
        }
        self.service.try_current_content()
    }

    /// Drops every sub-note at once and returns the primary note's content.
    pub fn home(&mut self) -> Result<String, NoteError> {
        self.service.state.clear_navigation();
        self.service.try_current_content()
    }

    pub fn save_current(&mut self, content: &str) -> Result<(), NoteError> {
        let path = self
            .service
            .state
            .peek_navigation()
            .map(str::to_string)
            .ok_or(NoteError::NoSubNote)?;
        self.service.notes.save_to_path(&path, content)
    }

    pub fn current_content(&self) -> Result<String, NoteError> {
        let path = self
            .service
            .state
            .peek_navigation()
            .ok_or(NoteError::NoSubNote)?;
        self.service.notes.read_content(path)
    }

    /// File stem of the sub-note on top of the stack.
    pub fn display_name(&self) -> Option<&str> {
        self.service.state.peek_navigation().map(|p| split_path(p).1)
    }
}

#[cfg(test)]
mod tests {
    use super::link_target;
    use crate::app::service::tests::{harness, manual_settings};
    use crate::config::Settings;
    use crate::io::Vault;
    use crate::store::NoteError;

    #[test]
    fn link_target_strips_wiki_decoration() {
        assert_eq!(link_target("[[Chapter 2#Intro|see here]]"), "Chapter 2");
        assert_eq!(link_target("  plain  "), "plain");
        assert_eq!(link_target("dir/x.md"), "dir/x.md");
    }

    #[test]
    fn push_push_back_back() {
        let mut h = harness(Settings::default());
        h.vault.create("a.pdf", "").expect("create");
        h.vault.create("x.md", "x body").expect("create");
        h.vault.create("y.md", "y body").expect("create");
        h.service.open_document(Some("a.pdf"));
        h.service.save("primary").expect("save");

        assert_eq!(h.service.sub_notes().open("x").expect("open x"), "x body");
        assert_eq!(h.service.sub_notes().open("[[y]]").expect("open y"), "y body");
        assert_eq!(h.service.state().state().navigation_stack, vec!["x.md", "y.md"]);

        assert_eq!(h.service.sub_notes().back().expect("back"), "x body");
        assert_eq!(h.service.state().state().navigation_stack, vec!["x.md"]);
        assert!(h.service.state().is_in_sub_note());

        assert_eq!(h.service.sub_notes().back().expect("back"), "primary");
        assert!(h.service.state().state().navigation_stack.is_empty());
        assert!(!h.service.state().is_in_sub_note());

        assert!(matches!(h.service.sub_notes().back(), Err(NoteError::NoSubNote)));
    }

    #[test]
    fn unresolved_name_creates_file_next_to_current_note() {
        let mut h = harness(Settings::default());
        h.vault.create("papers/a.pdf", "").expect("create");
        h.service.open_document(Some("papers/a.pdf"));

        assert_eq!(h.service.sub_notes().open("Ideas").expect("open"), "");
        assert!(h.vault.exists("papers/Ideas.md"));
        assert_eq!(h.service.sub_notes().display_name(), Some("Ideas"));

        h.service.sub_notes().open("Deeper").expect("open");
        assert!(h.vault.exists("papers/Deeper.md"));
    }

    #[test]
    fn resolve_prefers_exact_then_shortest_match() {
        let mut h = harness(Settings::default());
        h.vault.create("a.pdf", "").expect("create");
        h.vault.create("deep/nested/topic.md", "").expect("create");
        h.vault.create("misc/topic.md", "").expect("create");
        h.service.open_document(Some("a.pdf"));

        assert_eq!(h.service.sub_notes().resolve("topic").as_deref(), Some("misc/topic.md"));
        assert_eq!(
            h.service.sub_notes().resolve("nested/topic").as_deref(),
            Some("deep/nested/topic.md")
        );
        assert_eq!(h.service.sub_notes().resolve("nothing"), None);
    }

    #[test]
    fn saving_in_sub_note_writes_raw_file_not_pages() {
        let mut h = harness(Settings::default());
        h.vault.create("a.pdf", "").expect("create");
        h.vault.create("x.md", "").expect("create");
        h.service.open_document(Some("a.pdf"));
        h.service.save("page one").expect("save");

        h.service.sub_notes().open("x").expect("open");
        h.service.save("sub body").expect("save");

        assert_eq!(h.vault.read("x.md").expect("read").text, "sub body");
        assert_eq!(h.vault.read("a.md").expect("read").text, "## Page 1\npage one\n");
        assert_eq!(h.service.current_content(), "sub body");
    }

    #[test]
    fn home_clears_whole_stack() {
        let mut h = harness(Settings::default());
        h.vault.create("a.pdf", "").expect("create");
        h.service.open_document(Some("a.pdf"));
        h.service.save("primary").expect("save");
        for name in ["one", "two", "three"] {
            h.service.sub_notes().open(name).expect("open");
        }

        assert_eq!(h.service.sub_notes().home().expect("home"), "primary");
        assert!(!h.service.state().is_in_sub_note());
        assert!(h.service.state().state().navigation_stack.is_empty());
    }

    #[test]
    fn opening_sub_note_requires_document() {
        let mut h = harness(manual_settings());
        assert!(matches!(
            h.service.sub_notes().open("x"),
            Err(NoteError::InvalidLink { .. })
        ));
        h.vault.create("a.pdf", "").expect("create");
        h.vault.create("a.md", "").expect("create");
        h.service.link_document("a.pdf", "a.md", None).expect("link");
        h.service.open_document(Some("a.pdf"));
        assert!(matches!(
            h.service.sub_notes().open("../escape"),
            Err(NoteError::InvalidLink { .. })
        ));
    }

    #[test]
    fn switching_document_clears_sub_notes() {
        let mut h = harness(Settings::default());
        h.vault.create("a.pdf", "").expect("create");
        h.vault.create("b.pdf", "").expect("create");
        h.service.open_document(Some("a.pdf"));
        h.service.sub_notes().open("x").expect("open");

        h.service.open_document(Some("b.pdf"));
        assert!(!h.service.state().is_in_sub_note());
        assert_eq!(h.service.state().current_page(), 1);
    }
}
