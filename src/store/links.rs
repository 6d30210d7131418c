//! Persistent document → note link index.
//!
//! The whole index is one JSON object keyed by document path:
//!
//! ```json
//! { "papers/a.pdf": { "notePath": "papers/a.md", "isPageMode": true } }
//! ```
//!
//! Every mutation rewrites the file. An unreadable index is treated as empty,
//! so "no link" and "corrupt index" look the same to callers.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::io::{EolStyle, IoError, Vault};

pub const LINKS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub document_path: String,
    pub note_path: String,
    pub is_page_mode: bool,
}

impl Link {
    pub fn new(
        document_path: impl Into<String>,
        note_path: impl Into<String>,
        is_page_mode: bool,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            note_path: note_path.into(),
            is_page_mode,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLink {
    note_path: String,
    #[serde(default = "default_page_mode")]
    is_page_mode: bool,
}

fn default_page_mode() -> bool {
    true
}

/// Older indexes stored only the note path.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Full(StoredLink),
    Legacy(String),
}

pub struct LinkIndex {
    vault: Rc<dyn Vault>,
    index_path: String,
    links: Vec<Link>,
}

impl LinkIndex {
    /// Opens the index stored at `index_path`, creating an empty one if absent.
    pub fn open(vault: Rc<dyn Vault>, index_path: impl Into<String>) -> Self {
        let mut index = Self {
            vault,
            index_path: index_path.into(),
            links: Vec::new(),
        };
        if !index.vault.exists(&index.index_path) {
            if let Err(e) = index.vault.create(&index.index_path, "{}") {
                warn!(path = %index.index_path, "could not create link index: {e}");
            }
        }
        index.reload();
        index
    }

    pub fn index_path(&self) -> &str {
        &self.index_path
    }

    /// Re-reads the index from storage, dropping in-memory state.
    pub fn reload(&mut self) {
        self.links = self.read_links().unwrap_or_else(|reason| {
            warn!(path = %self.index_path, "link index unreadable, starting empty: {reason}");
            Vec::new()
        });
        debug!(path = %self.index_path, count = self.links.len(), "loaded link index");
    }

    fn read_links(&self) -> Result<Vec<Link>, String> {
        let data = self.vault.read(&self.index_path).map_err(|e| e.to_string())?;
        let raw: Map<String, Value> =
            serde_json::from_str(&data.text).map_err(|e| e.to_string())?;

        let mut links = Vec::with_capacity(raw.len());
        for (document_path, value) in raw {
            match serde_json::from_value::<StoredEntry>(value) {
                Ok(StoredEntry::Full(stored)) => links.push(Link {
                    document_path,
                    note_path: stored.note_path,
                    is_page_mode: stored.is_page_mode,
                }),
                Ok(StoredEntry::Legacy(note_path)) => {
                    links.push(Link::new(document_path, note_path, default_page_mode()))
                }
                Err(e) => warn!(document = %document_path, "skipping malformed link entry: {e}"),
            }
        }
        Ok(links)
    }

    fn persist(&self) -> Result<(), IoError> {
        let mut raw = Map::new();
        for link in &self.links {
            let stored = StoredLink {
                note_path: link.note_path.clone(),
                is_page_mode: link.is_page_mode,
            };
            let value = serde_json::to_value(stored).map_err(|source| IoError::IndexSerialize {
                path: self.index_path.clone(),
                source,
            })?;
            raw.insert(link.document_path.clone(), value);
        }
        let text = serde_json::to_string_pretty(&raw).map_err(|source| IoError::IndexSerialize {
            path: self.index_path.clone(),
            source,
        })?;
        self.vault.write(&self.index_path, &text, EolStyle::Lf)
    }

    fn position(&self, document_path: &str) -> Option<usize> {
        self.links.iter().position(|l| l.document_path == document_path)
    }

    /// Inserts or replaces the link for `link.document_path`.
    pub fn save(&mut self, link: Link) -> Result<(), IoError> {
        if let Some(other) = self
            .links
            .iter()
            .find(|l| l.note_path == link.note_path && l.document_path != link.document_path)
        {
            warn!(
                note = %link.note_path,
                other = %other.document_path,
                "note is already linked to another document"
            );
        }
        info!(
            document = %link.document_path,
            note = %link.note_path,
            page_mode = link.is_page_mode,
            "saving link"
        );
        match self.position(&link.document_path) {
            Some(idx) => self.links[idx] = link,
            None => self.links.push(link),
        }
        self.persist()
    }

    pub fn find_by_document(&self, document_path: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.document_path == document_path)
    }

    /// First link pointing at `note_path`, in insertion order.
    pub fn find_by_note(&self, note_path: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.note_path == note_path)
    }

    pub fn find_all_by_note(&self, note_path: &str) -> Vec<&Link> {
        self.links.iter().filter(|l| l.note_path == note_path).collect()
    }

    pub fn all(&self) -> &[Link] {
        &self.links
    }

    /// Returns whether a link was removed.
    pub fn delete(&mut self, document_path: &str) -> Result<bool, IoError> {
        let Some(idx) = self.position(document_path) else {
            return Ok(false);
        };
        self.links.remove(idx);
        info!(document = %document_path, "deleted link");
        self.persist()?;
        Ok(true)
    }

    pub fn update_document_path(&mut self, old: &str, new: &str) -> Result<bool, IoError> {
        if old == new {
            return Ok(false);
        }
        let Some(idx) = self.position(old) else {
            return Ok(false);
        };
        self.links[idx].document_path = new.to_string();
        if let Some(stale) = self
            .links
            .iter()
            .enumerate()
            .position(|(i, l)| i != idx && l.document_path == new)
        {
            self.links.remove(stale);
        }
        debug!(%old, %new, "re-keyed link");
        self.persist()?;
        Ok(true)
    }

    /// Rewrites every link pointing at `old`. Returns how many changed.
    pub fn update_note_path(&mut self, old: &str, new: &str) -> Result<usize, IoError> {
        let mut changed = 0;
        for link in self.links.iter_mut().filter(|l| l.note_path == old) {
            link.note_path = new.to_string();
            changed += 1;
        }
        if changed > 0 {
            debug!(%old, %new, changed, "updated note path");
            self.persist()?;
        }
        Ok(changed)
    }

    pub fn update_page_mode(
        &mut self,
        document_path: &str,
        is_page_mode: bool,
    ) -> Result<bool, IoError> {
        let Some(idx) = self.position(document_path) else {
            return Ok(false);
        };
        self.links[idx].is_page_mode = is_page_mode;
        self.persist()?;
        Ok(true)
    }
}

/// Case-insensitive substring match on either path. An empty term matches all.
pub fn filter_links<'a>(links: &'a [Link], term: &str) -> Vec<&'a Link> {
    let term = term.trim().to_lowercase();
    links
        .iter()
        .filter(|l| {
            term.is_empty()
                || l.document_path.to_lowercase().contains(&term)
                || l.note_path.to_lowercase().contains(&term)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedLinks<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Slices `items` into 1-based pages of `per_page`.
pub fn paginate_links<T: Clone>(items: &[T], page: usize, per_page: usize) -> PaginatedLinks<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    PaginatedLinks {
        items: items[start..end].to_vec(),
        total: items.len(),
        page,
        total_pages: items.len().div_ceil(per_page),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use tempfile::{TempDir, tempdir};

    use super::{Link, LinkIndex, filter_links, paginate_links};
    use crate::io::{EolStyle, FsVault, Vault};

    const INDEX: &str = "pagenotes-index.json";

    fn vault() -> (TempDir, Rc<FsVault>) {
        let dir = tempdir().expect("tempdir");
        let vault = Rc::new(FsVault::new(dir.path()));
        (dir, vault)
    }

    #[test]
    fn open_creates_empty_index_file() {
        let (_dir, vault) = vault();
        let index = LinkIndex::open(vault.clone(), INDEX);
        assert!(index.all().is_empty());
        assert_eq!(vault.read(INDEX).expect("read").text, "{}");
    }

    #[test]
    fn save_then_find_both_ways() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault, INDEX);
        index.save(Link::new("a.pdf", "a.md", true)).expect("save");

        assert_eq!(index.find_by_document("a.pdf"), Some(&Link::new("a.pdf", "a.md", true)));
        assert_eq!(index.find_by_note("a.md").map(|l| l.document_path.as_str()), Some("a.pdf"));
        assert_eq!(index.find_by_document("b.pdf"), None);
    }

    #[test]
    fn save_upserts_in_place_and_survives_reopen() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault.clone(), INDEX);
        index.save(Link::new("a.pdf", "a.md", true)).expect("save");
        index.save(Link::new("b.pdf", "b.md", false)).expect("save");
        index.save(Link::new("a.pdf", "other.md", false)).expect("save");

        let reopened = LinkIndex::open(vault, INDEX);
        assert_eq!(
            reopened.all(),
            &[Link::new("a.pdf", "other.md", false), Link::new("b.pdf", "b.md", false)]
        );
    }

    #[test]
    fn index_file_uses_camel_case_fields() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault.clone(), INDEX);
        index.save(Link::new("a.pdf", "a.md", true)).expect("save");
        let raw: serde_json::Value =
            serde_json::from_str(&vault.read(INDEX).expect("read").text).expect("json");
        assert_eq!(raw["a.pdf"]["notePath"], "a.md");
        assert_eq!(raw["a.pdf"]["isPageMode"], true);
    }

    #[test]
    fn find_by_note_returns_first_in_insertion_order() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault, INDEX);
        index.save(Link::new("z.pdf", "shared.md", true)).expect("save");
        index.save(Link::new("a.pdf", "shared.md", true)).expect("save");
        assert_eq!(
            index.find_by_note("shared.md").map(|l| l.document_path.as_str()),
            Some("z.pdf")
        );
        assert_eq!(index.find_all_by_note("shared.md").len(), 2);
    }

    #[test]
    fn update_document_path_rekeys_link() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault, INDEX);
        index.save(Link::new("old.pdf", "n.md", false)).expect("save");
        assert!(index.update_document_path("old.pdf", "new.pdf").expect("update"));

        assert_eq!(index.find_by_document("old.pdf"), None);
        assert_eq!(index.find_by_document("new.pdf"), Some(&Link::new("new.pdf", "n.md", false)));
        assert!(!index.update_document_path("missing.pdf", "x.pdf").expect("update"));
    }

    #[test]
    fn update_document_path_replaces_existing_target_key() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault, INDEX);
        index.save(Link::new("old.pdf", "old.md", true)).expect("save");
        index.save(Link::new("new.pdf", "stale.md", true)).expect("save");
        index.update_document_path("old.pdf", "new.pdf").expect("update");
        assert_eq!(index.all(), &[Link::new("new.pdf", "old.md", true)]);
    }

    #[test]
    fn update_note_path_rewrites_every_match() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault, INDEX);
        index.save(Link::new("a.pdf", "a.md", true)).expect("save");
        index.save(Link::new("b.pdf", "a.md", true)).expect("save");
        index.save(Link::new("c.pdf", "c.md", true)).expect("save");

        assert_eq!(index.update_note_path("a.md", "a2.md").expect("update"), 2);
        assert_eq!(index.find_by_document("a.pdf").map(|l| l.note_path.as_str()), Some("a2.md"));
        assert_eq!(index.find_by_document("b.pdf").map(|l| l.note_path.as_str()), Some("a2.md"));
        assert_eq!(index.find_by_document("c.pdf").map(|l| l.note_path.as_str()), Some("c.md"));
    }

    #[test]
    fn delete_and_page_mode_ignore_missing_entries() {
        let (_dir, vault) = vault();
        let mut index = LinkIndex::open(vault, INDEX);
        index.save(Link::new("a.pdf", "a.md", true)).expect("save");

        assert!(!index.update_page_mode("nope.pdf", false).expect("mode"));
        assert!(index.update_page_mode("a.pdf", false).expect("mode"));
        assert!(!index.find_by_document("a.pdf").expect("link").is_page_mode);

        assert!(!index.delete("nope.pdf").expect("delete"));
        assert!(index.delete("a.pdf").expect("delete"));
        assert_eq!(index.find_by_document("a.pdf"), None);
    }

    #[test_log::test]
    fn corrupt_index_degrades_to_empty() {
        let (_dir, vault) = vault();
        vault.write(INDEX, "{ not json", EolStyle::Lf).expect("write");
        let mut index = LinkIndex::open(vault.clone(), INDEX);
        assert!(index.all().is_empty());

        index.save(Link::new("a.pdf", "a.md", true)).expect("save");
        let reopened = LinkIndex::open(vault, INDEX);
        assert_eq!(reopened.all().len(), 1);
    }

    #[test_log::test]
    fn legacy_and_malformed_entries() {
        let (_dir, vault) = vault();
        vault
            .write(
                INDEX,
                concat!(
                    r#"{"old.pdf": "old.md", "bad.pdf": 42, "#,
                    r#""new.pdf": {"notePath": "new.md", "isPageMode": false}}"#,
                ),
                EolStyle::Lf,
            )
            .expect("write");
        let index = LinkIndex::open(vault, INDEX);
        assert_eq!(
            index.all(),
            &[Link::new("old.pdf", "old.md", true), Link::new("new.pdf", "new.md", false)]
        );
    }

    #[test]
    fn filter_and_paginate_links() {
        let links: Vec<Link> = (1..=23)
            .map(|i| Link::new(format!("Papers/p{i}.pdf"), format!("notes/p{i}.md"), true))
            .collect();

        assert_eq!(filter_links(&links, "").len(), 23);
        assert_eq!(filter_links(&links, "PAPERS/P2").len(), 5);
        assert_eq!(filter_links(&links, "notes/p17").len(), 1);

        let page = paginate_links(&links, 3, 10);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].document_path, "Papers/p21.pdf");

        let beyond = paginate_links(&links, 9, 10);
        assert!(beyond.items.is_empty());
        assert_eq!(paginate_links::<Link>(&[], 1, 10).total_pages, 0);
    }

    #[test]
    fn paginate_far_past_the_end_is_empty() {
        let links = vec![Link::new("a.pdf", "a.md", true)];
        let page = paginate_links(&links, usize::MAX, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.total, 1);
    }
}
