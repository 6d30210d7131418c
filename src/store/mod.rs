mod links;
mod notes;

use thiserror::Error;

use crate::io::IoError;

pub use links::{LINKS_PER_PAGE, Link, LinkIndex, PaginatedLinks, filter_links, paginate_links};
pub use notes::NoteStore;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("no linked note for {document}")]
    NoLinkedNote { document: String },
    #[error("linked note file is missing: {path}")]
    NoteFileMissing { path: String },
    #[error("file not found: {path}")]
    FileNotFound { path: String },
    #[error("invalid link: {reason}")]
    InvalidLink { reason: String },
    #[error("not editing a sub-note")]
    NoSubNote,
    #[error(transparent)]
    Io(#[from] IoError),
}

impl NoteError {
    /// Errors the user fixes by repairing or creating the link.
    pub fn is_broken_link(&self) -> bool {
        matches!(
            self,
            NoteError::NoLinkedNote { .. } | NoteError::NoteFileMissing { .. }
        )
    }
}
