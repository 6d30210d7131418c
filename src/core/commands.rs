use super::PageNumber;

/// Actions the interactive session understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(String),
    Page(PageNumber),
    Edit(String),
    Save,
    Show,
    Follow(String),
    Back,
    Home,
    TogglePageMode,
    Link {
        document: String,
        note: String,
        page_mode: Option<bool>,
    },
    CreateNote {
        page_mode: Option<bool>,
    },
    Rename {
        from: String,
        to: String,
    },
    Remove(String),
    Status,
    Help,
    Quit,
}
