use std::io::{self, Write};

use crate::app::{AppState, Notifier};
use crate::io::split_path;
use crate::store::{Link, PaginatedLinks};

pub struct UiModel<'a> {
    pub state: &'a AppState,
    pub content: &'a str,
    pub hint: &'a str,
}

pub fn status_line(state: &AppState) -> String {
    let Some(document) = &state.current_document else {
        return "[no document]".to_string();
    };
    let mode = match state.is_page_mode {
        Some(true) => "page mode",
        Some(false) => "single note",
        None => "unlinked",
    };
    let mut line = format!("[{}] page {} | {mode}", document.path, state.current_page);
    if let Some(top) = state.navigation_stack.last() {
        line.push_str(&format!(
            " | sub-note {} (depth {})",
            split_path(top).1,
            state.navigation_stack.len()
        ));
    }
    line
}

pub fn draw(out: &mut impl Write, model: UiModel<'_>) -> io::Result<()> {
    writeln!(out, "{}", status_line(model.state))?;
    writeln!(out, "{}", "-".repeat(40))?;
    if model.content.trim().is_empty() {
        writeln!(out, "(empty)")?;
    } else {
        writeln!(out, "{}", model.content.trim_end())?;
    }
    writeln!(out, "{}", "-".repeat(40))?;
    if !model.hint.is_empty() {
        writeln!(out, "{}", model.hint)?;
    }
    out.flush()
}

pub fn draw_links(out: &mut impl Write, page: &PaginatedLinks<Link>) -> io::Result<()> {
    if page.items.is_empty() {
        writeln!(out, "no links")?;
        return out.flush();
    }
    for link in &page.items {
        let mode = if link.is_page_mode { "pages" } else { "single" };
        writeln!(out, "{} -> {} ({mode})", link.document_path, link.note_path)?;
    }
    writeln!(
        out,
        "page {}/{} ({} links)",
        page.page,
        page.total_pages.max(1),
        page.total
    )?;
    out.flush()
}

pub const SESSION_HELP: &str = "\
open <doc.pdf>            switch document
page <n>                  viewer moved to page n
edit <text>               edit the shown note (\\n for newline), saved after a pause
save                      save pending edit now
show                      print the shown note
follow <name>             open a sub-note
back | home               leave one sub-note | all sub-notes
mode                      toggle page mode for the document
link <doc> <note> [page|single]
create [page|single]      create a note for the last opened document
mv <from> <to> | rm <path>
status | help | quit";

/// Prints user notices to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn broken_link(&mut self, document_path: &str) {
        eprintln!("No note is linked to {document_path}.");
        eprintln!("Link one with `link {document_path} <note.md>` or run `create`.");
    }
}

#[cfg(test)]
mod tests {
    use super::{UiModel, draw, draw_links, status_line};
    use crate::app::{DocumentRef, StateManager};
    use crate::config::Settings;
    use crate::store::{LINKS_PER_PAGE, Link, paginate_links};

    #[test]
    fn status_line_shows_document_page_and_sub_note() {
        let mut m = StateManager::new(Settings::default());
        assert_eq!(status_line(m.state()), "[no document]");

        m.set_current_document(Some(DocumentRef::new("a.pdf")), Some(true));
        m.set_current_page(4);
        m.push_navigation("notes/Ideas.md");
        assert_eq!(
            status_line(m.state()),
            "[a.pdf] page 4 | page mode | sub-note Ideas (depth 1)"
        );
    }

    #[test]
    fn draw_marks_empty_note() {
        let m = StateManager::new(Settings::default());
        let mut out = Vec::new();
        draw(
            &mut out,
            UiModel {
                state: m.state(),
                content: "  ",
                hint: "",
            },
        )
        .expect("draw");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("(empty)"));
    }

    #[test]
    fn draw_links_lists_page() {
        let links = vec![Link::new("a.pdf", "a.md", true), Link::new("b.pdf", "b.md", false)];
        let mut out = Vec::new();
        draw_links(&mut out, &paginate_links(&links, 1, LINKS_PER_PAGE)).expect("draw");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "a.pdf -> a.md (pages)\nb.pdf -> b.md (single)\npage 1/1 (2 links)\n");
    }
}
