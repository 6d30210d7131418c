//! Text format of a page-mode note file.
//!
//! A page-mode note is a sequence of sections, each opened by a header line
//! `## Page <n>` and running until the next header line or end of input:
//!
//! ```text
//! ## Page 1
//! first page notes
//!
//! ## Page 3
//! third page notes
//! ```
//!
//! Text before the first header is not part of any page. A body line that
//! itself looks like a header starts a new section.

use std::collections::BTreeMap;

pub type PageNumber = u32;

/// Sparse page → note text mapping for one document.
pub type PageNotes = BTreeMap<PageNumber, String>;

pub const PAGE_HEADER: &str = "## Page";

fn header_page(line: &str) -> Option<PageNumber> {
    let rest = line.strip_prefix(PAGE_HEADER)?;
    let number = rest.strip_prefix(' ')?.trim_end();
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

fn close_section(pages: &mut PageNotes, page: Option<PageNumber>, body: &[&str]) {
    let Some(page) = page else {
        return;
    };
    let content = body.join("\n");
    let content = content.trim();
    if content.is_empty() {
        pages.remove(&page);
    } else {
        pages.insert(page, content.to_string());
    }
}

/// Decodes page sections. Bodies are trimmed; a section whose body is empty
/// is treated as no note for that page. A repeated header overrides the
/// earlier section for the same page.
pub fn parse_pages(text: &str) -> PageNotes {
    let mut pages = PageNotes::new();
    let mut current: Option<PageNumber> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(page) = header_page(line) {
            close_section(&mut pages, current, &body);
            current = Some(page);
            body.clear();
        } else if current.is_some() {
            body.push(line);
        }
    }
    close_section(&mut pages, current, &body);
    pages
}

/// Encodes pages in ascending page order. Pages with blank content are left
/// out entirely.
pub fn generate_pages(pages: &PageNotes) -> String {
    pages
        .iter()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(page, content)| format!("{PAGE_HEADER} {page}\n{content}\n"))
        .collect::<Vec<_>>()
        .join("\n")
}
