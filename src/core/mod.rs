mod codec;
mod commands;

pub use codec::{PAGE_HEADER, PageNotes, PageNumber, generate_pages, parse_pages};
pub use commands::Command;
