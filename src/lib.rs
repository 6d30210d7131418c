//! Page-by-page notes for PDF documents, stored as plain text files.
//!
//! A [`store::LinkIndex`] maps each document to its note file. In page mode
//! the note file holds one `## Page <n>` section per annotated page (see
//! [`crate::core::parse_pages`]); otherwise it is a single undivided note. The
//! [`app::NotesService`] ties the index, the [`store::NoteStore`] and the
//! observable [`app::StateManager`] together and reacts to viewer and storage
//! events, and [`app::SubNoteNavigator`] follows links between notes.

pub mod app;
pub mod config;
pub mod core;
pub mod input;
pub mod io;
pub mod store;
pub mod ui;
