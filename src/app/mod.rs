mod debounce;
mod service;
mod state;
mod subnotes;

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

pub use debounce::SaveDebouncer;
pub use service::{
    DOCUMENT_EXTENSION, NOTE_EXTENSION, Notifier, NotesService, PageEvents, is_document, is_note,
};
pub use state::{AppState, DocumentRef, Listener, StateManager, SubscriptionId};
pub use subnotes::SubNoteNavigator;

use crate::config::Settings;
use crate::core::{Command, PageNumber};
use crate::input::map_line;
use crate::io::{FsVault, Vault};
use crate::store::{LINKS_PER_PAGE, NoteError, filter_links, paginate_links};
use crate::ui::{ConsoleNotifier, SESSION_HELP, UiModel, draw, draw_links, status_line};

const TICK: Duration = Duration::from_millis(120);

#[derive(Parser, Debug)]
#[command(author, version, about = "pagenotes - page-by-page notes for PDF documents")]
struct Cli {
    /// Folder holding documents, notes and the link index.
    #[arg(long, default_value = ".")]
    vault: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Link a document to an existing note file.
    Link {
        document: String,
        note: String,
        /// Store the note as one undivided text instead of per page.
        #[arg(long)]
        single: bool,
    },
    /// Remove the link of a document or note.
    Unlink { path: String },
    /// List links.
    Links {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Print the note of a document.
    Show {
        document: String,
        #[arg(long)]
        page: Option<PageNumber>,
    },
    /// Replace the note of a document (or of one page).
    Write {
        document: String,
        #[arg(long)]
        page: Option<PageNumber>,
        text: String,
    },
    /// Rename a document or note and keep links pointing at it.
    Mv { from: String, to: String },
    /// Delete a document or note and its link.
    Rm { path: String },
    /// Interactive session reading commands from stdin.
    Session { document: Option<String> },
}

/// Page changes typed into the session, standing in for a viewer.
#[derive(Default)]
struct TypedPages(VecDeque<PageNumber>);

impl PageEvents for TypedPages {
    fn next_page_change(&mut self) -> Option<PageNumber> {
        self.0.pop_front()
    }
}

struct Session {
    debouncer: SaveDebouncer,
    pages: TypedPages,
    last_opened: Option<String>,
    running: bool,
}

impl Session {
    fn new(settings: &Settings) -> Self {
        Self {
            debouncer: SaveDebouncer::new(Duration::from_millis(settings.debounce_ms)),
            pages: TypedPages::default(),
            last_opened: None,
            running: true,
        }
    }

    fn save_now(&mut self, service: &mut NotesService, content: String) {
        if let Err(e) = service.save(&content) {
            warn!("save failed: {e}");
            eprintln!("Failed to save note: {e}");
        }
    }

    /// Writes a pending edit before the shown note changes.
    fn force_save(&mut self, service: &mut NotesService) {
        if let Some(content) = self.debouncer.take() {
            debug!("force-saving pending edit");
            self.save_now(service, content);
        }
    }

    fn show(&self, service: &mut NotesService) -> Result<()> {
        let content = service.current_content();
        let state = service.state();
        draw(
            &mut io::stdout(),
            UiModel {
                state: state.state(),
                content: &content,
                hint: session_hint(state),
            },
        )
        .context("writing note")
    }

    fn report(&self, result: Result<String, NoteError>, service: &mut NotesService) -> Result<()> {
        match result {
            Ok(_) => self.show(service),
            Err(e) => {
                eprintln!("{e}");
                Ok(())
            }
        }
    }

    fn apply(&mut self, service: &mut NotesService, cmd: Command) -> Result<()> {
        match cmd {
            Command::Open(path) => {
                self.force_save(service);
                self.last_opened = Some(path.clone());
                if service.open_document(Some(&path)) {
                    self.show(service)?;
                }
            }
            Command::Page(page) => {
                self.force_save(service);
                self.pages.0.push_back(page);
            }
            Command::Edit(text) => {
                if service.state().current_document().is_none() {
                    eprintln!("no document is open");
                } else {
                    self.debouncer.schedule(text, Instant::now());
                }
            }
            Command::Save => self.force_save(service),
            Command::Show => {
                self.force_save(service);
                self.show(service)?;
            }
            Command::Follow(name) => {
                self.force_save(service);
                let result = service.sub_notes().open(&name);
                self.report(result, service)?;
            }
            Command::Back => {
                self.force_save(service);
                let result = service.sub_notes().back();
                self.report(result, service)?;
            }
            Command::Home => {
                self.force_save(service);
                let result = service.sub_notes().home();
                self.report(result, service)?;
            }
            Command::TogglePageMode => {
                self.force_save(service);
                match service.toggle_page_mode() {
                    Ok(_) => self.show(service)?,
                    Err(e) => eprintln!("{e}"),
                }
            }
            Command::Link {
                document,
                note,
                page_mode,
            } => {
                self.force_save(service);
                if let Err(e) = service.link_document(&document, &note, page_mode) {
                    eprintln!("{e}");
                }
            }
            Command::CreateNote { page_mode } => {
                self.force_save(service);
                let Some(document) = self.last_opened.clone() else {
                    eprintln!("open a document first");
                    return Ok(());
                };
                match service.repair_with_new_note(&document, page_mode) {
                    Ok(_) => self.show(service)?,
                    Err(e) => eprintln!("{e}"),
                }
            }
            Command::Rename { from, to } => {
                self.force_save(service);
                if let Err(e) = rename_path(service, &from, &to) {
                    eprintln!("{e:#}");
                }
            }
            Command::Remove(path) => {
                self.force_save(service);
                if let Err(e) = remove_path(service, &path) {
                    eprintln!("{e:#}");
                }
            }
            Command::Status => eprintln!("{}", status_line(service.state().state())),
            Command::Help => println!("{SESSION_HELP}"),
            Command::Quit => self.running = false,
        }
        Ok(())
    }

    /// Runs one line of input. Failures are reported and the session goes on.
    fn handle_line(&mut self, service: &mut NotesService, line: io::Result<String>) {
        let result = line.context("reading stdin").and_then(|line| {
            let line = line.trim();
            if line.is_empty() {
                return Ok(());
            }
            match map_line(line) {
                Some(cmd) => self.apply(service, cmd),
                None => {
                    eprintln!("unknown command: {line} (try `help`)");
                    Ok(())
                }
            }
        });
        report_failure(result);
    }

    /// Work done on every loop iteration: viewer page changes, then due saves.
    fn tick(&mut self, service: &mut NotesService, now: Instant) -> Result<()> {
        if service.pump_page_events(&mut self.pages) > 0 {
            self.show(service)?;
        }
        if let Some(content) = self.debouncer.poll(now) {
            self.save_now(service, content);
        }
        Ok(())
    }
}

fn report_failure(result: Result<()>) {
    if let Err(e) = result {
        warn!("session step failed: {e:#}");
        eprintln!("{e:#}");
    }
}

fn session_hint(state: &StateManager) -> &'static str {
    if state.current_document().is_none() {
        "open <doc.pdf> | link <doc> <note> | help"
    } else if state.is_in_sub_note() {
        "edit <text> | follow <name> | back | home | help"
    } else {
        "edit <text> | page <n> | follow <name> | mode | help"
    }
}

fn rename_path(service: &mut NotesService, from: &str, to: &str) -> Result<()> {
    service
        .vault()
        .rename(from, to)
        .with_context(|| format!("renaming {from} to {to}"))?;
    service
        .on_renamed(from, to)
        .with_context(|| format!("updating links for {to}"))?;
    Ok(())
}

fn remove_path(service: &mut NotesService, path: &str) -> Result<()> {
    service
        .vault()
        .remove(path)
        .with_context(|| format!("deleting {path}"))?;
    service
        .on_deleted(path)
        .with_context(|| format!("updating links for {path}"))?;
    Ok(())
}

fn run_session(service: &mut NotesService, document: Option<String>) {
    let subscription = service
        .state_mut()
        .subscribe(|state| eprintln!("{}", status_line(state)));

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(service.state().settings());
    if let Some(document) = document {
        report_failure(session.apply(service, Command::Open(document)));
    }

    while session.running {
        match rx.recv_timeout(TICK) {
            Ok(line) => session.handle_line(service, line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => session.running = false,
        }
        report_failure(session.tick(service, Instant::now()));
    }

    session.force_save(service);
    service.state_mut().unsubscribe(subscription);
    service.state_mut().teardown();
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = std::env::var("RUST_LOG").map_or_else(
        |_| {
            let level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(level)
        },
        EnvFilter::new,
    );

    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn open_for_document(service: &mut NotesService, document: &str) -> Result<()> {
    if !service.vault().exists(document) {
        anyhow::bail!("document not found: {document}");
    }
    if !service.open_document(Some(document)) {
        anyhow::bail!("no note available for {document}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::load_or_create(&Settings::config_path()),
    };
    if !cli.vault.is_dir() {
        anyhow::bail!("vault folder not found: {}", cli.vault.display());
    }
    let vault: Rc<dyn Vault> = Rc::new(FsVault::new(cli.vault.clone()));
    let mut service = NotesService::new(vault, settings, Box::new(ConsoleNotifier));

    match cli.command.unwrap_or(CliCommand::Session { document: None }) {
        CliCommand::Link {
            document,
            note,
            single,
        } => {
            service
                .link_document(&document, &note, single.then_some(false))
                .with_context(|| format!("linking {document} to {note}"))?;
        }
        CliCommand::Unlink { path } => match service.unlink(&path).context("removing link")? {
            Some(document) => println!("unlinked {document}"),
            None => println!("no link found for {path}"),
        },
        CliCommand::Links { search, page } => {
            let term = search.as_deref().unwrap_or("");
            let matching: Vec<_> = filter_links(service.links().all(), term)
                .into_iter()
                .cloned()
                .collect();
            draw_links(&mut io::stdout(), &paginate_links(&matching, page, LINKS_PER_PAGE))
                .context("writing links")?;
        }
        CliCommand::Show { document, page } => {
            open_for_document(&mut service, &document)?;
            if let Some(page) = page {
                service.on_page_changed(page);
            }
            let content = service
                .try_current_content()
                .with_context(|| format!("reading note for {document}"))?;
            println!("{content}");
        }
        CliCommand::Write {
            document,
            page,
            text,
        } => {
            open_for_document(&mut service, &document)?;
            if let Some(page) = page {
                service.on_page_changed(page);
            }
            service
                .save(&text.replace("\\n", "\n"))
                .with_context(|| format!("saving note for {document}"))?;
        }
        CliCommand::Mv { from, to } => rename_path(&mut service, &from, &to)?,
        CliCommand::Rm { path } => remove_path(&mut service, &path)?,
        CliCommand::Session { document } => run_session(&mut service, document),
    }
    Ok(())
}
