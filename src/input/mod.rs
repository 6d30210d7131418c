use crate::core::Command;

fn page_mode_arg(arg: Option<&str>) -> Option<Option<bool>> {
    match arg {
        None => Some(None),
        Some("page") | Some("pages") => Some(Some(true)),
        Some("single") => Some(Some(false)),
        Some(_) => None,
    }
}

/// Maps one session input line to a command. Unknown or malformed input
/// gives `None`.
pub fn map_line(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match (word.to_lowercase().as_str(), args.as_slice()) {
        ("open" | "o", [_, ..]) => Some(Command::Open(rest.to_string())),
        ("page" | "p", [n]) => n.parse().ok().map(Command::Page),
        ("edit" | "e", _) => Some(Command::Edit(rest.replace("\\n", "\n"))),
        ("save" | "w", []) => Some(Command::Save),
        ("show" | "s", []) => Some(Command::Show),
        ("follow" | "f", [_, ..]) => Some(Command::Follow(rest.to_string())),
        ("back" | "b", []) => Some(Command::Back),
        ("home", []) => Some(Command::Home),
        ("mode", []) => Some(Command::TogglePageMode),
        ("link", [document, note, tail @ ..]) if tail.len() <= 1 => {
            page_mode_arg(tail.first().copied()).map(|page_mode| Command::Link {
                document: document.to_string(),
                note: note.to_string(),
                page_mode,
            })
        }
        ("create", tail) if tail.len() <= 1 => {
            page_mode_arg(tail.first().copied()).map(|page_mode| Command::CreateNote { page_mode })
        }
        ("mv", [from, to]) => Some(Command::Rename {
            from: from.to_string(),
            to: to.to_string(),
        }),
        ("rm", [_, ..]) => Some(Command::Remove(rest.to_string())),
        ("status", []) => Some(Command::Status),
        ("help" | "?", []) => Some(Command::Help),
        ("quit" | "q" | "exit", []) => Some(Command::Quit),
        _ => None,
    }
}
