use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EolStyle {
    #[default]
    Lf,
    Crlf,
}

#[derive(Debug, Clone)]
pub struct FileData {
    pub text: String,
    pub eol: EolStyle,
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed reading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file already exists: {path}")]
    AlreadyExists { path: String },
    #[error("failed renaming {from} to {to}: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed removing {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed serializing link index {path}: {source}")]
    IndexSerialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IoError {
    pub fn is_not_found(&self) -> bool {
        match self {
            IoError::Read { source, .. } | IoError::Write { source, .. } => {
                source.kind() == ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Storage the notes live in. Paths are vault-relative and `/`-separated.
pub trait Vault {
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<FileData, IoError>;
    fn write(&self, path: &str, text: &str, eol: EolStyle) -> Result<(), IoError>;
    /// Creates a new file, and its parent folders. Fails if the file exists.
    fn create(&self, path: &str, text: &str) -> Result<(), IoError>;
    fn create_dir_all(&self, path: &str) -> Result<(), IoError>;
    fn rename(&self, from: &str, to: &str) -> Result<(), IoError>;
    fn remove(&self, path: &str) -> Result<(), IoError>;
    /// All files with the given extension, sorted.
    fn list_files(&self, extension: &str) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let trimmed = path.trim_start_matches("./").trim_start_matches('/');
        let mut out = self.root.clone();
        for part in trimmed.split('/').filter(|p| !p.is_empty()) {
            out.push(part);
        }
        out
    }

    fn collect_files(&self, dir: &Path, extension: &str, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                self.collect_files(&path, extension, out);
            } else if path.extension().map(|e| e == extension).unwrap_or(false) {
                if let Some(rel) = relative_path(&self.root, &path) {
                    out.push(rel);
                }
            }
        }
    }
}

impl Vault for FsVault {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn read(&self, path: &str) -> Result<FileData, IoError> {
        load_document(&self.resolve(path)).map_err(|e| match e {
            IoError::Read { source, .. } => IoError::Read {
                path: path.to_string(),
                source,
            },
            other => other,
        })
    }

    fn write(&self, path: &str, text: &str, eol: EolStyle) -> Result<(), IoError> {
        save_document(&self.resolve(path), text, eol).map_err(|e| match e {
            IoError::Write { source, .. } => IoError::Write {
                path: path.to_string(),
                source,
            },
            other => other,
        })
    }

    fn create(&self, path: &str, text: &str) -> Result<(), IoError> {
        let full = self.resolve(path);
        if full.exists() {
            return Err(IoError::AlreadyExists {
                path: path.to_string(),
            });
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|source| IoError::Write {
                path: path.to_string(),
                source,
            })?;
        }
        fs::write(&full, text).map_err(|source| IoError::Write {
            path: path.to_string(),
            source,
        })
    }

    fn create_dir_all(&self, path: &str) -> Result<(), IoError> {
        fs::create_dir_all(self.resolve(path)).map_err(|source| IoError::Write {
            path: path.to_string(),
            source,
        })
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), IoError> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| IoError::Write {
                path: to.to_string(),
                source,
            })?;
        }
        fs::rename(self.resolve(from), target).map_err(|source| IoError::Rename {
            from: from.to_string(),
            to: to.to_string(),
            source,
        })
    }

    fn remove(&self, path: &str) -> Result<(), IoError> {
        fs::remove_file(self.resolve(path)).map_err(|source| IoError::Remove {
            path: path.to_string(),
            source,
        })
    }

    fn list_files(&self, extension: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_files(&self.root, extension, &mut out);
        out.sort();
        out
    }
}

pub fn load_document(path: &Path) -> Result<FileData, IoError> {
    let bytes = fs::read(path).map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw = String::from_utf8_lossy(&bytes).to_string();
    let eol = detect_eol(&raw);
    let text = raw.replace("\r\n", "\n");
    Ok(FileData { text, eol })
}

pub fn save_document(path: &Path, text: &str, eol: EolStyle) -> Result<(), IoError> {
    let out = match eol {
        EolStyle::Lf => text.to_string(),
        EolStyle::Crlf => text.replace('\n', "\r\n"),
    };
    fs::write(path, out).map_err(|source| IoError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn detect_eol(content: &str) -> EolStyle {
    if content.contains("\r\n") {
        EolStyle::Crlf
    } else {
        EolStyle::Lf
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Splits a vault path into `(folder, file stem, extension)`.
pub fn split_path(path: &str) -> (&str, &str, Option<&str>) {
    let (folder, file) = match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    };
    match file.rfind('.') {
        Some(idx) if idx > 0 => (folder, &file[..idx], Some(&file[idx + 1..])),
        _ => (folder, file, None),
    }
}

pub fn extension_of(path: &str) -> Option<&str> {
    split_path(path).2
}

/// Joins vault path segments, skipping empty ones and stray `./` prefixes.
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_start_matches("./").trim_matches('/'))
        .filter(|p| !p.is_empty() && *p != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{
        EolStyle, FsVault, IoError, Vault, detect_eol, extension_of, join_path, load_document,
        save_document, split_path,
    };

    #[test]
    fn eol_detection_and_preservation_work() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("f.md");
        std::fs::write(&path, "a\r\nb\r\n").expect("write");
        let doc = load_document(&path).expect("load");
        assert_eq!(doc.eol, EolStyle::Crlf);
        assert_eq!(doc.text, "a\nb\n");

        save_document(&path, &doc.text, doc.eol).expect("save");
        let saved = std::fs::read_to_string(&path).expect("read");
        assert!(saved.contains("\r\n"));
        assert_eq!(detect_eol(&saved), EolStyle::Crlf);
    }

    #[test]
    fn create_makes_parents_and_refuses_to_overwrite() {
        let dir = tempdir().expect("tempdir");
        let vault = FsVault::new(dir.path());
        vault.create("papers/notes/a.md", "").expect("create");
        assert!(vault.exists("papers/notes/a.md"));

        let err = vault.create("papers/notes/a.md", "x").unwrap_err();
        assert!(matches!(err, IoError::AlreadyExists { .. }));
    }

    #[test]
    fn read_of_missing_file_reports_not_found_with_vault_path() {
        let dir = tempdir().expect("tempdir");
        let vault = FsVault::new(dir.path());
        let err = vault.read("nope.md").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("nope.md"));
    }

    #[test]
    fn list_files_walks_subfolders_with_forward_slashes() {
        let dir = tempdir().expect("tempdir");
        let vault = FsVault::new(dir.path());
        vault.create("b.md", "").expect("create");
        vault.create("x/y/a.md", "").expect("create");
        vault.create("x/doc.pdf", "").expect("create");
        assert_eq!(vault.list_files("md"), vec!["b.md", "x/y/a.md"]);
    }

    #[test]
    fn rename_moves_file_into_new_folder() {
        let dir = tempdir().expect("tempdir");
        let vault = FsVault::new(dir.path());
        vault.create("a.md", "hi").expect("create");
        vault.rename("a.md", "archive/a2.md").expect("rename");
        assert!(!vault.exists("a.md"));
        assert_eq!(vault.read("archive/a2.md").expect("read").text, "hi");
    }

    #[test]
    fn path_helpers_split_and_join() {
        assert_eq!(split_path("a/b/c.pdf"), ("a/b", "c", Some("pdf")));
        assert_eq!(split_path("c.pdf"), ("", "c", Some("pdf")));
        assert_eq!(split_path("a/.hidden"), ("a", ".hidden", None));
        assert_eq!(extension_of("x/y.md"), Some("md"));
        assert_eq!(join_path(&["", "notes", "a.md"]), "notes/a.md");
        assert_eq!(join_path(&["./notes/", "a.md"]), "notes/a.md");
        assert_eq!(join_path(&["docs", ".", "a.md"]), "docs/a.md");
    }
}
