mod filesystem;

pub use filesystem::{
    EolStyle, FileData, FsVault, IoError, Vault, detect_eol, extension_of, join_path,
    load_document, save_document, split_path,
};
