pub mod init;
pub mod publish;
pub mod status;

use std::path::{Path, PathBuf};

use pagesync_core::config::CONFIG_FILE_NAME;

/// `--config` if given, else `pagesync.yaml` in the working directory.
pub(crate) fn config_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Directory holding the config file, for source revision lookups.
pub(crate) fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
