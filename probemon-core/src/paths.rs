//! Default filesystem locations shared by the daemon and CLI.

use std::path::PathBuf;

/// Get the probemon data directory.
///
/// Resolution order:
/// 1. `PROBEMON_DATA_DIR` environment variable
/// 2. `/var/lib/probemon` if it exists (system install)
/// 3. `~/.probemon` for user-only installs
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PROBEMON_DATA_DIR") {
        return PathBuf::from(dir);
    }

    let system_dir = PathBuf::from("/var/lib/probemon");
    if system_dir.exists() {
        return system_dir;
    }

    dirs::home_dir().map(|h| h.join(".probemon")).unwrap_or(system_dir)
}

/// Get the configuration file path.
///
/// `PROBEMON_CONFIG` wins over the data directory default.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PROBEMON_CONFIG") {
        return PathBuf::from(path);
    }
    data_dir().join("config.json")
}

/// Get the default series database path.
pub fn db_path() -> PathBuf {
    data_dir().join("probemon.sqlite")
}
