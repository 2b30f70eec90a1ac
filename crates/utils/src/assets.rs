use std::{env, path::PathBuf};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const DATA_DIR_ENV: &str = "ECHO_DATA_DIR";

/// Resolve the root data directory for asset files and metadata records.
///
/// Order of precedence: `ECHO_DATA_DIR`, then a `dev_assets/` folder next to
/// the workspace in debug builds, then the platform data dir.
pub fn data_dir() -> PathBuf {
    let path = if let Ok(custom_dir) = env::var(DATA_DIR_ENV) {
        PathBuf::from(custom_dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("ai", "echo", "echo")
            .expect("OS didn't give us a home directory")
            .data_dir()
            .to_path_buf()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).expect("Failed to create data directory");
    }

    path
    // ✔ macOS → ~/Library/Application Support/echo
    // ✔ Linux → ~/.local/share/echo   (respects XDG_DATA_HOME)
    // ✔ Windows → %APPDATA%\echo\echo
}
