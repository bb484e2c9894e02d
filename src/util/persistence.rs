//! Platform directories for the configuration file and the snapshot store.

use std::path::PathBuf;

use directories::ProjectDirs;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "CraftValueScanner";
const APP_DIR_NAME: &str = "craft-value-scanner";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_DIR_NAME)
}

/// Default location of `config.toml`.
pub fn config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Root of the snapshot store. Falls back to the working directory when the
/// platform has no local data directory.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
