// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the SYNERGY_HOME environment variable for isolation.
// When SYNERGY_HOME is set, config and data live under that directory.
// When unset, config uses ~/.synergy/ and data uses XDG_DATA_HOME/synergy.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;
use std::sync::OnceLock;

static PROJECT_DIRS: OnceLock<Option<ProjectDirs>> = OnceLock::new();

fn project_dirs() -> Option<&'static ProjectDirs> {
    PROJECT_DIRS
        .get_or_init(|| ProjectDirs::from("", "", "synergy"))
        .as_ref()
}

/// Returns the SYNERGY_HOME override, if set.
fn synergy_home() -> Option<PathBuf> {
    std::env::var_os("SYNERGY_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when no home can be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $SYNERGY_HOME/ or ~/.synergy/
pub fn config_dir() -> PathBuf {
    if let Some(home) = synergy_home() {
        return home;
    }
    dirs_home().join(".synergy")
}

/// Data directory: $SYNERGY_HOME/data/ or ~/.local/share/synergy/
pub fn data_dir() -> PathBuf {
    if let Some(home) = synergy_home() {
        return home.join("data");
    }
    match project_dirs() {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Default location of the persisted vector table
pub fn vector_store_path() -> PathBuf {
    data_dir().join("embeddings.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_store_lives_under_data_dir() {
        let path = vector_store_path();
        assert!(path.starts_with(data_dir()));
        assert_eq!(path.file_name().unwrap(), "embeddings.db");
    }

    #[test]
    fn test_config_file_name() {
        assert_eq!(config_file_path().file_name().unwrap(), "config.toml");
    }
}
