use crate::model::PersistedState;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "harmony";
const STATE_FILE: &str = "state.json";
pub const CONFIG_DIR_ENV: &str = "HARMONY_CONFIG_DIR";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn state_path_in(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn state_path() -> Result<PathBuf> {
    Ok(state_path_in(&config_root()?))
}

pub fn load_state_from_path(path: &Path) -> Result<PersistedState> {
    if !path.exists() {
        return Ok(PersistedState::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state: PersistedState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    Ok(state)
}

/// Loads the stored playlists and favorites, falling back to an empty state
/// when the file is unreadable or corrupt.
pub fn load_state_or_default(path: &Path) -> PersistedState {
    match load_state_from_path(path) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!("starting with empty library state: {err:#}");
            PersistedState::default()
        }
    }
}

pub fn save_state_to_path(path: &Path, state: &PersistedState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Playlist, PlaylistId, SongId};
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = state_path_in(&dir.path().join("nested"));

        let state = PersistedState {
            playlists: vec![Playlist {
                id: PlaylistId::new("1"),
                name: String::from("mix"),
                songs: vec![SongId::new("a"), SongId::new("a")],
                created_at: 1,
                cover_art: None,
            }],
            favorites: vec![SongId::new("b")],
        };
        save_state_to_path(&path, &state).expect("save");
        let loaded = load_state_from_path(&path).expect("load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_state_from_path(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded, PersistedState::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_empty_state() {
        let dir = tempdir().expect("tempdir");
        let path = state_path_in(dir.path());
        fs::write(&path, "{ not json").expect("write");

        assert!(load_state_from_path(&path).is_err());
        assert_eq!(load_state_or_default(&path), PersistedState::default());
    }

    #[test]
    fn env_override_wins_for_config_root() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var(CONFIG_DIR_ENV, dir.path().to_string_lossy().as_ref());
        }
        assert_eq!(config_root().expect("root"), dir.path());
        assert_eq!(state_path().expect("path"), dir.path().join(STATE_FILE));
    }
}
