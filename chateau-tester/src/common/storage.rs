use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chateau_game::{GameStorage, PlayerState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save file {path} is not a valid snapshot: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One pretty-printed JSON file per save slot.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn slot_path(&self, save_name: &str) -> PathBuf {
        self.dir.join(format!("{save_name}.json"))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl GameStorage for JsonFileStorage {
    type Error = StorageError;

    fn save_game(&self, save_name: &str, game_state: &PlayerState) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir).map_err(|err| Self::io_error(&self.dir, err))?;
        let path = self.slot_path(save_name);
        let json = serde_json::to_string_pretty(game_state).map_err(|source| {
            StorageError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|err| Self::io_error(&path, err))
    }

    fn load_game(&self, save_name: &str) -> Result<Option<PlayerState>, Self::Error> {
        let path = self.slot_path(save_name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::io_error(&path, err)),
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StorageError::Json { path, source })
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(save_name);
        match fs::remove_file(&path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(Self::io_error(&path, err)),
            _ => Ok(()),
        }
    }
}
