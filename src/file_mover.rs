//! FileMover collaborator: routes a source document into the
//! `processed` or `failed` area after Stage-2 completes. A `Stopped`
//! outcome leaves the file in place.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Processed,
    Failed,
}

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait FileMover: Send + Sync {
    fn move_to(&self, area: Area, path: &Path) -> Result<PathBuf, MoveError>;
}

/// Moves files into `<root>/processed` or `<root>/failed`, creating
/// either directory on first use.
pub struct FilesystemMover {
    root: PathBuf,
}

impl FilesystemMover {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn area_dir(&self, area: Area) -> PathBuf {
        match area {
            Area::Processed => self.root.join("processed"),
            Area::Failed => self.root.join("failed"),
        }
    }
}

impl FileMover for FilesystemMover {
    fn move_to(&self, area: Area, path: &Path) -> Result<PathBuf, MoveError> {
        let dir = self.area_dir(area);
        std::fs::create_dir_all(&dir)?;

        let file_name = path.file_name().unwrap_or_default();
        let destination = dir.join(file_name);
        std::fs::rename(path, &destination)?;
        Ok(destination)
    }
}
