use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelMapError {
    #[error("Failed to read label map '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse label map: {0}")]
    Json(#[from] serde_json::Error),
}

/// Class name to YOLO class index, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    ids: HashMap<String, i64>,
}

impl LabelMap {
    pub fn from_json(content: &str) -> Result<Self, LabelMapError> {
        let ids = serde_json::from_str(content)?;
        Ok(Self { ids })
    }

    pub fn from_path(path: &Path) -> Result<Self, LabelMapError> {
        let content = std::fs::read_to_string(path).map_err(|source| LabelMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn get(&self, class_name: &str) -> Option<i64> {
        self.ids.get(class_name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
