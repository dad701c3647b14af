use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to create directory '{}': {source}", path.display())]
pub struct CreateDirError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// `<root>/images` and `<root>/labels`, side by side.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    images: PathBuf,
    labels: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            images: root.join("images"),
            labels: root.join("labels"),
        }
    }

    /// Creates both folders if missing. Existing content is left alone.
    pub fn create(&self) -> Result<(), CreateDirError> {
        for dir in [self.labels_dir(), self.images_dir()] {
            std::fs::create_dir_all(dir).map_err(|source| CreateDirError {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn images_dir(&self) -> &Path {
        &self.images
    }

    pub fn labels_dir(&self) -> &Path {
        &self.labels
    }

    pub fn image_path(&self, image_name: &str) -> PathBuf {
        self.images.join(image_name)
    }

    pub fn label_path(&self, image_name: &str) -> PathBuf {
        self.labels.join(image_name).with_extension("txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_path_replaces_extension() {
        let layout = DatasetLayout::new("/data");
        assert_eq!(
            layout.label_path("img1.jpg"),
            PathBuf::from("/data/labels/img1.txt")
        );
        assert_eq!(
            layout.label_path("archive.tar.png"),
            PathBuf::from("/data/labels/archive.tar.txt")
        );
        assert_eq!(layout.label_path("noext"), PathBuf::from("/data/labels/noext.txt"));
    }

    #[test]
    fn image_path_keeps_name() {
        let layout = DatasetLayout::new("/data");
        assert_eq!(
            layout.image_path("img1.jpg"),
            PathBuf::from("/data/images/img1.jpg")
        );
    }

    #[test]
    fn create_is_idempotent_and_keeps_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path().join("dataset"));

        layout.create().unwrap();
        std::fs::write(layout.label_path("a.jpg"), "0 0.5 0.5 0.1 0.1").unwrap();
        layout.create().unwrap();

        assert!(layout.images_dir().is_dir());
        assert!(layout.labels_dir().is_dir());
        assert_eq!(
            std::fs::read_to_string(layout.label_path("a.jpg")).unwrap(),
            "0 0.5 0.5 0.1 0.1"
        );
    }

    #[test]
    fn create_reports_the_failing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path());
        std::fs::write(layout.labels_dir(), "not a directory").unwrap();

        let err = layout.create().unwrap_err();

        assert_eq!(err.path, layout.labels_dir());
        assert!(!layout.images_dir().exists());
    }
}
