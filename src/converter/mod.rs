pub mod yolo;

use crate::dataset::{CreateDirError, DatasetLayout};
use crate::downloader::{fetch_in_order, DownloadError, Fetch};
use crate::label_map::{LabelMap, LabelMapError};
use crate::parser::{read_annotations, AnnotationRecord, ParseError};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use yolo::{render_label_file, YoloLine};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    LabelMap(#[from] LabelMapError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Dataset(#[from] CreateDirError),
    #[error("Failed to decode image downloaded for '{image}': {source}")]
    Decode {
        image: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to save image '{}': {source}", path.display())]
    SaveImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Project '{project}' not found in annotation for '{image}'")]
    MissingProject { image: String, project: String },
    #[error("Invalid bounding-box labels for project '{project}' in '{image}': {source}")]
    ProjectLabels {
        image: String,
        project: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Expected exactly one label for project '{project}' in '{image}', found {count}")]
    LabelInstanceCount {
        image: String,
        project: String,
        count: usize,
    },
    #[error(
        "'{class_name}' (in '{image}') is not present in the label map, \
         please update the label map or use --skip-unknown-label"
    )]
    UnknownLabel { class_name: String, image: String },
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub project_id: String,
    pub annotations_path: PathBuf,
    pub label_map_path: PathBuf,
    pub dataset_dir: PathBuf,
    pub skip_unknown_label: bool,
    /// Image fetches allowed in flight. Records are still written in file order.
    pub concurrency: usize,
    /// Per-request limit; `None` waits as long as the server keeps the connection.
    pub timeout: Option<Duration>,
}

impl ConvertOptions {
    pub fn new(
        project_id: impl Into<String>,
        annotations_path: impl Into<PathBuf>,
        label_map_path: impl Into<PathBuf>,
        dataset_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            annotations_path: annotations_path.into(),
            label_map_path: label_map_path.into(),
            dataset_dir: dataset_dir.into(),
            skip_unknown_label: false,
            concurrency: 1,
            timeout: None,
        }
    }
}

/// Instances dropped for having no entry in the label map, by class name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounter {
    counts: BTreeMap<String, usize>,
}

impl SkipCounter {
    pub fn record(&mut self, class_name: &str) {
        *self.counts.entry(class_name.to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: SkipCounter) {
        for (class_name, count) in other.counts {
            *self.counts.entry(class_name).or_insert(0) += count;
        }
    }

    pub fn get(&self, class_name: &str) -> usize {
        self.counts.get(class_name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

impl fmt::Display for SkipCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordLabels {
    pub lines: Vec<YoloLine>,
    pub skipped: SkipCounter,
}

#[derive(Debug, Clone, Default)]
pub struct ConvertSummary {
    pub records: usize,
    pub lines_written: usize,
    pub skipped: SkipCounter,
}

/// Builds the label rows for one record. Does no I/O.
pub fn convert_record(
    record: &AnnotationRecord,
    image_width: u32,
    image_height: u32,
    label_map: &LabelMap,
    project_id: &str,
    skip_unknown_label: bool,
) -> Result<RecordLabels, ConvertError> {
    let image = record.image_name();
    let project = record
        .project(project_id)
        .ok_or_else(|| ConvertError::MissingProject {
            image: image.to_string(),
            project: project_id.to_string(),
        })?
        .map_err(|source| ConvertError::ProjectLabels {
            image: image.to_string(),
            project: project_id.to_string(),
            source,
        })?;

    let [instance] = project.labels.as_slice() else {
        return Err(ConvertError::LabelInstanceCount {
            image: image.to_string(),
            project: project_id.to_string(),
            count: project.labels.len(),
        });
    };

    let mut labels = RecordLabels::default();
    for object in &instance.annotations.objects {
        let Some(class_id) = label_map.get(&object.name) else {
            if skip_unknown_label {
                labels.skipped.record(&object.name);
                continue;
            }
            return Err(ConvertError::UnknownLabel {
                class_name: object.name.clone(),
                image: image.to_string(),
            });
        };

        labels.lines.push(YoloLine::from_bbox(
            class_id,
            &object.bounding_box,
            image_width,
            image_height,
        ));
    }

    Ok(labels)
}

/// Decodes `bytes`, writes the image to `path` (format chosen by extension)
/// and returns its pixel dimensions.
pub fn decode_and_save(
    image_name: &str,
    bytes: &[u8],
    path: &Path,
) -> Result<(u32, u32), ConvertError> {
    let decoded = image::load_from_memory(bytes).map_err(|source| ConvertError::Decode {
        image: image_name.to_string(),
        source,
    })?;

    decoded.save(path).map_err(|source| ConvertError::SaveImage {
        path: path.to_path_buf(),
        source,
    })?;

    Ok((decoded.width(), decoded.height()))
}

/// Runs the whole conversion. The first failure, in file order, aborts the run.
pub async fn convert<F: Fetch>(
    options: &ConvertOptions,
    fetcher: &F,
) -> Result<ConvertSummary, ConvertError> {
    let label_map = LabelMap::from_path(&options.label_map_path)?;

    let layout = DatasetLayout::new(&options.dataset_dir);
    layout.create()?;

    let records = read_annotations(&options.annotations_path)?;
    info!(
        "Converting {} records for project '{}' with {} classes",
        records.len(),
        options.project_id,
        label_map.len()
    );

    let urls: Vec<String> = records.iter().map(|r| r.image_url().to_string()).collect();
    let mut fetched = std::pin::pin!(stream::iter(&records).zip(fetch_in_order(
        fetcher,
        urls,
        options.concurrency
    )));

    let mut summary = ConvertSummary::default();
    while let Some((record, bytes)) = fetched.next().await {
        let image_name = record.image_name();
        let image_path = layout.image_path(image_name);
        if !image_path.exists() {
            info!(
                "Image file {} does not exist, downloading from {}",
                image_path.display(),
                record.image_url()
            );
        }

        let bytes = bytes?;
        let (width, height) = decode_and_save(image_name, &bytes, &image_path)?;

        let labels = convert_record(
            record,
            width,
            height,
            &label_map,
            &options.project_id,
            options.skip_unknown_label,
        )?;

        let label_path = layout.label_path(image_name);
        std::fs::write(&label_path, render_label_file(&labels.lines)).map_err(|source| {
            ConvertError::Io {
                path: label_path.clone(),
                source,
            }
        })?;
        debug!(
            "Wrote {} ({} objects, {}x{})",
            label_path.display(),
            labels.lines.len(),
            width,
            height
        );

        summary.records += 1;
        summary.lines_written += labels.lines.len();
        summary.skipped.merge(labels.skipped);
    }

    if !summary.skipped.is_empty() {
        warn!("skipped instances: {}", summary.skipped);
    }

    Ok(summary)
}
