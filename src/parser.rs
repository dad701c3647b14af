use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse annotation on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to read annotation file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pixel-space box relative to the image's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub name: String,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotations {
    pub objects: Vec<ObjectInstance>,
}

/// One labeler's complete set of annotations for an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelInstance {
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLabels {
    pub labels: Vec<LabelInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRow {
    pub external_id: String,
    pub row_data: String,
}

/// A single line of a Labelbox NDJSON export.
///
/// Projects stay raw: a data row may belong to classification or polygon
/// projects whose labels have a different shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub data_row: DataRow,
    pub projects: HashMap<String, serde_json::Value>,
}

impl AnnotationRecord {
    pub fn image_name(&self) -> &str {
        &self.data_row.external_id
    }

    pub fn image_url(&self) -> &str {
        &self.data_row.row_data
    }

    /// Bounding-box labels of `project_id`, or `None` if the row is not in it.
    pub fn project(
        &self,
        project_id: &str,
    ) -> Option<Result<ProjectLabels, serde_json::Error>> {
        self.projects.get(project_id).map(ProjectLabels::deserialize)
    }
}

pub fn parse_ndjson(content: &str) -> Result<Vec<AnnotationRecord>, ParseError> {
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = serde_json::from_str(line).map_err(|source| ParseError::Json {
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

pub fn read_annotations(path: &Path) -> Result<Vec<AnnotationRecord>, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ndjson(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{"data_row":{"external_id":"img1.jpg","row_data":"https://example.com/img1.jpg"},"projects":{"p1":{"labels":[{"annotations":{"objects":[{"name":"cat","bounding_box":{"left":10,"top":20,"width":100,"height":50}}]}}]}}}"#;

    #[test]
    fn parse_valid_record() {
        let records = parse_ndjson(RECORD).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.image_name(), "img1.jpg");
        assert_eq!(record.image_url(), "https://example.com/img1.jpg");

        let project = record.project("p1").unwrap().unwrap();
        assert_eq!(project.labels.len(), 1);
        let objects = &project.labels[0].annotations.objects;
        assert_eq!(objects[0].name, "cat");
        assert_eq!(
            objects[0].bounding_box,
            BoundingBox {
                left: 10.0,
                top: 20.0,
                width: 100.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn parse_ignores_unknown_fields() {
        let content = r#"{"data_row":{"id":"x","external_id":"a.png","row_data":"u","details":{}},"media_attributes":{"width":1},"projects":{"p1":{"name":"demo","labels":[{"label_kind":"Default","annotations":{"objects":[],"classifications":[]}}]}}}"#;

        let records = parse_ndjson(content).unwrap();
        let project = records[0].project("p1").unwrap().unwrap();
        assert!(project.labels[0].annotations.objects.is_empty());
    }

    #[test]
    fn parse_keeps_other_projects_raw() {
        let content = r#"{"data_row":{"external_id":"a.png","row_data":"u"},"projects":{"p1":{"labels":[{"annotations":{"objects":[]}}]},"p2":{"labels":[{"annotations":{"classifications":[{"name":"sunny"}]}}]},"p3":{"labels":[{"annotations":{"objects":[{"name":"road","polygon":[{"x":1,"y":2}]}]}}]}}}"#;

        let records = parse_ndjson(content).unwrap();
        let record = &records[0];

        assert!(record.project("p1").unwrap().is_ok());
        assert!(record.project("p2").unwrap().is_err());
        assert!(record.project("p3").unwrap().is_err());
        assert!(record.project("p4").is_none());
    }

    #[test]
    fn parse_skips_blank_lines() {
        let content = format!("{}\n\n   \n{}\n", RECORD, RECORD);

        let records = parse_ndjson(&content).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn parse_malformed_json_reports_line() {
        let content = format!("{}\n{{invalid json}}", RECORD);

        let err = parse_ndjson(&content).unwrap_err();
        assert!(matches!(err, ParseError::Json { line: 2, .. }));
    }

    #[test]
    fn parse_missing_data_row_is_error() {
        let content = r#"{"projects":{}}"#;

        assert!(matches!(
            parse_ndjson(content).unwrap_err(),
            ParseError::Json { line: 1, .. }
        ));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = read_annotations(Path::new("/nonexistent/annotations.ndjson")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
