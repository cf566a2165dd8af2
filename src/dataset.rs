use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::annotation::Annotation;

pub const METADATA_FILENAME: &str = "metadata.jsonl";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed annotation at {path}:{line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

/// Annotations of one split, in the order they were produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    path: PathBuf,
    annotations: Vec<Annotation>,
}

impl Dataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            annotations: vec![],
        }
    }

    /// Reads back a previously written split directory.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let path = path.into();
        let metadata = path.join(METADATA_FILENAME);
        let io_err = |source| DatasetError::Io {
            path: metadata.clone(),
            source,
        };

        let reader = BufReader::new(File::open(&metadata).map_err(io_err)?);
        let mut annotations = vec![];
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            let annotation = serde_json::from_str(&line).map_err(|source| DatasetError::Json {
                path: metadata.clone(),
                line: i + 1,
                source,
            })?;
            annotations.push(annotation);
        }

        Ok(Self { path, annotations })
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILENAME)
    }

    /// Writes one JSON object per line to `{path}/metadata.jsonl`, replacing
    /// any previous file.
    pub fn write(&self) -> Result<PathBuf, DatasetError> {
        let metadata = self.metadata_path();
        let io_err = |source| DatasetError::Io {
            path: metadata.clone(),
            source,
        };

        std::fs::create_dir_all(&self.path).map_err(io_err)?;
        let mut writer = BufWriter::new(File::create(&metadata).map_err(io_err)?);
        for (i, annotation) in self.annotations.iter().enumerate() {
            serde_json::to_writer(&mut writer, annotation).map_err(|source| {
                DatasetError::Json {
                    path: metadata.clone(),
                    line: i + 1,
                    source,
                }
            })?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;

        log::info!(
            "Wrote {} annotation(s) to {}",
            self.annotations.len(),
            metadata.display()
        );

        Ok(metadata)
    }
}
