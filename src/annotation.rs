use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::camera::{Camera, CameraError};
use crate::objects::SceneElement;
use crate::projector::{project_element, BoundingBox, CoordinateMode};

/// How category ids are attached to visible elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryMode {
    /// The category assigned to the element when the scene was built.
    #[default]
    Element,
    /// Position among the visible elements of the snapshot. Ids shift whenever
    /// an earlier element drops out of view; kept for older datasets.
    Positional,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotateError {
    #[error("scene has no camera to annotate from")]
    NoCamera,
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Boxes and categories of one snapshot, paired by index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAnnotation {
    pub bbox: Vec<BoundingBox>,
    pub categories: Vec<u32>,
}

impl SnapshotAnnotation {
    pub fn push(&mut self, bbox: BoundingBox, category: u32) {
        self.bbox.push(bbox);
        self.categories.push(category);
    }

    pub fn len(&self) -> usize {
        self.bbox.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub file_name: String,
    pub objects: SnapshotAnnotation,
}

/// Settings that change the content of an annotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotateOptions {
    pub resolution: (u32, u32),
    pub mode: CoordinateMode,
    pub categories: CategoryMode,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            resolution: (512, 512),
            mode: CoordinateMode::Relative,
            categories: CategoryMode::Element,
        }
    }
}

/// Image file name shared by the renderer output and the annotation record.
pub fn image_file_name(snapshot_id: &Uuid) -> String {
    format!("{}.png", snapshot_id)
}

/// Annotates the elements as seen from the first camera.
pub fn annotate(
    cameras: &[Camera],
    elements: &[SceneElement],
    snapshot_id: &Uuid,
    options: &AnnotateOptions,
) -> Result<Annotation, AnnotateError> {
    if cameras.len() > 1 {
        log::warn!(
            "Multiple cameras unsupported ({} found); using first",
            cameras.len()
        );
    }
    let camera = cameras.first().ok_or(AnnotateError::NoCamera)?;
    camera.validate()?;

    let mut objects = SnapshotAnnotation::default();
    for element in elements {
        let Some(bbox) = project_element(camera, element, options.resolution, options.mode)
        else {
            log::trace!("Element '{}' is out of view", element.name());
            continue;
        };

        let category = match options.categories {
            CategoryMode::Element => element.category(),
            CategoryMode::Positional => objects.len() as u32,
        };
        objects.push(bbox, category);
    }

    log::debug!(
        "Snapshot {}: {} of {} element(s) visible",
        snapshot_id,
        objects.len(),
        elements.len()
    );

    Ok(Annotation {
        file_name: image_file_name(snapshot_id),
        objects,
    })
}
