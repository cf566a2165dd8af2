use na::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::objects::SceneElement;

/// Which unit bounding-box coordinates are reported in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateMode {
    /// Normalized to the resolution, in `[0, 1]`.
    #[default]
    Relative,
    /// Pixels, in `[0, width] x [0, height]`.
    Absolute,
}

/// Axis-aligned image-space box, serialized as `[x_min, y_min, x_max, y_max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Envelope of a non-empty point set.
    fn envelope(points: &[Point2<f32>]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.iter().fold(init, |b, p| {
            Self::new(
                b.x_min.min(p.x),
                b.y_min.min(p.y),
                b.x_max.max(p.x),
                b.y_max.max(p.y),
            )
        }))
    }

    fn clip(&self, width: f32, height: f32) -> Self {
        Self::new(
            self.x_min.clamp(0.0, width),
            self.y_min.clamp(0.0, height),
            self.x_max.clamp(0.0, width),
            self.y_max.clamp(0.0, height),
        )
    }

    fn normalized(&self, width: f32, height: f32) -> Self {
        Self::new(
            self.x_min / width,
            self.y_min / height,
            self.x_max / width,
            self.y_max / height,
        )
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x_min, y_min, x_max, y_max]: [f32; 4]) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

/// Image-space box of an element as seen by `camera`, or `None` when no part
/// of it lands inside the frame in front of the near plane.
pub fn project_element(
    camera: &Camera,
    element: &SceneElement,
    resolution: (u32, u32),
    mode: CoordinateMode,
) -> Option<BoundingBox> {
    let view = camera.view();
    let points: Vec<Point3<f32>> = element
        .world_points()
        .iter()
        .map(|p| view.transform_point(p))
        .collect();

    project_points(camera, &points, resolution, mode)
}

/// Same as [`project_element`] for points already in camera space.
pub fn project_points(
    camera: &Camera,
    points: &[Point3<f32>],
    resolution: (u32, u32),
    mode: CoordinateMode,
) -> Option<BoundingBox> {
    let near = camera.near();
    let depth = |p: &Point3<f32>| -p.z;

    let (front, behind): (Vec<Point3<f32>>, Vec<Point3<f32>>) =
        points.iter().copied().partition(|p| depth(p) > near);
    if front.is_empty() {
        return None;
    }

    // Segments crossing the near plane contribute their crossing point. Over
    // all front/behind pairs this covers every hull edge through the plane.
    let mut visible = front.clone();
    for f in &front {
        for b in &behind {
            let t = (depth(f) - near) / (depth(f) - depth(b));
            visible.push(*f + (*b - *f) * t);
        }
    }

    let pinhole = camera.pinhole(resolution);
    let projected: Vec<Point2<f32>> = visible.iter().map(|p| pinhole.project(p)).collect();

    let (width, height) = (resolution.0 as f32, resolution.1 as f32);
    let clipped = BoundingBox::envelope(&projected)?.clip(width, height);
    if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
        return None;
    }

    Some(match mode {
        CoordinateMode::Relative => clipped.normalized(width, height),
        CoordinateMode::Absolute => clipped,
    })
}
