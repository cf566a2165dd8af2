use crate::camera::Camera;
use crate::objects::SceneElement;
use crate::sweep::Snapshot;
use na::Point3;

pub mod configured;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: Point3<f32>,
    pub intensity: f32,
}

/// Frozen, read-only view of a scene between two `apply` calls.
#[derive(Clone, Copy, Debug)]
pub struct SceneState<'a> {
    pub cameras: &'a [Camera],
    pub elements: &'a [SceneElement],
    pub light: Option<&'a Light>,
}

impl<'a> SceneState<'a> {
    pub fn new(
        cameras: &'a [Camera],
        elements: &'a [SceneElement],
        light: Option<&'a Light>,
    ) -> Self {
        Self {
            cameras,
            elements,
            light,
        }
    }
}

/// Mutable scene driven through a sweep.
pub trait Scene {
    /// Moves the scene to the state described by `snapshot`.
    fn apply(&mut self, snapshot: &Snapshot);

    fn cameras(&self) -> &[Camera];

    fn elements(&self) -> &[SceneElement];

    fn light(&self) -> Option<&Light> {
        None
    }

    fn state(&self) -> SceneState<'_> {
        SceneState::new(self.cameras(), self.elements(), self.light())
    }
}
