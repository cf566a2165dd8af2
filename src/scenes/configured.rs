use na::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

use super::{Light, Scene};
use crate::camera::{Camera, Intrinsics};
use crate::config::{CameraConfig, ConfigError, ElementConfig, SceneConfig, ShapeConfig};
use crate::objects::cuboid::Cuboid;
use crate::objects::sphere::Sphere;
use crate::objects::tri_mesh::TriMesh;
use crate::objects::{SceneElement, Shape};
use crate::sweep::Snapshot;
use crate::types::color::Color;

/// Scene built from the declarative `[scene]` table.
///
/// Every `apply` starts again from the configured poses, so a snapshot fully
/// determines the resulting state regardless of what ran before it.
pub struct ConfiguredScene {
    cameras: Vec<Camera>,
    base_cameras: Vec<Camera>,
    elements: Vec<SceneElement>,
    base_poses: Vec<Isometry3<f32>>,
    light: Option<Light>,
    base_light: Option<Light>,
}

impl ConfiguredScene {
    pub fn new(cameras: Vec<Camera>, elements: Vec<SceneElement>, light: Option<Light>) -> Self {
        let base_poses = elements.iter().map(|e| e.pose()).collect();
        Self {
            base_cameras: cameras.clone(),
            cameras,
            elements,
            base_poses,
            base_light: light,
            light,
        }
    }

    pub fn from_config(config: &SceneConfig) -> Result<Self, ConfigError> {
        let cameras = config.cameras.iter().map(build_camera).collect();
        let elements = config
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| build_element(i, e))
            .collect::<Result<Vec<_>, _>>()?;
        let light = config.light.as_ref().map(|l| Light {
            position: Point3::from(l.position),
            intensity: l.intensity,
        });

        log::info!(
            "Built scene with {} camera(s) and {} element(s)",
            config.cameras.len(),
            elements.len()
        );

        Ok(Self::new(cameras, elements, light))
    }
}

fn build_camera(config: &CameraConfig) -> Camera {
    let intrinsics = match config.intrinsics {
        Some(m) => Intrinsics::Matrix {
            fx: m.fx,
            fy: m.fy,
            cx: m.cx,
            cy: m.cy,
        },
        None => Intrinsics::Fov(config.vfov),
    };

    Camera::new(
        Point3::from(config.look_from),
        Point3::from(config.look_at),
        intrinsics,
    )
    .with_vup(Vector3::from(config.vup))
    .with_near(config.near)
}

fn build_element(index: usize, config: &ElementConfig) -> Result<SceneElement, ConfigError> {
    let shape = match &config.shape {
        ShapeConfig::Cuboid { size } => Shape::Cuboid(Cuboid::new(Vector3::from(*size))),
        ShapeConfig::Sphere { radius } => Shape::Sphere(Sphere::new(*radius)),
        ShapeConfig::Mesh { path } => {
            Shape::Mesh(TriMesh::load(path).map_err(|source| ConfigError::Mesh {
                path: path.clone(),
                source,
            })?)
        }
    };

    let [roll, pitch, yaw] = config.rotation.map(f32::to_radians);
    let pose = Isometry3::from_parts(
        Translation3::from(Vector3::from(config.position)),
        UnitQuaternion::from_euler_angles(roll, pitch, yaw),
    );
    let category = config.category.unwrap_or(index as u32);

    Ok(SceneElement::new(&config.name, category, shape)
        .with_pose(pose)
        .with_albedo(Color::from(config.albedo)))
}

impl Scene for ConfiguredScene {
    fn apply(&mut self, snapshot: &Snapshot) {
        let params = &snapshot.params;

        self.cameras.clone_from(&self.base_cameras);
        // Only the first camera is ever annotated, so it is the one that moves
        if let (Some(pose), Some(camera)) = (params.camera, self.cameras.first_mut()) {
            camera.set_pose(pose.look_from, pose.look_at);
        }

        self.light = match (params.light, self.base_light) {
            (Some(position), Some(base)) => Some(Light { position, ..base }),
            (Some(position), None) => Some(Light {
                position,
                intensity: 1.0,
            }),
            (None, base) => base,
        };

        for (element, base) in self.elements.iter_mut().zip(&self.base_poses) {
            let pose = match params.element_motion {
                Some(motion) => base * motion,
                None => *base,
            };
            element.set_pose(pose);
        }
    }

    fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    fn elements(&self) -> &[SceneElement] {
        &self.elements
    }

    fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }
}
