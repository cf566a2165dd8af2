use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::annotation::CategoryMode;
use crate::driver::FailurePolicy;
use crate::projector::CoordinateMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to load mesh '{path}': {source}")]
    Mesh {
        path: PathBuf,
        source: tobj::LoadError,
    },
}

/// Top level of the TOML file driving a dataset run.
#[derive(Clone, Debug, Deserialize)]
pub struct RenderingConfig {
    pub target_path: PathBuf,
    #[serde(default = "default_split")]
    pub split: String,
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default = "default_relative")]
    pub relative: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub category_mode: CategoryMode,
    #[serde(default)]
    pub on_render_failure: FailurePolicy,
    #[serde(default)]
    pub resume: bool,
    pub scene: SceneConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
    pub light: Option<LightConfig>,
    #[serde(default)]
    pub elements: Vec<ElementConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CameraConfig {
    pub look_from: [f32; 3],
    #[serde(default)]
    pub look_at: [f32; 3],
    #[serde(default = "default_vup")]
    pub vup: [f32; 3],
    /// Vertical field of view in degrees. Ignored when `intrinsics` is set.
    #[serde(default = "default_vfov")]
    pub vfov: f32,
    pub intrinsics: Option<IntrinsicsConfig>,
    #[serde(default = "default_near")]
    pub near: f32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct IntrinsicsConfig {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LightConfig {
    pub position: [f32; 3],
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ElementConfig {
    pub name: String,
    /// Defaults to the element's index in the scene.
    pub category: Option<u32>,
    pub shape: ShapeConfig,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler angles in degrees (roll, pitch, yaw about x, y, z).
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "default_albedo")]
    pub albedo: [f32; 3],
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeConfig {
    Cuboid { size: [f32; 3] },
    Sphere { radius: f32 },
    Mesh { path: PathBuf },
}

#[derive(Clone, Debug, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_name")]
    pub name: String,
    pub camera_orbit: Option<OrbitConfig>,
    pub light_orbit: Option<OrbitConfig>,
    #[serde(default = "default_yaw_steps")]
    pub element_yaw_steps: u32,
    #[serde(default)]
    pub snapshots: Vec<SnapshotConfig>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            name: default_sweep_name(),
            camera_orbit: None,
            light_orbit: None,
            element_yaw_steps: default_yaw_steps(),
            snapshots: vec![],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrbitConfig {
    pub radius: f32,
    #[serde(default)]
    pub height: f32,
    pub steps: u32,
    #[serde(default)]
    pub target: [f32; 3],
    /// Degrees.
    #[serde(default)]
    pub start_angle: f32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SnapshotConfig {
    pub camera: Option<CameraPoseConfig>,
    pub light: Option<[f32; 3]>,
    /// Degrees about each element's own y axis.
    pub yaw: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CameraPoseConfig {
    pub look_from: [f32; 3],
    #[serde(default)]
    pub look_at: [f32; 3],
}

fn default_split() -> String {
    "train".to_string()
}

fn default_resolution() -> (u32, u32) {
    (512, 512)
}

fn default_samples() -> u32 {
    16
}

fn default_relative() -> bool {
    true
}

fn default_vup() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_vfov() -> f32 {
    40.0
}

fn default_near() -> f32 {
    0.1
}

fn default_intensity() -> f32 {
    1.0
}

fn default_albedo() -> [f32; 3] {
    [0.7, 0.7, 0.7]
}

fn default_sweep_name() -> String {
    "default".to_string()
}

fn default_yaw_steps() -> u32 {
    1
}

impl RenderingConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// `{target_path}/{split}`, where images and metadata land.
    pub fn split_path(&self) -> PathBuf {
        self.target_path.join(&self.split)
    }

    pub fn coordinate_mode(&self) -> CoordinateMode {
        if self.relative {
            CoordinateMode::Relative
        } else {
            CoordinateMode::Absolute
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.split.is_empty() {
            return invalid("split must not be empty");
        }
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return invalid("resolution must be non-zero");
        }
        if self.samples == 0 {
            return invalid("samples must be at least 1");
        }
        if self.scene.cameras.is_empty() {
            return invalid("scene needs at least one camera");
        }
        for camera in &self.scene.cameras {
            match camera.intrinsics {
                Some(m) if !(m.fx > 0.0 && m.fy > 0.0) => {
                    return invalid("camera intrinsics need positive fx and fy");
                }
                None if !(camera.vfov > 0.0 && camera.vfov < 180.0) => {
                    return invalid("camera vfov must be within (0, 180) degrees");
                }
                _ => {}
            }
            if camera.near <= 0.0 {
                return invalid("camera near plane must be positive");
            }
            if camera.look_from == camera.look_at {
                return invalid("camera look_from and look_at must differ");
            }
        }
        for orbit in [&self.sweep.camera_orbit, &self.sweep.light_orbit]
            .into_iter()
            .flatten()
        {
            if orbit.steps == 0 {
                return invalid("orbit steps must be at least 1");
            }
        }
        if let Some(orbit) = &self.sweep.camera_orbit {
            if orbit.radius == 0.0 && orbit.height == 0.0 {
                return invalid("camera orbit puts the camera on its target");
            }
        }
        for snapshot in &self.sweep.snapshots {
            if let Some(pose) = &snapshot.camera {
                if pose.look_from == pose.look_at {
                    return invalid("snapshot camera look_from and look_at must differ");
                }
            }
        }
        Ok(())
    }
}
