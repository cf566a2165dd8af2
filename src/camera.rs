use na::{Isometry3, Point2, Point3, Vector3};
use thiserror::Error;

use crate::types::ray::Ray;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera look_from and look_at coincide or are not finite")]
    DegeneratePose,
    #[error("camera needs positive focal lengths and a field of view within (0, 180) degrees")]
    InvalidIntrinsics,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intrinsics {
    /// Vertical field of view in degrees, principal point at the image center.
    Fov(f32),
    /// Explicit pinhole parameters in pixels.
    Matrix { fx: f32, fy: f32, cx: f32, cy: f32 },
}

/// Pinhole parameters resolved for one output resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pinhole {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Pinhole {
    /// Camera-space point to pixel coordinates. Image y grows downward.
    pub fn project(&self, p: &Point3<f32>) -> Point2<f32> {
        let depth = -p.z;
        Point2::new(
            self.cx + self.fx * p.x / depth,
            self.cy - self.fy * p.y / depth,
        )
    }

    /// Camera-space direction through a pixel coordinate.
    pub fn unproject(&self, u: f32, v: f32) -> Vector3<f32> {
        Vector3::new((u - self.cx) / self.fx, -(v - self.cy) / self.fy, -1.0)
    }
}

/// Right-handed camera looking down its local -Z axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    look_from: Point3<f32>,
    look_at: Point3<f32>,
    vup: Vector3<f32>,
    intrinsics: Intrinsics,
    near: f32,
}

impl Camera {
    pub const DEFAULT_NEAR: f32 = 0.1;

    pub fn new(look_from: Point3<f32>, look_at: Point3<f32>, intrinsics: Intrinsics) -> Self {
        let camera = Self {
            look_from,
            look_at,
            vup: Vector3::y(),
            intrinsics,
            near: Self::DEFAULT_NEAR,
        };
        camera.warn_on_parallel_up();
        camera
    }

    pub fn with_vup(mut self, vup: Vector3<f32>) -> Self {
        self.vup = vup;
        self.warn_on_parallel_up();
        self
    }

    pub fn with_near(mut self, near: f32) -> Self {
        self.near = near;
        self
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn set_pose(&mut self, look_from: Point3<f32>, look_at: Point3<f32>) {
        self.look_from = look_from;
        self.look_at = look_at;
        self.warn_on_parallel_up();
    }

    /// Checks that the camera defines a usable projection.
    pub fn validate(&self) -> Result<(), CameraError> {
        let finite = |p: &Point3<f32>| p.iter().all(|c| c.is_finite());
        if !finite(&self.look_from)
            || !finite(&self.look_at)
            || (self.look_at - self.look_from).norm() <= f32::EPSILON
        {
            return Err(CameraError::DegeneratePose);
        }

        let valid = match self.intrinsics {
            Intrinsics::Fov(vfov) => vfov > 0.0 && vfov < 180.0,
            Intrinsics::Matrix { fx, fy, cx, cy } => {
                fx > 0.0 && fy > 0.0 && [fx, fy, cx, cy].iter().all(|v| v.is_finite())
            }
        };
        if !valid {
            return Err(CameraError::InvalidIntrinsics);
        }
        Ok(())
    }

    fn looks_along_up(&self) -> bool {
        let forward = self.look_at - self.look_from;
        forward.norm() > f32::EPSILON
            && forward.cross(&self.vup).norm() <= 1e-6 * forward.norm() * self.vup.norm()
    }

    fn warn_on_parallel_up(&self) {
        if self.looks_along_up() {
            log::warn!(
                "Camera at {:?} looks along its up vector; using {:?} as up instead",
                self.look_from,
                self.up()
            );
        }
    }

    /// `vup`, or the world axis least aligned with the viewing direction when
    /// the two are parallel.
    fn up(&self) -> Vector3<f32> {
        if !self.looks_along_up() {
            return self.vup;
        }
        let forward = (self.look_at - self.look_from).normalize();
        let mut up = Vector3::z();
        for axis in [Vector3::x(), Vector3::y()] {
            if axis.dot(&forward).abs() < up.dot(&forward).abs() {
                up = axis;
            }
        }
        up
    }

    /// World to camera transform.
    pub fn view(&self) -> Isometry3<f32> {
        Isometry3::look_at_rh(&self.look_from, &self.look_at, &self.up())
    }

    pub fn pinhole(&self, (width, height): (u32, u32)) -> Pinhole {
        match self.intrinsics {
            Intrinsics::Fov(vfov) => {
                let focal = (height as f32 / 2.0) / (vfov.to_radians() / 2.0).tan();
                Pinhole {
                    fx: focal,
                    fy: focal,
                    cx: width as f32 / 2.0,
                    cy: height as f32 / 2.0,
                }
            }
            Intrinsics::Matrix { fx, fy, cx, cy } => Pinhole { fx, fy, cx, cy },
        }
    }

    /// World-space ray through pixel coordinate `(u, v)`.
    pub fn get_ray(&self, pinhole: &Pinhole, u: f32, v: f32) -> Ray {
        let to_world = self.view().inverse();
        let direction = to_world.transform_vector(&pinhole.unproject(u, v));
        Ray::new(self.look_from, direction)
    }
}
