pub mod cuboid;
pub mod sphere;
pub mod tri_mesh;

use crate::types::color::{Color, ColorOps};
use crate::types::ray::Ray;
use cuboid::Cuboid;
use na::{Isometry3, Point3, Vector3};
use sphere::Sphere;
use tri_mesh::TriMesh;

pub struct HitRecord {
    p: Point3<f32>,
    normal: Vector3<f32>,
    t: f32,
    front_face: bool,
}

impl HitRecord {
    pub fn new(ray: &Ray, p: Point3<f32>, outward_normal: Vector3<f32>, t: f32) -> HitRecord {
        let mut rec = HitRecord {
            p,
            normal: outward_normal,
            t,
            front_face: false,
        };

        rec.set_face_normal(ray, outward_normal);

        rec
    }

    pub fn p(&self) -> Point3<f32> {
        self.p
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn t(&self) -> f32 {
        self.t
    }

    pub fn front_face(&self) -> bool {
        self.front_face
    }

    fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vector3<f32>) {
        // Flip the normal if the ray is inside the object
        self.front_face = ray.direction.dot(&outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Geometry expressed in its own local frame.
pub trait Hittable {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord>;

    /// Points whose convex hull encloses the shape, in local coordinates.
    fn extent(&self) -> Vec<Point3<f32>>;
}

#[derive(Clone, Debug)]
pub enum Shape {
    Cuboid(Cuboid),
    Sphere(Sphere),
    Mesh(TriMesh),
}

impl Hittable for Shape {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        match self {
            Shape::Cuboid(c) => c.hit(ray, t_min, t_max),
            Shape::Sphere(s) => s.hit(ray, t_min, t_max),
            Shape::Mesh(m) => m.hit(ray, t_min, t_max),
        }
    }

    fn extent(&self) -> Vec<Point3<f32>> {
        match self {
            Shape::Cuboid(c) => c.extent(),
            Shape::Sphere(s) => s.extent(),
            Shape::Mesh(m) => m.extent(),
        }
    }
}

/// A renderable object placed in world space.
///
/// `category` is the label assigned when the scene is built. It never depends
/// on which other elements happen to be visible.
#[derive(Clone, Debug)]
pub struct SceneElement {
    name: String,
    category: u32,
    shape: Shape,
    pose: Isometry3<f32>,
    albedo: Color,
}

impl SceneElement {
    pub fn new(name: &str, category: u32, shape: Shape) -> Self {
        Self {
            name: name.to_string(),
            category,
            shape,
            pose: Isometry3::identity(),
            albedo: Color::gray(0.7),
        }
    }

    pub fn with_pose(mut self, pose: Isometry3<f32>) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_albedo(mut self, albedo: Color) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> u32 {
        self.category
    }

    pub fn pose(&self) -> Isometry3<f32> {
        self.pose
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }

    pub fn set_pose(&mut self, pose: Isometry3<f32>) {
        self.pose = pose;
    }

    /// Extent points transformed into world space with the current pose.
    pub fn world_points(&self) -> Vec<Point3<f32>> {
        self.shape
            .extent()
            .iter()
            .map(|p| self.pose.transform_point(p))
            .collect()
    }

    pub fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        // Rigid transforms keep the ray parameter unchanged
        let local = Ray::new(
            self.pose.inverse_transform_point(&ray.origin),
            self.pose.inverse_transform_vector(&ray.direction),
        );
        let rec = self.shape.hit(&local, t_min, t_max)?;
        let outward = if rec.front_face() {
            rec.normal()
        } else {
            -rec.normal()
        };

        Some(HitRecord::new(
            ray,
            self.pose.transform_point(&rec.p()),
            self.pose.transform_vector(&outward),
            rec.t(),
        ))
    }
}
