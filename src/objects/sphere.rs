use crate::objects::{HitRecord, Hittable};
use crate::types::ray::Ray;
use na::{Point3, Vector3};

use std::f32::consts::PI;

const RINGS: usize = 12;
const SEGMENTS: usize = 24;

/// Sphere centered on the local origin.
#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    pub radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.abs(),
        }
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        // Solve the quadratic equation
        let oc: Vector3<f32> = Point3::origin() - ray.origin;
        let a: f32 = ray.direction.norm_squared();
        let h = ray.direction.dot(&oc);
        let c = oc.norm_squared() - self.radius * self.radius;

        // Discriminant
        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            // Miss
            return None;
        }

        let sqrt_disc = discriminant.sqrt();

        // Check whether there is a root in the bounds
        let mut root = (h - sqrt_disc) / a;
        if root < t_min || t_max < root {
            root = (h + sqrt_disc) / a;
            if root < t_min || t_max < root {
                return None;
            }
        }

        let p = ray.at(root);
        let normal = p.coords / self.radius;

        Some(HitRecord::new(ray, p, normal, root))
    }

    // UV-sphere vertices, like a tessellated sphere mesh would carry
    fn extent(&self) -> Vec<Point3<f32>> {
        let r = self.radius;
        let mut points = vec![Point3::new(0.0, r, 0.0), Point3::new(0.0, -r, 0.0)];
        for ring in 1..RINGS {
            let theta = PI * ring as f32 / RINGS as f32;
            for segment in 0..SEGMENTS {
                let phi = 2.0 * PI * segment as f32 / SEGMENTS as f32;
                points.push(Point3::new(
                    r * theta.sin() * phi.cos(),
                    r * theta.cos(),
                    r * theta.sin() * phi.sin(),
                ));
            }
        }
        points
    }
}
