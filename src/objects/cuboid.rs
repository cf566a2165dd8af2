use crate::objects::{HitRecord, Hittable};
use crate::types::ray::Ray;
use na::{Point3, Vector3};

/// Box centered on the local origin.
#[derive(Clone, Copy, Debug)]
pub struct Cuboid {
    half: Vector3<f32>,
}

impl Cuboid {
    pub fn new(size: Vector3<f32>) -> Self {
        Self {
            half: size.abs() / 2.0,
        }
    }

    // Face normal of the slab the point lies on
    fn outward_normal(&self, p: &Point3<f32>) -> Vector3<f32> {
        let mut axis = 0;
        let mut best = f32::MIN;
        for i in 0..3 {
            let d = if self.half[i] > 0.0 {
                (p[i] / self.half[i]).abs()
            } else {
                f32::MAX
            };
            if d > best {
                best = d;
                axis = i;
            }
        }

        let mut normal = Vector3::zeros();
        normal[axis] = p[axis].signum();
        normal
    }
}

impl Hittable for Cuboid {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        let orig = ray.origin;
        let dir = ray.direction;

        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        // Find intersection of interval for each axis
        for axis in 0..3 {
            let (min, max) = (-self.half[axis], self.half[axis]);
            let adinv: f32 = 1.0_f32 / dir[axis];

            let t0 = (min - orig[axis]) * adinv;
            let t1 = (max - orig[axis]) * adinv;
            let (t0, t1) = if t0 < t1 { (t0, t1) } else { (t1, t0) };

            // NaN shows up when the ray runs inside a slab boundary
            if !t0.is_nan() {
                t_near = t_near.max(t0);
            }
            if !t1.is_nan() {
                t_far = t_far.min(t1);
            }

            if t_far < t_near {
                return None;
            }
        }

        let t = if (t_min..=t_max).contains(&t_near) {
            t_near
        } else if (t_min..=t_max).contains(&t_far) {
            t_far
        } else {
            return None;
        };

        let p = ray.at(t);
        Some(HitRecord::new(ray, p, self.outward_normal(&p), t))
    }

    fn extent(&self) -> Vec<Point3<f32>> {
        let h = self.half;
        let mut corners = Vec::with_capacity(8);
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    corners.push(Point3::new(sx * h.x, sy * h.y, sz * h.z));
                }
            }
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_from_outside_hits_the_near_face() {
        let cuboid = Cuboid::new(Vector3::new(2.0, 2.0, 2.0));
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));

        let rec = cuboid.hit(&ray, 0.001, f32::INFINITY).expect("hit");
        assert!((rec.t() - 4.0).abs() < 1e-5);
        assert_eq!(rec.normal(), Vector3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn ray_from_inside_hits_the_far_face() {
        let cuboid = Cuboid::new(Vector3::new(2.0, 2.0, 2.0));
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 1.0, 0.0));

        let rec = cuboid.hit(&ray, 0.001, f32::INFINITY).expect("hit");
        assert!((rec.t() - 1.0).abs() < 1e-5);
        assert!(!rec.front_face());
    }

    #[test]
    fn ray_passing_beside_misses() {
        let cuboid = Cuboid::new(Vector3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Point3::new(-5.0, 2.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert!(cuboid.hit(&ray, 0.001, f32::INFINITY).is_none());
    }

    #[test]
    fn extent_has_the_eight_corners() {
        let cuboid = Cuboid::new(Vector3::new(2.0, 4.0, 6.0));
        let corners = cuboid.extent();
        assert_eq!(corners.len(), 8);
        assert!(corners.contains(&Point3::new(1.0, 2.0, 3.0)));
        assert!(corners.contains(&Point3::new(-1.0, -2.0, -3.0)));
    }
}
