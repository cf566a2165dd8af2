// Use obj for now since its simple

use crate::objects::{HitRecord, Hittable};
use crate::types::ray::Ray;
use na::{Point3, Vector3};
use std::path::Path;

#[derive(Clone, Debug)]
pub struct TriMesh {
    positions: Vec<Point3<f32>>,
    indices: Vec<u32>,
}

impl TriMesh {
    pub fn new(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Loads every model of an obj file into a single mesh.
    pub fn load(path: &Path) -> Result<Self, tobj::LoadError> {
        log::debug!("Loading mesh: {}...", path.display());
        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, _materials) = tobj::load_obj(path, &load_options)?;

        let mut positions: Vec<Point3<f32>> = vec![];
        let mut indices: Vec<u32> = vec![];
        for (i, m) in models.iter().enumerate() {
            let mesh_obj = &m.mesh;
            log::debug!(
                "Model {} has {} vertices and {} triangles",
                i,
                mesh_obj.positions.len() / 3,
                mesh_obj.indices.len() / 3
            );

            let offset = positions.len() as u32;
            positions.extend(
                mesh_obj
                    .positions
                    .chunks(3)
                    .map(|v| Point3::new(v[0], v[1], v[2])),
            );
            indices.extend(mesh_obj.indices.iter().map(|i| i + offset));
        }

        Ok(Self::new(positions, indices))
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn triangle(&self, i: usize) -> Option<[Point3<f32>; 3]> {
        let idx = self.indices.get(3 * i..3 * i + 3)?;
        Some([
            *self.positions.get(idx[0] as usize)?,
            *self.positions.get(idx[1] as usize)?,
            *self.positions.get(idx[2] as usize)?,
        ])
    }
}

// Moller-Trumbore, returns (t, geometric normal)
fn hit_triangle(
    [v0, v1, v2]: &[Point3<f32>; 3],
    ray: &Ray,
    t_min: f32,
    t_max: f32,
) -> Option<(f32, Vector3<f32>)> {
    let e1 = *v1 - *v0;
    let e2 = *v2 - *v0;
    let d = &ray.direction;

    let p = d.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < f32::EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - *v0;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = d.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    if t < t_min || t > t_max {
        return None;
    }

    Some((t, e1.cross(&e2).normalize()))
}

impl Hittable for TriMesh {
    // TODO: put the triangles behind a BVH once meshes get large
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<HitRecord> {
        let mut closest: Option<(f32, Vector3<f32>)> = None;
        let mut closest_so_far = t_max;
        for i in 0..self.triangle_count() {
            let Some(tri) = self.triangle(i) else {
                continue;
            };
            if let Some(hit) = hit_triangle(&tri, ray, t_min, closest_so_far) {
                closest_so_far = hit.0;
                closest = Some(hit);
            }
        }

        closest.map(|(t, normal)| HitRecord::new(ray, ray.at(t), normal, t))
    }

    fn extent(&self) -> Vec<Point3<f32>> {
        self.positions.clone()
    }
}
