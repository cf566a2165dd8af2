use image::{ImageBuffer, RgbImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::camera::{Camera, CameraError, Pinhole};
use crate::objects::HitRecord;
use crate::scenes::{Light, SceneState};
use crate::types::color::{Color, ColorOps};
use crate::types::ray::Ray;
use crate::types::sampler::{Sampler, SquareSampler};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene has no camera to render from")]
    NoCamera,
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("failed to write image '{path}': {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Produces the image file for the current scene state.
pub trait Renderer {
    fn render_to_file(&self, state: &SceneState, path: &Path) -> Result<(), RenderError>;
}

/// Direct-lighting ray caster: one bounce, lambertian shading, no shadows.
pub struct RayCaster {
    resolution: (u32, u32),
    spp: u32,
    ambient: f32,
    background: Color,
}

impl RayCaster {
    pub fn new(resolution: (u32, u32), spp: u32) -> Self {
        Self {
            resolution,
            spp: spp.max(1),
            ambient: 0.15,
            background: Color::gray(0.05),
        }
    }

    /// Renders with the first camera, the same one the annotations use.
    pub fn render(&self, state: &SceneState) -> Result<RgbImage, RenderError> {
        let camera = state.cameras.first().ok_or(RenderError::NoCamera)?;
        camera.validate()?;
        let pinhole = camera.pinhole(self.resolution);

        let mut buffer: RgbImage = ImageBuffer::new(self.resolution.0, self.resolution.1);
        // CPU parallelization
        buffer.par_enumerate_pixels_mut().for_each(|(u, v, pixel)| {
            let sampler = SquareSampler::new((0.5, 0.5), 0.5);
            let mut rng = rand::thread_rng();
            let pixel_color: Color = (0..self.spp)
                .map(|_| {
                    let (du, dv) = sampler.sample(&mut rng);
                    let ray = camera.get_ray(&pinhole, u as f32 + du, v as f32 + dv);
                    self.ray_color(&ray, camera, state)
                })
                .sum::<Color>()
                / self.spp as f32;

            *pixel = pixel_color.to_rgb();
        });

        Ok(buffer)
    }

    fn closest_hit(
        &self,
        ray: &Ray,
        camera: &Camera,
        state: &SceneState,
    ) -> Option<(HitRecord, Color)> {
        let mut rec: Option<(HitRecord, Color)> = None;
        let mut closest_so_far = f32::INFINITY;
        for element in state.elements {
            if let Some(hit) = element.hit(ray, camera.near(), closest_so_far) {
                closest_so_far = hit.t();
                rec = Some((hit, element.albedo()));
            }
        }
        rec
    }

    fn ray_color(&self, ray: &Ray, camera: &Camera, state: &SceneState) -> Color {
        match self.closest_hit(ray, camera, state) {
            Some((rec, albedo)) => {
                let diffuse = match state.light {
                    Some(light) => Self::diffuse(&rec, light),
                    // Headlight
                    None => rec.normal().dot(&-ray.direction.normalize()).max(0.0),
                };
                albedo * (self.ambient + (1.0 - self.ambient) * diffuse)
            }
            None => self.background,
        }
    }

    fn diffuse(rec: &HitRecord, light: &Light) -> f32 {
        let to_light = light.position - rec.p();
        light.intensity * rec.normal().dot(&to_light.normalize()).max(0.0)
    }
}

impl Renderer for RayCaster {
    fn render_to_file(&self, state: &SceneState, path: &Path) -> Result<(), RenderError> {
        let buffer = self.render(state)?;
        buffer.save(path).map_err(|source| RenderError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
