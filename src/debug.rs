// Annotated copies of the rendered frames, for eyeballing a dataset.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgb, RgbImage};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::annotation::Annotation;
use crate::projector::{BoundingBox, CoordinateMode};

pub const DEBUG_DIR: &str = "debug";
pub const ANIMATION_FILENAME: &str = "annotations.gif";

const FRAME_DELAY_MS: u32 = 250;
const LINE_WIDTH: u32 = 2;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Distinct, stable colour per category (golden-angle hue walk).
pub fn category_color(category: u32) -> Rgb<u8> {
    let hue = (category as f32 * 137.508) % 360.0;
    let (s, v) = (0.85_f32, 0.95_f32);

    let c = v * s;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_u8 = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// Outlines `bbox` on `image`. Relative boxes are scaled to the image size.
pub fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, mode: CoordinateMode, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let bbox = match mode {
        CoordinateMode::Relative => BoundingBox::new(
            bbox.x_min * width as f32,
            bbox.y_min * height as f32,
            bbox.x_max * width as f32,
            bbox.y_max * height as f32,
        ),
        CoordinateMode::Absolute => *bbox,
    };

    let clamp_x = |v: f32| (v.floor().max(0.0) as u32).min(width - 1);
    let clamp_y = |v: f32| (v.floor().max(0.0) as u32).min(height - 1);
    let (x0, x1) = (clamp_x(bbox.x_min), clamp_x(bbox.x_max));
    let (y0, y1) = (clamp_y(bbox.y_min), clamp_y(bbox.y_max));

    for x in x0..=x1 {
        for t in 0..LINE_WIDTH {
            image.put_pixel(x, (y0 + t).min(y1), color);
            image.put_pixel(x, y1.saturating_sub(t).max(y0), color);
        }
    }
    for y in y0..=y1 {
        for t in 0..LINE_WIDTH {
            image.put_pixel((x0 + t).min(x1), y, color);
            image.put_pixel(x1.saturating_sub(t).max(x0), y, color);
        }
    }
}

/// Writes a copy of the rendered frame with its boxes drawn to
/// `{out_dir}/{file_name}`.
pub fn draw_annotation(
    image_path: &Path,
    annotation: &Annotation,
    mode: CoordinateMode,
    out_dir: &Path,
) -> Result<PathBuf, DebugError> {
    let mut image = image::open(image_path)?.to_rgb8();
    for (bbox, category) in annotation
        .objects
        .bbox
        .iter()
        .zip(&annotation.objects.categories)
    {
        draw_box(&mut image, bbox, mode, category_color(*category));
    }

    std::fs::create_dir_all(out_dir).map_err(|source| DebugError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let path = out_dir.join(&annotation.file_name);
    image.save(&path)?;
    Ok(path)
}

/// Stitches the debug frames of `annotations`, in order, into a looping GIF.
/// Frames missing from `frames_dir` are left out.
pub fn render_animation(
    frames_dir: &Path,
    annotations: &[Annotation],
) -> Result<PathBuf, DebugError> {
    let path = frames_dir.join(ANIMATION_FILENAME);
    let file = File::create(&path).map_err(|source| DebugError::Io {
        path: path.clone(),
        source,
    })?;

    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(Repeat::Infinite)?;

    let mut count = 0;
    for annotation in annotations {
        let frame_path = frames_dir.join(&annotation.file_name);
        if !frame_path.exists() {
            log::debug!("No debug frame for {}", annotation.file_name);
            continue;
        }
        let frame = image::open(&frame_path)?.to_rgba8();
        encoder.encode_frame(Frame::from_parts(
            frame,
            0,
            0,
            Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
        ))?;
        count += 1;
    }

    log::info!("Wrote {} frame(s) to {}", count, path.display());
    Ok(path)
}
