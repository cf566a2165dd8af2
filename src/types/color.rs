extern crate nalgebra as na;

use image::Rgb;

pub type Color = na::Vector3<f32>;

pub trait ColorOps {
    fn gray(value: f32) -> Self;
    fn get_r(&self) -> f32;
    fn get_g(&self) -> f32;
    fn get_b(&self) -> f32;
    fn to_rgb(&self) -> Rgb<u8>;
}

impl ColorOps for Color {
    fn gray(value: f32) -> Self {
        Color::new(value, value, value)
    }

    fn get_r(&self) -> f32 {
        self.x
    }

    fn get_g(&self) -> f32 {
        self.y
    }

    fn get_b(&self) -> f32 {
        self.z
    }

    // Gamma 2 then quantize
    fn to_rgb(&self) -> Rgb<u8> {
        let quantize = |c: f32| (255.999 * c.max(0.0).sqrt()).clamp(0.0, 255.0) as u8;
        Rgb([
            quantize(self.get_r()),
            quantize(self.get_g()),
            quantize(self.get_b()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_rgb_clamps_out_of_range_channels() {
        let color = Color::new(-1.0, 0.25, 4.0);
        assert_eq!(color.to_rgb(), Rgb([0, 127, 255]));
    }
}
