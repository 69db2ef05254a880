// Pixel buffer - one RGBA image per render pass

use image::RgbaImage;

use crate::spectrum::Rgba;

/// Row-major RGBA pixels covering the plot rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Flat `RGBARGBA…` view, suitable for canvas upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub(crate) fn set(&mut self, x: u32, y: u32, color: Rgba) {
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = color;
    }

    /// Copy into an `image` buffer for compositing and encoding
    pub fn to_image(&self) -> RgbaImage {
        // Length always matches width * height * 4
        RgbaImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}
