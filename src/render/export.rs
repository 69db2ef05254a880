// Composite export - tile published buffers into one PNG

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::RenderError;

use super::buffer::PixelBuffer;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Near-square grid: `cols = ceil(sqrt(n))`, `rows = ceil(n / cols)`
pub fn grid_dimensions(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    (cols, n.div_ceil(cols))
}

/// Uniform downscale keeping both sides within `max_dimension`
pub fn export_scale(total_width: u32, total_height: u32, max_dimension: u32) -> f64 {
    let max = max_dimension as f64;
    1f64.min(max / total_width.max(1) as f64)
        .min(max / total_height.max(1) as f64)
}

/// Lay `buffers` out on the grid and return the composite image
///
/// Cells take the size of the first buffer; larger buffers are cropped into
/// their cell. Each tile is scaled on its own so the full-resolution grid is
/// never allocated.
pub fn compose(buffers: &[&PixelBuffer], max_dimension: u32) -> Result<RgbaImage, RenderError> {
    let first = buffers.first().ok_or(RenderError::ExportEmpty)?;
    let (cell_w, cell_h) = (first.width(), first.height());
    let (cols, rows) = grid_dimensions(buffers.len());

    let scale = export_scale(cols as u32 * cell_w, rows as u32 * cell_h, max_dimension);
    let (tile_w, tile_h) = if scale < 1.0 {
        (
            ((cell_w as f64 * scale).floor() as u32).max(1),
            ((cell_h as f64 * scale).floor() as u32).max(1),
        )
    } else {
        (cell_w, cell_h)
    };

    let mut canvas = RgbaImage::from_pixel(cols as u32 * tile_w, rows as u32 * tile_h, BACKGROUND);
    for (i, buffer) in buffers.iter().enumerate() {
        let x = (i % cols) as u32 * tile_w;
        let y = (i / cols) as u32 * tile_h;
        let image = buffer.to_image();
        let mut tile = imageops::crop_imm(
            &image,
            0,
            0,
            image.width().min(cell_w),
            image.height().min(cell_h),
        )
        .to_image();
        if scale < 1.0 {
            let w = ((tile.width() as f64 * scale).floor() as u32).max(1);
            let h = ((tile.height() as f64 * scale).floor() as u32).max(1);
            tile = imageops::resize(&tile, w, h, FilterType::Triangle);
        }
        imageops::replace(&mut canvas, &tile, x as i64, y as i64);
    }
    Ok(canvas)
}

/// `compose` followed by PNG encoding
pub fn composite_png(buffers: &[&PixelBuffer], max_dimension: u32) -> Result<Vec<u8>, RenderError> {
    let image = compose(buffers, max_dimension)?;
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    log::info!(
        "[Export] composite of {} buffer(s), {}x{}, {} bytes",
        buffers.len(),
        image.width(),
        image.height(),
        bytes.get_ref().len()
    );
    Ok(bytes.into_inner())
}
