// Color mapper - dB to palette index
//
// The palette runs black → blue → magenta/red → yellow → white and is built
// once for the whole process.

use once_cell::sync::Lazy;
use std::f64::consts::FRAC_PI_2;
use std::f64::consts::PI;

/// Bottom of the display range in dB
pub const MIN_DB: f64 = -120.0;
/// Top of the display range in dB
pub const MAX_DB: f64 = 0.0;

/// One RGBA pixel
pub type Rgba = [u8; 4];

static PALETTE: Lazy<[Rgba; 256]> = Lazy::new(build_palette);

/// Shared 256-entry palette
pub fn palette() -> &'static [Rgba; 256] {
    &PALETTE
}

/// Channel intensities in `[0, 1]` for a normalized level `x`
pub fn palette_channels(x: f64) -> (f64, f64, f64) {
    let r = if x < 0.13 {
        0.0
    } else if x < 0.73 {
        ((x - 0.13) / 0.6 * FRAC_PI_2).sin()
    } else {
        1.0
    };
    let g = if x < 0.6 {
        0.0
    } else if x < 0.91 {
        ((x - 0.6) / 0.31 * FRAC_PI_2).sin()
    } else {
        1.0
    };
    let b = if x < 0.6 {
        0.5 * (x / 0.6 * PI).sin()
    } else if x < 0.78 {
        0.0
    } else {
        (x - 0.78) / 0.22
    };
    (r, g, b)
}

fn build_palette() -> [Rgba; 256] {
    let mut table = [[0u8; 4]; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let (r, g, b) = palette_channels(i as f64 / 255.0);
        *entry = [
            (r * 255.0) as u8,
            (g * 255.0) as u8,
            (b * 255.0) as u8,
            255,
        ];
    }
    table
}

/// Quantize a dB value into `[0, 255]` over the fixed display range
///
/// Values are truncated, then clamped; NaN maps to 0.
pub fn db_to_index(db: f64) -> u8 {
    let scaled = (db - MIN_DB) / (MAX_DB - MIN_DB) * 255.0;
    (scaled as i32).clamp(0, 255) as u8
}

/// Palette color for a dB value
pub fn color_for_db(db: f64) -> Rgba {
    PALETTE[db_to_index(db) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_endpoints() {
        let pal = palette();
        assert_eq!(pal[0], [0, 0, 0, 255]);
        let [r, g, b, a] = pal[255];
        assert_eq!((r, g, a), (255, 255, 255));
        // (1 - 0.78) / 0.22 lands just under 1.0
        assert!(b >= 254);
    }

    #[test]
    fn test_palette_midrange_is_blue_purple() {
        // x ≈ 0.3: blue bump near its peak, red ramp started, no green
        let [r, g, b, a] = palette()[77];
        assert!(b > 100);
        assert!(r > 0);
        assert_eq!(g, 0);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_clamps_below_and_above_range() {
        assert_eq!(color_for_db(-500.0), palette()[0]);
        assert_eq!(color_for_db(-120.0), palette()[0]);
        assert_eq!(color_for_db(0.0), palette()[255]);
        assert_eq!(color_for_db(35.0), palette()[255]);
        assert_eq!(db_to_index(f64::NAN), 0);
    }

    #[test]
    fn test_index_monotonic_in_db() {
        let mut last = 0u8;
        let mut db = -140.0;
        while db <= 20.0 {
            let idx = db_to_index(db);
            assert!(idx >= last, "index dropped at {} dB", db);
            last = idx;
            db += 0.37;
        }
        assert_eq!(last, 255);
    }

    #[test]
    fn test_index_truncates() {
        // -60 dB → 127.5 → 127
        assert_eq!(db_to_index(-60.0), 127);
    }
}
