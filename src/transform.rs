//! Per-sprite geometric and photometric transforms.
//!
//! A draw instruction is applied as flip, then integer block scale, then
//! rotation about the sprite centre, then chroma-key alpha. Each step
//! produces a new owned buffer.

use image::{Rgb, RgbImage, Rgba, RgbaImage, imageops};
use kurbo::{Affine, Point, Vec2};

/// Mirrors the sprite across its vertical and/or horizontal axis. No
/// resampling; flipping twice on the same axis recovers the input.
pub fn flip(sprite: &RgbImage, flip_h: bool, flip_v: bool) -> RgbImage {
    match (flip_h, flip_v) {
        (false, false) => sprite.clone(),
        (true, false) => imageops::flip_horizontal(sprite),
        (false, true) => imageops::flip_vertical(sprite),
        (true, true) => imageops::flip_vertical(&imageops::flip_horizontal(sprite)),
    }
}

/// Replicates every source pixel into a `factor x factor` block. Exact
/// nearest-neighbour upsampling; `factor` must be >= 1 (validated upstream).
pub fn scale(sprite: &RgbImage, factor: u32) -> RgbImage {
    if factor == 1 {
        return sprite.clone();
    }

    let (w, h) = sprite.dimensions();
    let mut out = RgbImage::new(w * factor, h * factor);
    for (x, y, px) in sprite.enumerate_pixels() {
        for dy in 0..factor {
            for dx in 0..factor {
                out.put_pixel(x * factor + dx, y * factor + dy, *px);
            }
        }
    }
    out
}

/// Bounding-box dimensions of a sprite rotated by `degrees`.
pub fn rotated_dims(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let new_w = (f64::from(height) * sin + f64::from(width) * cos).round() as u32;
    let new_h = (f64::from(height) * cos + f64::from(width) * sin).round() as u32;
    (new_w, new_h)
}

/// Rotates the sprite about its own centre by `degrees` (positive =
/// counter-clockwise) into an expanded bounding box, and re-anchors the
/// placement so the original centre stays fixed in canvas space.
///
/// Returns the rotated sprite and the new top-left position. Samples with
/// inverse-mapped bilinear interpolation; out-of-bounds taps read as black,
/// which the default chroma key later turns transparent.
pub fn rotate(sprite: &RgbImage, degrees: f64, position: (i32, i32)) -> (RgbImage, (i32, i32)) {
    let (w, h) = sprite.dimensions();
    let (cx, cy) = (w / 2, h / 2);
    let (new_w, new_h) = rotated_dims(w, h, degrees);

    let center_abs = (position.0 + cx as i32, position.1 + cy as i32);
    let new_pos = (
        center_abs.0 - (new_w / 2) as i32,
        center_abs.1 - (new_h / 2) as i32,
    );

    // Rotate about (cx, cy), then shift so the expanded bounds start at the
    // origin. Image coordinates are y-down, so a counter-clockwise rotation
    // on screen is Affine::rotate(-theta).
    let forward = Affine::translate(Vec2::new(
        f64::from(new_w / 2) - f64::from(cx),
        f64::from(new_h / 2) - f64::from(cy),
    )) * Affine::translate(Vec2::new(f64::from(cx), f64::from(cy)))
        * Affine::rotate(-degrees.to_radians())
        * Affine::translate(Vec2::new(-f64::from(cx), -f64::from(cy)));
    let inverse = forward.inverse();

    let mut out = RgbImage::new(new_w, new_h);
    for y in 0..new_h {
        for x in 0..new_w {
            let src = inverse * Point::new(f64::from(x), f64::from(y));
            out.put_pixel(x, y, sample_bilinear(sprite, src.x, src.y));
        }
    }
    (out, new_pos)
}

/// Derives a 4-channel sprite from a 3-channel one: pixels whose channels
/// all equal `key` become fully transparent, everything else gets
/// `round(255 * alpha)`.
pub fn apply_alpha(sprite: &RgbImage, alpha: f32, key: u8) -> RgbaImage {
    let level = (255.0 * alpha).round() as u8;
    let (w, h) = sprite.dimensions();

    let mut out = RgbaImage::new(w, h);
    for (x, y, px) in sprite.enumerate_pixels() {
        let Rgb([r, g, b]) = *px;
        let a = if r == key && g == key && b == key {
            0
        } else {
            level
        };
        out.put_pixel(x, y, Rgba([r, g, b, a]));
    }
    out
}

fn sample_bilinear(sprite: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = sprite.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut acc = [0.0f64; 3];
    for (tx, ty, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        if tx < 0 || ty < 0 || tx >= i64::from(w) || ty >= i64::from(h) {
            continue; // constant black border
        }
        let px = sprite.get_pixel(tx as u32, ty as u32);
        for c in 0..3 {
            acc[c] += weight * f64::from(px[c]);
        }
    }

    Rgb([
        acc[0].round().clamp(0.0, 255.0) as u8,
        acc[1].round().clamp(0.0, 255.0) as u8,
        acc[2].round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 40 + y) as u8, (y * 40 + x) as u8, (x + y) as u8])
        })
    }

    #[test]
    fn flip_horizontal_is_involution() {
        let img = gradient(5, 3);
        let twice = flip(&flip(&img, true, false), true, false);
        assert_eq!(img, twice);
    }

    #[test]
    fn flip_vertical_is_involution() {
        let img = gradient(4, 6);
        let twice = flip(&flip(&img, false, true), false, true);
        assert_eq!(img, twice);
    }

    #[test]
    fn flip_both_mirrors_corners() {
        let img = gradient(3, 2);
        let flipped = flip(&img, true, true);
        assert_eq!(flipped.get_pixel(0, 0), img.get_pixel(2, 1));
        assert_eq!(flipped.get_pixel(2, 1), img.get_pixel(0, 0));
    }

    #[test]
    fn scale_then_stride_recovers_original() {
        let img = gradient(4, 3);
        for factor in [1u32, 2, 3] {
            let scaled = scale(&img, factor);
            assert_eq!(scaled.dimensions(), (4 * factor, 3 * factor));
            for (x, y, px) in img.enumerate_pixels() {
                assert_eq!(scaled.get_pixel(x * factor, y * factor), px);
            }
        }
    }

    #[test]
    fn scale_fills_whole_blocks() {
        let img = gradient(2, 2);
        let scaled = scale(&img, 3);
        for dy in 0..3 {
            for dx in 0..3 {
                assert_eq!(scaled.get_pixel(3 + dx, 3 + dy), img.get_pixel(1, 1));
            }
        }
    }

    #[test]
    fn rotate_zero_is_identity() {
        let img = gradient(5, 4);
        let (rotated, pos) = rotate(&img, 0.0, (7, -3));
        assert_eq!(rotated, img);
        assert_eq!(pos, (7, -3));
    }

    #[test]
    fn rotate_quarter_turn_swaps_dims() {
        let img = gradient(6, 2);
        let (rotated, _) = rotate(&img, 90.0, (0, 0));
        assert_eq!(rotated.dimensions(), (2, 6));
    }

    #[test]
    fn rotate_keeps_center_anchored() {
        // 4x2 sprite at (10, 10): centre (12, 11). After a quarter turn the
        // box is 2x4, so the new top-left is (11, 9).
        let img = gradient(4, 2);
        let (_, pos) = rotate(&img, 90.0, (10, 10));
        assert_eq!(pos, (12 - 1, 11 - 2));
    }

    #[test]
    fn rotated_dims_match_bounding_box_formula() {
        assert_eq!(rotated_dims(10, 4, 0.0), (10, 4));
        assert_eq!(rotated_dims(10, 4, 90.0), (4, 10));
        assert_eq!(rotated_dims(10, 4, 180.0), (10, 4));
        // 45 degrees: w' = h' = round((10 + 4) * sqrt(0.5)) = 10
        assert_eq!(rotated_dims(10, 4, 45.0), (10, 10));
    }

    #[test]
    fn apply_alpha_keys_out_matching_pixels() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));

        let rgba = apply_alpha(&img, 0.5, 0);
        assert_eq!(rgba.get_pixel(0, 0)[3], 128); // round(255 * 0.5)
        assert_eq!(rgba.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn apply_alpha_respects_configured_key() {
        let img = RgbImage::from_pixel(1, 1, Rgb([60, 60, 60]));
        assert_eq!(apply_alpha(&img, 1.0, 60).get_pixel(0, 0)[3], 0);
        assert_eq!(apply_alpha(&img, 1.0, 0).get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn apply_alpha_requires_all_channels_to_match_key() {
        let img = RgbImage::from_pixel(1, 1, Rgb([0, 0, 1]));
        assert_eq!(apply_alpha(&img, 1.0, 0).get_pixel(0, 0)[3], 255);
    }
}
