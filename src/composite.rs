//! Straight-alpha "over" compositing of transformed sprites onto a canvas.

use image::{Rgba, RgbaImage};

/// Composites `src` over `dst` with straight (non-premultiplied) alpha:
///
/// ```text
/// a_out = 1 - (1 - a_s)(1 - a_d)
/// c_out = (a_s * c_s + (1 - a_s) * a_d * c_d) / a_out   (0 when a_out = 0)
/// ```
///
/// Colour channels truncate to u8 after the normalized-space blend.
pub fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }

    let sa = f64::from(src[3]) / 255.0;
    let da = f64::from(dst[3]) / 255.0;
    let out_a = 1.0 - (1.0 - sa) * (1.0 - da);

    let mut out = [0u8; 4];
    if out_a > 0.0 {
        for c in 0..3 {
            let blended =
                (sa * f64::from(src[c]) + (1.0 - sa) * da * f64::from(dst[c])) / out_a;
            out[c] = blended as u8;
        }
    }
    out[3] = (out_a * 255.0) as u8;
    Rgba(out)
}

/// Layers `sprite` onto `canvas` with its top-left corner at `position`,
/// blending only the overlap rectangle. Regions extending beyond any canvas
/// edge are clipped; a fully off-canvas sprite blends nothing.
pub fn layer(canvas: &mut RgbaImage, sprite: &RgbaImage, position: (i32, i32)) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = sprite.dimensions();

    let x0 = position.0.max(0);
    let y0 = position.1.max(0);
    let x1 = position.0.saturating_add(sw as i32).min(cw as i32);
    let y1 = position.1.saturating_add(sh as i32).min(ch as i32);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for y in y0..y1 {
        for x in x0..x1 {
            let sx = (x - position.0) as u32;
            let sy = (y - position.1) as u32;
            let blended = over(
                *canvas.get_pixel(x as u32, y as u32),
                *sprite.get_pixel(sx, sy),
            );
            canvas.put_pixel(x as u32, y as u32, blended);
        }
    }
}
