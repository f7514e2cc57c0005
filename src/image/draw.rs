//! Minimal raster drawing on [`GrayImageU8`] for result overlays.
use super::u8::GrayImageU8;

/// Clip the segment `p0 → p1` to `[0, w-1] × [0, h-1]` (Liang-Barsky).
fn clip_segment(
    p0: [f64; 2],
    p1: [f64; 2],
    w: usize,
    h: usize,
) -> Option<([f64; 2], [f64; 2])> {
    if w == 0 || h == 0 || !p0.iter().chain(&p1).all(|v| v.is_finite()) {
        return None;
    }
    let (xmax, ymax) = ((w - 1) as f64, (h - 1) as f64);
    let (dx, dy) = (p1[0] - p0[0], p1[1] - p0[1]);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, p0[0]),
        (dx, xmax - p0[0]),
        (-dy, p0[1]),
        (dy, ymax - p0[1]),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        [p0[0] + t0 * dx, p0[1] + t0 * dy],
        [p0[0] + t1 * dx, p0[1] + t1 * dy],
    ))
}

/// Square brush of side `thickness` centred on `(x, y)`, clipped to the image.
fn stamp(img: &mut GrayImageU8, x: i64, y: i64, thickness: usize, value: u8) {
    let t = thickness.max(1) as i64;
    let lo = -(t - 1) / 2;
    for oy in lo..lo + t {
        for ox in lo..lo + t {
            let (px, py) = (x + ox, y + oy);
            if px >= 0 && py >= 0 && (px as usize) < img.width() && (py as usize) < img.height() {
                img.set(px as usize, py as usize, value);
            }
        }
    }
}

/// Bresenham line from `p0` to `p1`; the parts outside the image are skipped.
pub fn draw_segment(
    img: &mut GrayImageU8,
    p0: [f64; 2],
    p1: [f64; 2],
    thickness: usize,
    value: u8,
) {
    let Some((a, b)) = clip_segment(p0, p1, img.width(), img.height()) else {
        return;
    };
    let (mut x0, mut y0) = (a[0].round() as i64, a[1].round() as i64);
    let (x1, y1) = (b[0].round() as i64, b[1].round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        stamp(img, x0, y0, thickness, value);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Closed outline through `points`.
pub fn draw_polygon(img: &mut GrayImageU8, points: &[[f64; 2]], thickness: usize, value: u8) {
    for (i, &p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        draw_segment(img, p, q, thickness, value);
    }
}
