//! Localized region drawn onto the matched reference document.
use crate::image::draw::draw_polygon;
use crate::image::GrayImageU8;
use crate::verify::Quad;

/// Outline thickness in pixels.
pub const OUTLINE_THICKNESS: usize = 3;

/// Copy of `document` with `quad` outlined. The outline is black on light
/// pages and white on dark ones.
pub fn render_overlay(document: &GrayImageU8, quad: &Quad) -> GrayImageU8 {
    let mut canvas = document.clone();
    let value = if mean_intensity(document) >= 128.0 { 0 } else { 255 };
    draw_polygon(&mut canvas, &quad.0, OUTLINE_THICKNESS, value);
    canvas
}

fn mean_intensity(img: &GrayImageU8) -> f64 {
    if img.data().is_empty() {
        return 0.0;
    }
    img.data().iter().map(|&v| v as f64).sum::<f64>() / img.data().len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_outline_is_drawn_and_interior_kept() {
        let page = GrayImageU8::filled(60, 40, 230);
        let quad = Quad([[10.0, 8.0], [50.0, 8.0], [50.0, 32.0], [10.0, 32.0]]);
        let out = render_overlay(&page, &quad);

        for &[x, y] in &quad.0 {
            assert_eq!(out.get(x as usize, y as usize), 0);
        }
        for x in 10..=50 {
            assert_eq!(out.get(x, 8), 0, "top edge at x={x}");
            assert_eq!(out.get(x, 32), 0, "bottom edge at x={x}");
        }
        for y in 8..=32 {
            assert_eq!(out.get(10, y), 0, "left edge at y={y}");
            assert_eq!(out.get(50, y), 0, "right edge at y={y}");
        }
        assert_eq!(out.get(30, 20), 230);
        assert_eq!(out.get(2, 2), 230);
        assert_eq!(out.get(30, 12), 230);
        assert_eq!(page.get(10, 8), 230);
    }

    #[test]
    fn dark_pages_get_a_white_outline() {
        let page = GrayImageU8::filled(20, 20, 20);
        let quad = Quad([[2.0, 2.0], [17.0, 2.0], [17.0, 17.0], [2.0, 17.0]]);
        let out = render_overlay(&page, &quad);
        assert_eq!(out.get(10, 2), 255);
        assert_eq!(out.get(10, 10), 20);
    }

    #[test]
    fn quad_partly_outside_is_clipped() {
        let page = GrayImageU8::filled(30, 30, 255);
        let quad = Quad([[-20.0, 5.0], [25.0, 5.0], [25.0, 80.0], [-20.0, 80.0]]);
        let out = render_overlay(&page, &quad);
        assert_eq!(out.get(0, 5), 0);
        assert_eq!(out.get(25, 29), 0);
        assert_eq!(out.get(10, 20), 255);
    }
}
