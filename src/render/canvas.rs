use std::f32::consts::PI;

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_ellipse_mut, draw_filled_rect_mut, draw_hollow_ellipse_mut, draw_line_segment_mut,
    draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

/// How a closed shape is painted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    Filled,
    /// Stroke of the given width, drawn inside the shape boundary
    Outline(u32),
}

/// Drawing surface over an RGB frame, backed by `imageproc`.
///
/// Coordinates are in pixels with integer values at pixel centers. Shapes
/// are clipped to the frame; nothing here fails on off-screen geometry.
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Clip an inclusive pixel range to the frame.
    fn clip(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> Option<(u32, u32, u32, u32)> {
        let max_x = self.width() as i64 - 1;
        let max_y = self.height() as i64 - 1;
        let (x0, x1) = (x0.max(0), x1.min(max_x));
        let (y0, y1) = (y0.max(0), y1.min(max_y));
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    /// Fill the rectangle with inclusive corners `(x0, y0)` and `(x1, y1)`.
    /// Reversed corners draw nothing.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        if x1 < x0 || y1 < y0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(x0, y0, x1, y1) else {
            return;
        };
        let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1);
        draw_filled_rect_mut(&mut self.image, rect, color);
    }

    /// Axis-aligned ellipse centered at `(cx, cy)`. Radii are rounded to
    /// whole pixels.
    pub fn draw_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, color: Rgb<u8>, paint: Paint) {
        if !(cx.is_finite() && cy.is_finite() && rx >= 0.0 && ry >= 0.0) {
            return;
        }
        let center = (cx.round() as i32, cy.round() as i32);
        let (rx, ry) = (rx.round() as i32, ry.round() as i32);

        match paint {
            Paint::Filled => draw_filled_ellipse_mut(&mut self.image, center, rx, ry, color),
            Paint::Outline(width) if width <= 1 || rx.min(ry) == 0 => {
                draw_hollow_ellipse_mut(&mut self.image, center, rx, ry, color)
            }
            Paint::Outline(width) => {
                let inset = width as i32 - 1;
                if inset >= rx.min(ry) {
                    draw_filled_ellipse_mut(&mut self.image, center, rx, ry, color);
                } else {
                    self.fill_ring(center, (rx, ry), (rx - inset, ry - inset), color);
                }
            }
        }
    }

    /// Annulus between two concentric ellipses, filled as quads around the
    /// circumference.
    fn fill_ring(&mut self, center: (i32, i32), outer: (i32, i32), inner: (i32, i32), color: Rgb<u8>) {
        let segments = ((2.0 * PI * outer.0.max(outer.1) as f32) / 3.0).ceil().max(12.0) as usize;
        let at = |radii: (i32, i32), k: usize| -> Point<i32> {
            let angle = 2.0 * PI * k as f32 / segments as f32;
            Point::new(
                center.0 + (radii.0 as f32 * angle.cos()).round() as i32,
                center.1 + (radii.1 as f32 * angle.sin()).round() as i32,
            )
        };
        for k in 0..segments {
            let quad = [at(outer, k), at(outer, k + 1), at(inner, k + 1), at(inner, k)];
            self.fill_polygon(&quad, color);
        }
    }

    /// Filled polygon, tolerating the degenerate inputs `draw_polygon_mut`
    /// rejects (repeated or closing points).
    fn fill_polygon(&mut self, points: &[Point<i32>], color: Rgb<u8>) {
        let mut poly: Vec<Point<i32>> = Vec::with_capacity(points.len());
        for &p in points {
            if poly.last() != Some(&p) {
                poly.push(p);
            }
        }
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }

        let (w, h) = (self.width() as i32, self.height() as i32);
        let off_frame = poly.iter().all(|p| p.x < 0)
            || poly.iter().all(|p| p.y < 0)
            || poly.iter().all(|p| p.x >= w)
            || poly.iter().all(|p| p.y >= h);
        if off_frame {
            return;
        }

        match poly.as_slice() {
            [] => {}
            [p] => draw_filled_ellipse_mut(&mut self.image, (p.x, p.y), 0, 0, color),
            [a, b] => draw_line_segment_mut(
                &mut self.image,
                (a.x as f32, a.y as f32),
                (b.x as f32, b.y as f32),
                color,
            ),
            _ => draw_polygon_mut(&mut self.image, &poly, color),
        }
    }

    /// Straight segment. Widths above one are drawn as a filled quad with
    /// round caps.
    pub fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb<u8>, width: u32) {
        let (ax, ay) = from;
        let (bx, by) = to;
        if !(ax.is_finite() && ay.is_finite() && bx.is_finite() && by.is_finite()) {
            return;
        }
        if width <= 1 {
            draw_line_segment_mut(&mut self.image, from, to, color);
            return;
        }

        let half = width as f32 / 2.0;
        let (vx, vy) = (bx - ax, by - ay);
        let len = (vx * vx + vy * vy).sqrt();
        if len > 0.0 {
            let (nx, ny) = (-vy / len * half, vx / len * half);
            let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
            let quad = [
                corner(ax + nx, ay + ny),
                corner(bx + nx, by + ny),
                corner(bx - nx, by - ny),
                corner(ax - nx, ay - ny),
            ];
            self.fill_polygon(&quad, color);
        }

        if width >= 3 || len == 0.0 {
            let cap = (width - 1) as f32 / 2.0;
            self.draw_ellipse(ax, ay, cap, cap, color, Paint::Filled);
            self.draw_ellipse(bx, by, cap, cap, color, Paint::Filled);
        }
    }

    /// Connected segments through `points`; fewer than two points draw nothing.
    pub fn draw_polyline(&mut self, points: &[(f32, f32)], color: Rgb<u8>, width: u32) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], color, width);
        }
    }

    /// Closed outline through `points`.
    pub fn draw_polygon(&mut self, points: &[(f32, f32)], color: Rgb<u8>, width: u32) {
        if points.len() < 2 {
            return;
        }
        self.draw_polyline(points, color, width);
        self.draw_line(points[points.len() - 1], points[0], color, width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb<u8> = Rgb([0, 0, 0]);
    const FG: Rgb<u8> = Rgb([255, 255, 255]);

    fn count(canvas: &Canvas, color: Rgb<u8>) -> usize {
        canvas.image.pixels().filter(|&&p| p == color).count()
    }

    #[test]
    fn new_canvas_is_background() {
        let canvas = Canvas::new(8, 4, Rgb([1, 2, 3]));
        assert_eq!(count(&canvas, Rgb([1, 2, 3])), 32);
    }

    #[test]
    fn fill_rect_is_inclusive_and_clipped() {
        let mut canvas = Canvas::new(10, 10, BG);
        canvas.fill_rect(2, 3, 4, 5, FG);
        assert_eq!(count(&canvas, FG), 9);

        let mut canvas = Canvas::new(10, 10, BG);
        canvas.fill_rect(-5, -5, 100, 0, FG);
        assert_eq!(count(&canvas, FG), 10);
    }

    #[test]
    fn reversed_rect_draws_nothing() {
        let mut canvas = Canvas::new(10, 10, BG);
        canvas.fill_rect(6, 2, 4, 8, FG);
        canvas.fill_rect(2, 8, 4, 6, FG);
        assert_eq!(count(&canvas, FG), 0);
    }

    #[test]
    fn outline_circle_ring_width() {
        let mut canvas = Canvas::new(101, 101, BG);
        canvas.draw_ellipse(50.0, 50.0, 20.0, 20.0, FG, Paint::Outline(1));
        let img = canvas.into_image();
        assert_eq!(*img.get_pixel(70, 50), FG);
        assert_eq!(*img.get_pixel(50, 30), FG);
        assert_eq!(*img.get_pixel(69, 50), BG);
        assert_eq!(*img.get_pixel(71, 50), BG);
        assert_eq!(*img.get_pixel(50, 50), BG);
    }

    #[test]
    fn thick_outline_grows_inward() {
        let mut canvas = Canvas::new(101, 101, BG);
        canvas.draw_ellipse(50.0, 50.0, 20.0, 20.0, FG, Paint::Outline(4));
        let img = canvas.into_image();
        for x in 68..=70 {
            assert_eq!(*img.get_pixel(x, 50), FG);
            assert_eq!(*img.get_pixel(50, 100 - x), FG);
        }
        assert_eq!(*img.get_pixel(65, 50), BG);
        assert_eq!(*img.get_pixel(72, 50), BG);
        assert_eq!(*img.get_pixel(50, 50), BG);
    }

    #[test]
    fn thick_outline_has_no_holes_on_diagonals() {
        let mut canvas = Canvas::new(401, 401, BG);
        canvas.draw_ellipse(200.0, 200.0, 168.0, 168.0, FG, Paint::Outline(8));
        let img = canvas.into_image();
        // radius 164 sits mid-stroke at every angle
        for step in 0..72 {
            let angle = step as f32 * 5.0f32.to_radians();
            let x = (200.0 + 164.0 * angle.cos()).round() as u32;
            let y = (200.0 + 164.0 * angle.sin()).round() as u32;
            assert_eq!(*img.get_pixel(x, y), FG, "hole at {} degrees", step * 5);
        }
    }

    #[test]
    fn filled_circle_covers_center() {
        let mut canvas = Canvas::new(21, 21, BG);
        canvas.draw_ellipse(10.0, 10.0, 3.0, 3.0, FG, Paint::Filled);
        let img = canvas.into_image();
        assert_eq!(*img.get_pixel(10, 10), FG);
        assert_eq!(*img.get_pixel(13, 10), FG);
        assert_eq!(*img.get_pixel(10, 7), FG);
        assert_eq!(*img.get_pixel(14, 10), BG);
        assert_eq!(*img.get_pixel(13, 13), BG);
    }

    #[test]
    fn offscreen_shapes_are_clipped() {
        let mut canvas = Canvas::new(10, 10, BG);
        canvas.draw_ellipse(-100.0, -100.0, 5.0, 5.0, FG, Paint::Filled);
        canvas.draw_ellipse(-100.0, -100.0, 30.0, 30.0, FG, Paint::Outline(4));
        canvas.draw_line((-50.0, -50.0), (-20.0, -10.0), FG, 3);
        canvas.fill_rect(20, 20, 30, 30, FG);
        assert_eq!(count(&canvas, FG), 0);
    }

    #[test]
    fn horizontal_line_has_no_gaps() {
        let mut canvas = Canvas::new(20, 5, BG);
        canvas.draw_line((1.0, 2.0), (18.0, 2.0), FG, 1);
        let img = canvas.into_image();
        for x in 1..=18 {
            assert_eq!(*img.get_pixel(x, 2), FG);
        }
        assert_eq!(*img.get_pixel(10, 1), BG);
    }

    #[test]
    fn thick_line_covers_its_width() {
        let mut canvas = Canvas::new(30, 20, BG);
        canvas.draw_line((5.0, 10.0), (25.0, 10.0), FG, 4);
        let img = canvas.into_image();
        for y in 9..=11 {
            assert_eq!(*img.get_pixel(15, y), FG);
        }
        assert_eq!(*img.get_pixel(15, 14), BG);
        assert_eq!(*img.get_pixel(15, 6), BG);
    }

    #[test]
    fn zero_length_thick_line_is_a_dot() {
        let mut canvas = Canvas::new(10, 10, BG);
        canvas.draw_line((5.0, 5.0), (5.0, 5.0), FG, 2);
        let img = canvas.into_image();
        assert_eq!(*img.get_pixel(5, 5), FG);
        assert_eq!(*img.get_pixel(8, 5), BG);
    }

    #[test]
    fn diagonal_line_touches_every_column() {
        let mut canvas = Canvas::new(40, 40, BG);
        canvas.draw_line((0.0, 0.0), (39.0, 19.5), FG, 1);
        let img = canvas.into_image();
        for x in 0..40 {
            assert!((0..40).any(|y| *img.get_pixel(x, y) == FG), "gap at column {}", x);
        }
    }

    #[test]
    fn polyline_needs_two_points() {
        let mut canvas = Canvas::new(10, 10, BG);
        canvas.draw_polyline(&[(5.0, 5.0)], FG, 2);
        canvas.draw_polygon(&[(5.0, 5.0)], FG, 2);
        assert_eq!(count(&canvas, FG), 0);
    }

    #[test]
    fn polygon_is_closed() {
        let mut canvas = Canvas::new(20, 20, BG);
        canvas.draw_polygon(&[(2.0, 2.0), (17.0, 2.0), (17.0, 17.0), (2.0, 17.0)], FG, 1);
        let img = canvas.into_image();
        // closing edge from (2, 17) back to (2, 2)
        assert_eq!(*img.get_pixel(2, 10), FG);
        assert_eq!(*img.get_pixel(10, 10), BG);
    }
}
