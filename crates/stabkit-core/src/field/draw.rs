use nalgebra::{Point2, Vector2};
use ndarray::Array2;

use crate::frame::Frame;

use super::WarpField;

impl WarpField {
    /// Overlay the field's motion vectors on `frame`.
    ///
    /// Each grid node is placed at its image position and a line of
    /// `thickness` pixels is drawn towards where the node's content moved to,
    /// painted with `intensity`.
    pub fn draw(&self, frame: &mut Frame, intensity: f32, thickness: usize) {
        assert!(thickness > 0, "line thickness must be positive");
        assert!(!frame.is_empty(), "cannot draw onto an empty frame");

        let (h, w) = frame.data.dim();
        let step = self.node_spacing(Vector2::new(w as f32, h as f32));

        let mut mask = Array2::<bool>::from_elem((h, w), false);
        for (coord, offset) in self.iter() {
            let origin = Point2::new(coord.x as f32 * step.x, coord.y as f32 * step.y);
            draw_line(&mut mask, origin, origin - offset, thickness);
        }

        frame.data.zip_mut_with(&mask, |px, &hit| {
            if hit {
                *px = intensity;
            }
        });
    }
}

/// Rasterize a line into `mask` with a square brush.
fn draw_line(mask: &mut Array2<bool>, from: Point2<f32>, to: Point2<f32>, thickness: usize) {
    let (h, w) = mask.dim();
    let delta = to - from;
    let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as usize;
    let lo = (thickness as isize - 1) / 2;
    let hi = thickness as isize / 2;

    for i in 0..=steps {
        let p = from + delta * (i as f32 / steps as f32);
        let (cx, cy) = (p.x.round() as isize, p.y.round() as isize);
        for dy in -lo..=hi {
            for dx in -lo..=hi {
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h {
                    mask[[y as usize, x as usize]] = true;
                }
            }
        }
    }
}
