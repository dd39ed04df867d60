use nalgebra::Point2;

use crate::frame::Resolution;

use super::rect::Rect;

/// A regular partition of a continuous region into `cols × rows` cells.
#[derive(Clone, Copy, Debug)]
pub struct VirtualGrid {
    dims: Resolution,
    alignment: Rect,
    cell_width: f32,
    cell_height: f32,
}

impl VirtualGrid {
    pub fn new(dims: Resolution, alignment: Rect) -> Self {
        assert!(dims.width > 0 && dims.height > 0, "grid must have cells");
        assert!(
            alignment.width > 0.0 && alignment.height > 0.0,
            "grid alignment must have a positive area"
        );
        Self {
            dims,
            alignment,
            cell_width: alignment.width / dims.width as f32,
            cell_height: alignment.height / dims.height as f32,
        }
    }

    /// The `(col, row)` of the cell containing `p`, if `p` lies in the grid.
    pub fn try_key_of(&self, p: Point2<f32>) -> Option<(usize, usize)> {
        let fx = ((p.x - self.alignment.x) / self.cell_width).floor();
        let fy = ((p.y - self.alignment.y) / self.cell_height).floor();
        if !fx.is_finite() || !fy.is_finite() || fx < 0.0 || fy < 0.0 {
            return None;
        }

        let (col, row) = (fx as usize, fy as usize);
        (col < self.dims.width && row < self.dims.height).then_some((col, row))
    }

    /// Row-major index of the cell `(col, row)`.
    pub fn index_of(&self, (col, row): (usize, usize)) -> usize {
        row * self.dims.width + col
    }

    pub fn cell_count(&self) -> usize {
        self.dims.area()
    }
}
