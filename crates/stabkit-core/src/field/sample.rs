use nalgebra::{Point2, Vector2};

use super::WarpField;

impl WarpField {
    /// Offset stored at cell `(col, row)`.
    pub fn at(&self, col: usize, row: usize) -> Vector2<f32> {
        assert!(
            col < self.cols() && row < self.rows(),
            "cell ({col}, {row}) outside {} field",
            self.size()
        );
        self.offsets[[row, col]]
    }

    pub fn at_mut(&mut self, col: usize, row: usize) -> &mut Vector2<f32> {
        assert!(
            col < self.cols() && row < self.rows(),
            "cell ({col}, {row}) outside {} field",
            self.size()
        );
        &mut self.offsets[[row, col]]
    }

    /// Bilinear sample at a continuous grid position.
    ///
    /// Cell `(c, r)` covers `[c, c + 1) × [r, r + 1)` and its value sits at the
    /// cell centre, so `sample((c + 0.5, r + 0.5)) == at(c, r)`. The second
    /// neighbour on each axis is taken on the side of the centre the point
    /// falls towards; neighbours past the grid edge are clamped, which makes
    /// the field constant beyond its outer cell centres.
    pub fn sample(&self, point: Point2<f32>) -> Vector2<f32> {
        assert!(
            point.x.is_finite() && point.y.is_finite(),
            "cannot sample a warp field at a non-finite point"
        );
        let (c0, c1, tx) = taps(point.x, self.cols());
        let (r0, r1, ty) = taps(point.y, self.rows());

        let top = self.offsets[[r0, c0]] * (1.0 - tx) + self.offsets[[r0, c1]] * tx;
        let bot = self.offsets[[r1, c0]] * (1.0 - tx) + self.offsets[[r1, c1]] * tx;
        top * (1.0 - ty) + bot * ty
    }

    /// Where `point` ends up after following the field: `point + sample(point)`.
    pub fn trace(&self, point: Point2<f32>) -> Point2<f32> {
        point + self.sample(point)
    }
}

/// Lower and upper neighbour indices around `v` along an axis of `n` cells,
/// with the weight of the upper one. Each index is clamped on its own.
fn taps(v: f32, n: usize) -> (usize, usize, f32) {
    let u = v - 0.5;
    let lo = u.floor();
    let t = u - lo;

    let last = (n - 1) as f32;
    let i0 = lo.clamp(0.0, last) as usize;
    let i1 = (lo + 1.0).clamp(0.0, last) as usize;
    (i0, i1, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taps_interior_and_edges() {
        assert_eq!(taps(1.5, 4), (1, 2, 0.0));
        assert_eq!(taps(1.75, 4), (1, 2, 0.25));
        assert_eq!(taps(1.25, 4), (0, 1, 0.75));
        // Before the first centre both taps clamp to cell 0.
        assert_eq!(taps(0.25, 4), (0, 0, 0.75));
        // Past the last centre both taps clamp to the last cell.
        assert_eq!(taps(3.75, 4), (3, 3, 0.25));
        assert_eq!(taps(-2.0, 4).0, 0);
        assert_eq!(taps(10.0, 4).1, 3);
    }
}
