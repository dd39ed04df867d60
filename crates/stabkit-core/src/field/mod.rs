pub mod draw;
pub mod fit;
pub mod ops;
pub mod sample;
pub mod transform;
pub mod warp;

use nalgebra::{Point2, Vector2};
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Zip};

use crate::consts::{MIN_FIELD_COLS, MIN_FIELD_ROWS};
use crate::frame::Resolution;
use crate::geometry::Homography;
use crate::imgproc::{self, Interpolation};

pub use warp::WarpContext;

/// Iteration strategy for [`WarpField::read`] and [`WarpField::write`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    /// Row-major order on the calling thread.
    Sequential,
    /// Spread over the rayon pool. No ordering guarantee.
    #[default]
    Parallel,
}

/// Grid of 2D offsets describing a backward warp: a cell's offset is added
/// to a destination coordinate to find the source it samples from. A 2×2
/// field is a global projective transform.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpField {
    offsets: Array2<Vector2<f32>>,
}

impl WarpField {
    /// Identity field with `size.width` columns and `size.height` rows.
    pub fn new(size: Resolution) -> Self {
        assert_valid_size(size);
        Self {
            offsets: Array2::from_elem(size.shape(), Vector2::zeros()),
        }
    }

    /// Field describing a uniform `motion` of the whole image.
    pub fn from_motion(size: Resolution, motion: Vector2<f32>) -> Self {
        let mut field = Self::new(size);
        field.set_to_motion(motion);
        field
    }

    /// Field describing `motion` over an image of extent `field_scale`.
    pub fn from_homography(size: Resolution, motion: &Homography, field_scale: Vector2<f32>) -> Self {
        let mut field = Self::new(size);
        field.set_to_homography(motion, field_scale);
        field
    }

    /// Wrap a raw offset grid, shape `(rows, cols)`.
    pub fn from_offsets(offsets: Array2<Vector2<f32>>) -> Self {
        assert_valid_size(Resolution::from_shape(offsets.dim()));
        Self { offsets }
    }

    /// Grid size as `cols × rows`.
    pub fn size(&self) -> Resolution {
        Resolution::from_shape(self.offsets.dim())
    }

    pub fn cols(&self) -> usize {
        self.offsets.ncols()
    }

    pub fn rows(&self) -> usize {
        self.offsets.nrows()
    }

    pub fn offsets(&self) -> ArrayView2<'_, Vector2<f32>> {
        self.offsets.view()
    }

    pub fn offsets_mut(&mut self) -> ArrayViewMut2<'_, Vector2<f32>> {
        self.offsets.view_mut()
    }

    /// Resample the grid to `size` with bilinear interpolation. The offsets
    /// themselves are not rescaled.
    pub fn resize(&mut self, size: Resolution) {
        assert_valid_size(size);
        if self.size() == size {
            return;
        }
        self.offsets = imgproc::resize(&self.offsets, size, Interpolation::Linear);
    }

    pub fn set_identity(&mut self) {
        self.offsets.fill(Vector2::zeros());
    }

    /// Describe a uniform `motion`. The stored offsets are its negation since
    /// the field maps destinations back to sources.
    pub fn set_to_motion(&mut self, motion: Vector2<f32>) {
        self.offsets.fill(-motion);
    }

    /// Describe `motion` over an image of extent `field_scale`: every grid node
    /// holds the displacement of the inverse transform at its image position.
    pub fn set_to_homography(&mut self, motion: &Homography, field_scale: Vector2<f32>) {
        let inverse = motion.invert();
        let step = self.node_spacing(field_scale);
        self.write(
            |offset, coord| {
                let p = Point2::new(coord.x as f32 * step.x, coord.y as f32 * step.y);
                *offset = inverse.apply(p) - p;
            },
            Traversal::Parallel,
        );
    }

    /// Visit every offset with its `(col, row)` coordinate.
    pub fn read<F>(&self, op: F, traversal: Traversal)
    where
        F: Fn(&Vector2<f32>, Point2<usize>) + Sync + Send,
    {
        match traversal {
            Traversal::Sequential => {
                for ((r, c), v) in self.offsets.indexed_iter() {
                    op(v, Point2::new(c, r));
                }
            }
            Traversal::Parallel => {
                Zip::indexed(&self.offsets).par_for_each(|(r, c), v| op(v, Point2::new(c, r)));
            }
        }
    }

    /// Mutate every offset in place, given its `(col, row)` coordinate.
    pub fn write<F>(&mut self, op: F, traversal: Traversal)
    where
        F: Fn(&mut Vector2<f32>, Point2<usize>) + Sync + Send,
    {
        match traversal {
            Traversal::Sequential => {
                for ((r, c), v) in self.offsets.indexed_iter_mut() {
                    op(v, Point2::new(c, r));
                }
            }
            Traversal::Parallel => {
                Zip::indexed(&mut self.offsets).par_for_each(|(r, c), v| op(v, Point2::new(c, r)));
            }
        }
    }

    /// Row-major `(coord, offset)` pairs, coord being `(col, row)`.
    pub fn iter(&self) -> impl Iterator<Item = (Point2<usize>, Vector2<f32>)> + '_ {
        self.offsets
            .indexed_iter()
            .map(|((r, c), v)| (Point2::new(c, r), *v))
    }

    /// Image-space distance between neighbouring grid nodes when the corner
    /// nodes span `field_scale`.
    fn node_spacing(&self, field_scale: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            field_scale.x / (self.cols() - 1) as f32,
            field_scale.y / (self.rows() - 1) as f32,
        )
    }
}

fn assert_valid_size(size: Resolution) {
    assert!(
        size.width >= MIN_FIELD_COLS && size.height >= MIN_FIELD_ROWS,
        "warp field must be at least {MIN_FIELD_COLS}x{MIN_FIELD_ROWS}, got {size}"
    );
}
