//! Fitting a warp field to sparse point correspondences.
//!
//! Motion is estimated coarse to fine, in the style of MeshFlow (Liu et al.,
//! ECCV 2016). A 2×2 field is seeded from a global transform hint or from a
//! unit-weight accumulation pass. The grid is then repeatedly doubled,
//! bilinearly upsampled, refined with a halved step weight, and median
//! filtered until it reaches the requested size.
//!
//! Each accumulation pass bins correspondences into the grid cell containing
//! their warped point and nudges that cell's estimate one fixed step per axis
//! towards the observed motion. Stepping by the sign of the residual makes
//! every cell converge to a per-axis median of its samples, which is robust to
//! the outliers a global estimator lets through.

use nalgebra::{Point2, Vector2};
use ndarray::Array2;

use crate::frame::Resolution;
use crate::geometry::{Homography, Rect, VirtualGrid};
use crate::imgproc::{self, Interpolation};

use super::WarpField;

impl WarpField {
    /// Field of `size` fitted to the correspondences `origin[i] -> warped[i]`
    /// within `region`.
    pub fn from_points(
        size: Resolution,
        region: Rect,
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        hint: Option<&Homography>,
    ) -> Self {
        let mut field = Self::new(size);
        field.fit_points(region, origin, warped, hint);
        field
    }

    /// Replace the field with one fitted to the correspondences
    /// `origin[i] -> warped[i]`. `region` is the image area the field's corner
    /// nodes span. The field keeps its current size.
    pub fn fit_points(
        &mut self,
        region: Rect,
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        hint: Option<&Homography>,
    ) {
        assert_eq!(
            origin.len(),
            warped.len(),
            "correspondence sets must have equal length"
        );
        assert!(
            region.width > 0.0 && region.height > 0.0,
            "fit region must have a positive area"
        );

        let mut motions = Array2::from_elem((2, 2), Vector2::zeros());
        match hint {
            Some(transform) => {
                let inverse = transform.invert();
                let corners = [
                    ((0, 0), region.top_left()),
                    ((0, 1), region.top_right()),
                    ((1, 0), region.bottom_left()),
                    ((1, 1), region.bottom_right()),
                ];
                for ((r, c), p) in corners {
                    motions[[r, c]] = inverse.apply(p) - p;
                }
            }
            None => {
                let seed_region = Rect::new(
                    region.x - region.width / 2.0,
                    region.y - region.height / 2.0,
                    region.width * 2.0,
                    region.height * 2.0,
                );
                accumulate_motions(&mut motions, 1.0, seed_region, origin, warped);
            }
        }

        let (target_rows, target_cols) = self.offsets.dim();
        let mut weight = 0.5f32;
        while motions.dim() != (target_rows, target_cols) {
            let rows = (motions.nrows() * 2).min(target_rows);
            let cols = (motions.ncols() * 2).min(target_cols);

            // Cell centres sit on the region's grid nodes.
            let cell_w = region.width / (cols - 1) as f32;
            let cell_h = region.height / (rows - 1) as f32;
            let alignment = Rect::new(
                region.x - cell_w * 0.5,
                region.y - cell_h * 0.5,
                cols as f32 * cell_w,
                rows as f32 * cell_h,
            );

            weight /= 2.0;
            let mut refined = imgproc::resize(
                &motions,
                Resolution::new(cols, rows),
                Interpolation::Linear,
            );
            accumulate_motions(&mut refined, weight, alignment, origin, warped);
            motions = imgproc::median_blur_3x3(&refined);
        }

        self.offsets = motions;
    }
}

fn accumulate_motions(
    motions: &mut Array2<Vector2<f32>>,
    weight: f32,
    alignment: Rect,
    origin: &[Point2<f32>],
    warped: &[Point2<f32>],
) {
    debug_assert!(weight > 0.0);

    let grid = VirtualGrid::new(Resolution::from_shape(motions.dim()), alignment);
    for (o, w) in origin.iter().zip(warped) {
        let Some((col, row)) = grid.try_key_of(*w) else {
            continue;
        };

        let motion = o - w;
        let estimate = &mut motions[[row, col]];
        estimate.x += weight * sign(motion.x - estimate.x);
        estimate.y += weight * sign(motion.y - estimate.y);
    }
}

fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
