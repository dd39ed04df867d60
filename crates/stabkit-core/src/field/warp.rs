use nalgebra::{Point2, Vector2};
use ndarray::{s, Array2, ArrayView2, Zip};

use crate::frame::{Frame, Resolution};
use crate::geometry::Homography;
use crate::imgproc::{self, remap::remap_into, Border, Interpolation};

use super::WarpField;

/// Scratch space for applying warp fields.
///
/// Holds an identity coordinate grid and a staging buffer for the upsampled
/// offsets. Both only ever grow, so a context reused across frames of one
/// resolution allocates once.
#[derive(Debug, Default)]
pub struct WarpContext {
    identity: Array2<Vector2<f32>>,
    staging: Array2<Vector2<f32>>,
}

impl WarpContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity grid of at least `resolution`, where each element holds its
    /// own `(col, row)` coordinate.
    pub fn identity_grid(&mut self, resolution: Resolution) -> ArrayView2<'_, Vector2<f32>> {
        let cached = Resolution::from_shape(self.identity.dim());
        if resolution.width > cached.width || resolution.height > cached.height {
            let grown = resolution.max(&cached);
            self.identity = Array2::from_shape_fn(grown.shape(), |(r, c)| {
                Vector2::new(c as f32, r as f32)
            });
        }
        self.identity.slice(s![..resolution.height, ..resolution.width])
    }

    /// Upsample `field` to `resolution` and add the identity grid, leaving the
    /// absolute sample map in the staging buffer.
    fn build_map(&mut self, field: &WarpField, resolution: Resolution) -> ArrayView2<'_, Vector2<f32>> {
        let cached = Resolution::from_shape(self.staging.dim());
        if resolution.width > cached.width || resolution.height > cached.height {
            self.staging = Array2::from_elem(resolution.max(&cached).shape(), Vector2::zeros());
        }

        let (h, w) = resolution.shape();
        imgproc::resize_into(
            field.offsets.view(),
            self.staging.slice_mut(s![..h, ..w]),
            Interpolation::Linear,
        );

        // Make sure the identity grid covers the request before borrowing both.
        self.identity_grid(resolution);
        let identity = self.identity.slice(s![..h, ..w]);
        Zip::from(self.staging.slice_mut(s![..h, ..w]))
            .and(&identity)
            .par_for_each(|m, id| *m += *id);

        self.staging.slice(s![..h, ..w])
    }
}

impl WarpField {
    /// Warp `src` through the field into a new image of the same size. Pixels
    /// sampled from outside `src` are zero.
    pub fn warp(&self, src: &Array2<f32>, ctx: &mut WarpContext) -> Array2<f32> {
        let resolution = Resolution::from_shape(src.dim());
        if self.cols() == 2 && self.rows() == 2 {
            if let Some(transform) = self.corner_transform(resolution) {
                return imgproc::warp_perspective(src, &transform, resolution, Border::Constant(0.0));
            }
            tracing::warn!("degenerate 2x2 warp field, falling back to remapping");
        }

        let mut dst = Array2::<f32>::zeros(src.dim());
        let map = ctx.build_map(self, resolution);
        remap_into(src.view(), map, dst.view_mut(), Border::Constant(0.0));
        dst
    }

    /// Warp a frame, keeping its metadata.
    pub fn warp_frame(&self, frame: &Frame, ctx: &mut WarpContext) -> Frame {
        Frame {
            data: self.warp(&frame.data, ctx),
            metadata: frame.metadata.clone(),
        }
    }

    /// Absolute sample map for an image of `resolution`: element `(r, c)` is
    /// the source coordinate that destination pixel `(c, r)` reads from.
    pub fn to_map(&self, resolution: Resolution, ctx: &mut WarpContext) -> Array2<Vector2<f32>> {
        assert!(resolution.area() > 0, "cannot build a map for an empty resolution");
        ctx.build_map(self, resolution).to_owned()
    }

    /// Perspective transform taking destination corners of an image of
    /// `resolution` to their source positions.
    fn corner_transform(&self, resolution: Resolution) -> Option<Homography> {
        let (w, h) = resolution.to_f32();
        let destination = [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(0.0, h),
            Point2::new(w, h),
        ];
        let source = [
            destination[0] + self.offsets[[0, 0]],
            destination[1] + self.offsets[[0, 1]],
            destination[2] + self.offsets[[1, 0]],
            destination[3] + self.offsets[[1, 1]],
        ];
        Homography::from_point_pairs(&destination, &source)
    }
}
