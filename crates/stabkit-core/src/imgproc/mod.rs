use std::ops::{Add, Mul};

use nalgebra::Vector2;
use ndarray::{ArrayViewMut1, ArrayViewMut2, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

pub mod filter;
pub mod remap;
pub mod resize;

pub use filter::{filter3x3, gaussian_blur, median_blur_3x3, pyr_down, scharr};
pub use remap::{bilinear_sample, remap, warp_perspective, Border};
pub use resize::{resize, resize_into, Interpolation};

/// A value that can be linearly interpolated.
pub trait Texel: Copy + Send + Sync + Add<Output = Self> + Mul<f32, Output = Self> {
    fn zero() -> Self;
}

impl Texel for f32 {
    fn zero() -> Self {
        0.0
    }
}

impl Texel for Vector2<f32> {
    fn zero() -> Self {
        Vector2::zeros()
    }
}

/// Run `op` on every row of `dst`, in parallel for large outputs.
pub(crate) fn for_each_row<T, F>(mut dst: ArrayViewMut2<'_, T>, op: F)
where
    T: Send + Sync,
    F: Fn(usize, ArrayViewMut1<'_, T>) + Sync + Send,
{
    let (h, w) = dst.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        dst.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, data)| op(row, data));
    } else {
        for (row, data) in dst.axis_iter_mut(Axis(0)).enumerate() {
            op(row, data);
        }
    }
}
