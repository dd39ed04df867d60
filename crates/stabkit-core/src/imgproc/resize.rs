use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::frame::Resolution;

use super::{for_each_row, Texel};

/// Resampling method for [`resize`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Nearest source sample.
    Nearest,
    /// Bilinear with pixel-centre alignment.
    #[default]
    Linear,
    /// Pixel-area averaging. Preferred for downsampling.
    Area,
}

/// Resize `src` to `size` (width × height).
pub fn resize<T: Texel>(src: &Array2<T>, size: Resolution, method: Interpolation) -> Array2<T> {
    assert!(size.area() > 0, "cannot resize to an empty resolution");
    if src.dim() == size.shape() {
        return src.clone();
    }

    let mut dst = Array2::from_elem(size.shape(), T::zero());
    resize_into(src.view(), dst.view_mut(), method);
    dst
}

/// Resize `src` into the already-allocated `dst`, whose shape sets the
/// target resolution.
pub fn resize_into<T: Texel>(src: ArrayView2<'_, T>, mut dst: ArrayViewMut2<'_, T>, method: Interpolation) {
    let (sh, sw) = src.dim();
    let (dh, dw) = dst.dim();
    assert!(sh > 0 && sw > 0, "cannot resize an empty image");

    if (sh, sw) == (dh, dw) {
        dst.assign(&src);
        return;
    }

    match method {
        Interpolation::Nearest => {
            let xs: Vec<usize> = (0..dw).map(|x| nearest_index(x, sw, dw)).collect();
            let ys: Vec<usize> = (0..dh).map(|y| nearest_index(y, sh, dh)).collect();
            for_each_row(dst, |row, mut out| {
                let sy = ys[row];
                for (col, v) in out.iter_mut().enumerate() {
                    *v = src[[sy, xs[col]]];
                }
            });
        }
        Interpolation::Linear => {
            let xs: Vec<(usize, usize, f32)> = (0..dw).map(|x| linear_taps(x, sw, dw)).collect();
            let ys: Vec<(usize, usize, f32)> = (0..dh).map(|y| linear_taps(y, sh, dh)).collect();
            for_each_row(dst, |row, mut out| {
                let (y0, y1, ty) = ys[row];
                for (col, v) in out.iter_mut().enumerate() {
                    let (x0, x1, tx) = xs[col];
                    let top = src[[y0, x0]] * (1.0 - tx) + src[[y0, x1]] * tx;
                    let bot = src[[y1, x0]] * (1.0 - tx) + src[[y1, x1]] * tx;
                    *v = top * (1.0 - ty) + bot * ty;
                }
            });
        }
        Interpolation::Area => {
            let xs = area_taps(sw, dw);
            let ys = area_taps(sh, dh);
            for_each_row(dst, |row, mut out| {
                for (col, v) in out.iter_mut().enumerate() {
                    let mut acc = T::zero();
                    for &(sy, wy) in &ys[row] {
                        for &(sx, wx) in &xs[col] {
                            acc = acc + src[[sy, sx]] * (wy * wx);
                        }
                    }
                    *v = acc;
                }
            });
        }
    }
}

fn nearest_index(dst: usize, src_len: usize, dst_len: usize) -> usize {
    let scale = src_len as f32 / dst_len as f32;
    ((dst as f32 * scale).floor() as usize).min(src_len - 1)
}

/// Two source taps and the weight of the second, using pixel-centre
/// alignment and clamping at the edges.
fn linear_taps(dst: usize, src_len: usize, dst_len: usize) -> (usize, usize, f32) {
    let scale = src_len as f32 / dst_len as f32;
    let f = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (f.floor() as usize).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    let t = if i1 == i0 { 0.0 } else { f - i0 as f32 };
    (i0, i1, t)
}

/// Source samples covered by each destination sample, with their normalized
/// coverage weights.
fn area_taps(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (start + scale).min(src_len as f64);
            let mut taps = Vec::new();
            let mut s = start.floor() as usize;
            while (s as f64) < end && s < src_len {
                let lo = start.max(s as f64);
                let hi = end.min(s as f64 + 1.0);
                if hi > lo {
                    taps.push((s, ((hi - lo) / (end - start)) as f32));
                }
                s += 1;
            }
            taps
        })
        .collect()
}
