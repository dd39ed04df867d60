use nalgebra::Vector2;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::frame::Resolution;
use crate::geometry::Homography;

use super::for_each_row;

/// How samples outside the source image are resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Border {
    /// Out-of-range neighbours take this value.
    Constant(f32),
    /// Out-of-range neighbours take the nearest edge pixel.
    Replicate,
}

impl Default for Border {
    fn default() -> Self {
        Border::Constant(0.0)
    }
}

/// Bilinear sample of `data` at `(x, y)`, where integer coordinates are pixel
/// centres.
pub fn bilinear_sample(data: &ArrayView2<'_, f32>, x: f32, y: f32, border: Border) -> f32 {
    let (h, w) = data.dim();
    if !x.is_finite() || !y.is_finite() {
        return match border {
            Border::Constant(v) => v,
            Border::Replicate => 0.0,
        };
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let pixel = |r: i64, c: i64| -> f32 {
        match border {
            Border::Constant(v) => {
                if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
                    data[[r as usize, c as usize]]
                } else {
                    v
                }
            }
            Border::Replicate => {
                let r = r.clamp(0, h as i64 - 1) as usize;
                let c = c.clamp(0, w as i64 - 1) as usize;
                data[[r, c]]
            }
        }
    };

    let v00 = pixel(y0, x0);
    let v01 = pixel(y0, x0 + 1);
    let v10 = pixel(y0 + 1, x0);
    let v11 = pixel(y0 + 1, x0 + 1);

    let top = v00 + (v01 - v00) * fx;
    let bot = v10 + (v11 - v10) * fx;
    top + (bot - top) * fy
}

/// Resample `src` through an absolute coordinate map: `dst[r, c]` is `src`
/// sampled at `map[r, c]`. The output has the map's shape.
pub fn remap(src: &Array2<f32>, map: ArrayView2<'_, Vector2<f32>>, border: Border) -> Array2<f32> {
    let mut dst = Array2::<f32>::zeros(map.dim());
    remap_into(src.view(), map, dst.view_mut(), border);
    dst
}

pub(crate) fn remap_into(
    src: ArrayView2<'_, f32>,
    map: ArrayView2<'_, Vector2<f32>>,
    dst: ArrayViewMut2<'_, f32>,
    border: Border,
) {
    assert_eq!(map.dim(), dst.dim(), "remap target must match the map shape");
    for_each_row(dst, |row, mut out| {
        for (col, v) in out.iter_mut().enumerate() {
            let p = map[[row, col]];
            *v = bilinear_sample(&src, p.x, p.y, border);
        }
    });
}

/// Inverse-mapped perspective resample: `dst(p) = src(transform(p))`, so
/// `transform` maps destination coordinates back into the source.
pub fn warp_perspective(
    src: &Array2<f32>,
    transform: &Homography,
    size: Resolution,
    border: Border,
) -> Array2<f32> {
    let mut dst = Array2::<f32>::zeros(size.shape());
    let view = src.view();
    for_each_row(dst.view_mut(), |row, mut out| {
        for (col, v) in out.iter_mut().enumerate() {
            let [x, y] = transform.apply_f64(col as f64, row as f64);
            *v = bilinear_sample(&view, x as f32, y as f32, border);
        }
    });
    dst
}
