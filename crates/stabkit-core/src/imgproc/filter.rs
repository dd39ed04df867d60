use nalgebra::Vector2;
use ndarray::Array2;

use super::for_each_row;

/// Correlate `src` with a 3×3 kernel, replicating edge pixels at the border.
pub fn filter3x3(src: &Array2<f32>, kernel: &[[f32; 3]; 3]) -> Array2<f32> {
    let (h, w) = src.dim();
    let mut dst = Array2::<f32>::zeros((h, w));
    if h == 0 || w == 0 {
        return dst;
    }

    for_each_row(dst.view_mut(), |row, mut out| {
        let rows = [row.saturating_sub(1), row, (row + 1).min(h - 1)];
        for (col, v) in out.iter_mut().enumerate() {
            let cols = [col.saturating_sub(1), col, (col + 1).min(w - 1)];
            let mut sum = 0.0f32;
            for (ky, &r) in rows.iter().enumerate() {
                for (kx, &c) in cols.iter().enumerate() {
                    sum += src[[r, c]] * kernel[ky][kx];
                }
            }
            *v = sum;
        }
    });
    dst
}

/// Separable Gaussian blur with clamped borders.
pub fn gaussian_blur(src: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return src.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve_rows(src, &kernel);
    convolve_cols(&row_pass, &kernel)
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

fn convolve_rows(src: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, w) = src.dim();
    let radius = kernel.len() as isize / 2;
    let mut dst = Array2::<f32>::zeros((h, w));
    for_each_row(dst.view_mut(), |row, mut out| {
        for (col, v) in out.iter_mut().enumerate() {
            *v = kernel
                .iter()
                .enumerate()
                .map(|(k, &kv)| {
                    let c = (col as isize + k as isize - radius).clamp(0, w as isize - 1);
                    src[[row, c as usize]] * kv
                })
                .sum();
        }
    });
    dst
}

fn convolve_cols(src: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, w) = src.dim();
    let radius = kernel.len() as isize / 2;
    let mut dst = Array2::<f32>::zeros((h, w));
    for_each_row(dst.view_mut(), |row, mut out| {
        for (col, v) in out.iter_mut().enumerate() {
            *v = kernel
                .iter()
                .enumerate()
                .map(|(k, &kv)| {
                    let r = (row as isize + k as isize - radius).clamp(0, h as isize - 1);
                    src[[r as usize, col]] * kv
                })
                .sum();
        }
    });
    dst
}

/// 3×3 median filter applied independently to each vector component.
/// Borders are replicated.
pub fn median_blur_3x3(src: &Array2<Vector2<f32>>) -> Array2<Vector2<f32>> {
    let (h, w) = src.dim();
    let mut dst = Array2::from_elem((h, w), Vector2::zeros());
    if h == 0 || w == 0 {
        return dst;
    }

    for_each_row(dst.view_mut(), |row, mut out| {
        let rows = [row.saturating_sub(1), row, (row + 1).min(h - 1)];
        for (col, v) in out.iter_mut().enumerate() {
            let cols = [col.saturating_sub(1), col, (col + 1).min(w - 1)];
            let mut xs = [0.0f32; 9];
            let mut ys = [0.0f32; 9];
            let mut i = 0;
            for &r in &rows {
                for &c in &cols {
                    let s = src[[r, c]];
                    xs[i] = s.x;
                    ys[i] = s.y;
                    i += 1;
                }
            }
            xs.sort_unstable_by(f32::total_cmp);
            ys.sort_unstable_by(f32::total_cmp);
            *v = Vector2::new(xs[4], ys[4]);
        }
    });
    dst
}

/// Scharr image gradients `(d/dx, d/dy)` with replicated borders.
pub fn scharr(src: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    const GX: [[f32; 3]; 3] = [[-3.0, 0.0, 3.0], [-10.0, 0.0, 10.0], [-3.0, 0.0, 3.0]];
    const GY: [[f32; 3]; 3] = [[-3.0, -10.0, -3.0], [0.0, 0.0, 0.0], [3.0, 10.0, 3.0]];
    (filter3x3(src, &GX), filter3x3(src, &GY))
}

/// Blur and halve the resolution (rounding up), for building image pyramids.
pub fn pyr_down(src: &Array2<f32>) -> Array2<f32> {
    let (h, w) = src.dim();
    let blurred = gaussian_blur(src, 1.0);
    let (dh, dw) = (h.div_ceil(2), w.div_ceil(2));
    Array2::from_shape_fn((dh, dw), |(r, c)| {
        let r0 = 2 * r;
        let c0 = 2 * c;
        let r1 = (r0 + 1).min(h - 1);
        let c1 = (c0 + 1).min(w - 1);
        0.25 * (blurred[[r0, c0]] + blurred[[r0, c1]] + blurred[[r1, c0]] + blurred[[r1, c1]])
    })
}
