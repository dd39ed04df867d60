#![allow(dead_code)]

use nalgebra::Point2;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stabkit_core::imgproc::gaussian_blur;

/// Random blocky texture, lightly blurred so that it has strong, trackable
/// corners and smooth gradients.
pub fn textured(width: usize, height: usize, seed: u64) -> Array2<f32> {
    const BLOCK: usize = 8;
    let mut rng = StdRng::seed_from_u64(seed);
    let bw = width.div_ceil(BLOCK);
    let bh = height.div_ceil(BLOCK);
    let blocks: Vec<f32> = (0..bw * bh).map(|_| rng.gen_range(0.1..0.9)).collect();

    let raw = Array2::from_shape_fn((height, width), |(r, c)| blocks[(r / BLOCK) * bw + c / BLOCK]);
    gaussian_blur(&raw, 1.5)
}

/// `dst(x, y) = src(x - dx, y - dy)`, replicating edge pixels.
pub fn shifted(src: &Array2<f32>, dx: isize, dy: isize) -> Array2<f32> {
    let (h, w) = src.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let sr = (r as isize - dy).clamp(0, h as isize - 1) as usize;
        let sc = (c as isize - dx).clamp(0, w as isize - 1) as usize;
        src[[sr, sc]]
    })
}

/// Horizontal ramp with `dst(x, y) = x / width`.
pub fn ramp(width: usize, height: usize) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(_, c)| c as f32 / width as f32)
}

/// Regular grid of points with `step` spacing covering `[start, end)` on both
/// axes.
pub fn point_grid(start: f32, end: f32, step: f32) -> Vec<Point2<f32>> {
    let mut points = Vec::new();
    let mut y = start;
    while y < end {
        let mut x = start;
        while x < end {
            points.push(Point2::new(x, y));
            x += step;
        }
        y += step;
    }
    points
}

/// Largest absolute difference between two equally sized arrays.
pub fn max_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    assert_eq!(a.dim(), b.dim());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}
