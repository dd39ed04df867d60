//! Sparse optical flow.
//!
//! The default implementation is the pyramidal Lucas-Kanade tracker described
//! by J.-Y. Bouguet, "Pyramidal Implementation of the Lucas Kanade Feature
//! Tracker". Each point is tracked from the coarsest pyramid level down, the
//! displacement found at one level seeding the next.

use nalgebra::{Matrix2, Point2, Vector2};
use ndarray::Array2;

use crate::consts::{LK_EPSILON, LK_ITERATIONS, LK_MIN_EIGENVALUE, LK_PYRAMID_LEVELS, LK_WINDOW_SIZE};
use crate::imgproc::{self, bilinear_sample, Border};

/// Point correspondence search between two frames.
pub trait OpticalFlow: Send {
    /// Find each of `points` (in `prev`) in `next`. `matched` and `status`
    /// are overwritten with one entry per input point; a `false` status marks
    /// a point that could not be tracked.
    fn track(
        &mut self,
        prev: &Array2<f32>,
        next: &Array2<f32>,
        points: &[Point2<f32>],
        matched: &mut Vec<Point2<f32>>,
        status: &mut Vec<bool>,
    );
}

#[derive(Clone, Debug)]
pub struct PyramidalLk {
    window_size: usize,
    levels: usize,
    iterations: usize,
    epsilon: f32,
}

impl Default for PyramidalLk {
    fn default() -> Self {
        Self::new(LK_WINDOW_SIZE, LK_PYRAMID_LEVELS)
    }
}

struct Level {
    image: Array2<f32>,
    gx: Array2<f32>,
    gy: Array2<f32>,
}

impl PyramidalLk {
    pub fn new(window_size: usize, levels: usize) -> Self {
        assert!(
            window_size >= 3 && window_size % 2 == 1,
            "Lucas-Kanade window size must be odd and at least 3, got {window_size}"
        );
        Self {
            window_size,
            levels,
            iterations: LK_ITERATIONS,
            epsilon: LK_EPSILON,
        }
    }

    pub fn with_iterations(mut self, iterations: usize, epsilon: f32) -> Self {
        assert!(iterations > 0, "Lucas-Kanade needs at least one iteration");
        self.iterations = iterations;
        self.epsilon = epsilon;
        self
    }

    /// Pyramid of `image`, finest level first. Levels stop before the image
    /// becomes smaller than a couple of windows.
    fn pyramid(&self, image: &Array2<f32>, with_gradients: bool) -> Vec<Level> {
        let mut levels = Vec::with_capacity(self.levels + 1);
        let mut current = image.clone();
        for level in 0..=self.levels {
            if level > 0 {
                let (h, w) = current.dim();
                if h.min(w) / 2 < 2 * self.window_size {
                    break;
                }
                current = imgproc::pyr_down(&current);
            }

            let (gx, gy) = if with_gradients {
                let (gx, gy) = imgproc::scharr(&current);
                // Normalize Scharr's 32x weighting to intensity per pixel.
                (gx / 32.0, gy / 32.0)
            } else {
                (Array2::zeros((0, 0)), Array2::zeros((0, 0)))
            };
            levels.push(Level {
                image: current.clone(),
                gx,
                gy,
            });
        }
        levels
    }

    fn track_point(&self, prev: &[Level], next: &[Level], point: Point2<f32>) -> Option<Point2<f32>> {
        let radius = (self.window_size / 2) as isize;
        let area = (self.window_size * self.window_size) as f32;
        let mut guess = Vector2::<f32>::zeros();

        for (level, (p, n)) in prev.iter().zip(next).enumerate().rev() {
            let scale = (1u32 << level) as f32;
            let u = point.coords / scale;

            let (h, w) = p.image.dim();
            if u.x < 0.0 || u.y < 0.0 || u.x > (w - 1) as f32 || u.y > (h - 1) as f32 {
                return None;
            }

            // Window samples of the previous level are fixed for all iterations.
            let mut template = Vec::with_capacity(self.window_size * self.window_size);
            let mut g = Matrix2::<f32>::zeros();
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let x = u.x + dx as f32;
                    let y = u.y + dy as f32;
                    let i0 = bilinear_sample(&p.image.view(), x, y, Border::Replicate);
                    let ix = bilinear_sample(&p.gx.view(), x, y, Border::Replicate);
                    let iy = bilinear_sample(&p.gy.view(), x, y, Border::Replicate);
                    g += Matrix2::new(ix * ix, ix * iy, ix * iy, iy * iy);
                    template.push((dx as f32, dy as f32, i0, ix, iy));
                }
            }

            let half_trace = (g[(0, 0)] + g[(1, 1)]) * 0.5;
            let disc = (((g[(0, 0)] - g[(1, 1)]) * 0.5).powi(2) + g[(0, 1)].powi(2)).sqrt();
            if (half_trace - disc) / area < LK_MIN_EIGENVALUE {
                return None;
            }
            let g_inv = g.try_inverse()?;

            let mut nu = Vector2::<f32>::zeros();
            for _ in 0..self.iterations {
                let centre = u + guess + nu;
                let mut b = Vector2::<f32>::zeros();
                for &(dx, dy, i0, ix, iy) in &template {
                    let j = bilinear_sample(&n.image.view(), centre.x + dx, centre.y + dy, Border::Replicate);
                    let it = i0 - j;
                    b += Vector2::new(it * ix, it * iy);
                }

                let eta = g_inv * b;
                nu += eta;
                if !nu.x.is_finite() || !nu.y.is_finite() {
                    return None;
                }
                if eta.norm() < self.epsilon {
                    break;
                }
            }

            guess = if level > 0 { (guess + nu) * 2.0 } else { guess + nu };
        }

        let found = point + guess;
        let (h, w) = prev[0].image.dim();
        let inside = found.x >= 0.0 && found.y >= 0.0 && found.x <= (w - 1) as f32 && found.y <= (h - 1) as f32;
        inside.then_some(found)
    }
}

impl OpticalFlow for PyramidalLk {
    fn track(
        &mut self,
        prev: &Array2<f32>,
        next: &Array2<f32>,
        points: &[Point2<f32>],
        matched: &mut Vec<Point2<f32>>,
        status: &mut Vec<bool>,
    ) {
        assert_eq!(prev.dim(), next.dim(), "optical flow frames must have the same size");
        matched.clear();
        status.clear();

        let prev_levels = self.pyramid(prev, true);
        let next_levels = self.pyramid(next, false);

        for &p in points {
            match self.track_point(&prev_levels, &next_levels, p) {
                Some(q) => {
                    matched.push(q);
                    status.push(true);
                }
                None => {
                    matched.push(p);
                    status.push(false);
                }
            }
        }
    }
}
