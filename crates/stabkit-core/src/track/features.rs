use nalgebra::Point2;
use ndarray::Array2;

use crate::consts::{EPSILON, LK_WINDOW_SIZE};
use crate::geometry::{Rect, VirtualGrid};
use crate::imgproc;

use super::config::DetectorConfig;

/// Source of trackable points.
pub trait FeatureDetector: Send {
    fn configure(&mut self, config: &DetectorConfig);

    /// Replace `points` with features of `frame`. Points handed to
    /// [`propagate`](Self::propagate) since the last detection are included
    /// first, followed by fresh detections.
    fn detect(&mut self, frame: &Array2<f32>, points: &mut Vec<Point2<f32>>);

    /// Points that tracked successfully and should be reused by the next
    /// detection.
    fn propagate(&mut self, points: &[Point2<f32>]);

    /// Fraction of the frame covered by the last detection, in [0, 1].
    fn distribution_quality(&self) -> f32;

    /// Maximum number of points a detection returns.
    fn capacity(&self) -> usize;

    fn reset(&mut self);
}

/// Shi–Tomasi corner detector that fills a grid of cells, a few corners per
/// cell, so that features cover the whole frame rather than clustering on the
/// most textured object.
#[derive(Clone, Debug)]
pub struct GridDetector {
    config: DetectorConfig,
    propagated: Vec<Point2<f32>>,
    quality: f32,
}

impl GridDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            propagated: Vec::new(),
            quality: 0.0,
        }
    }
}

impl Default for GridDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl FeatureDetector for GridDetector {
    fn configure(&mut self, config: &DetectorConfig) {
        self.config = config.clone();
        self.reset();
    }

    fn detect(&mut self, frame: &Array2<f32>, points: &mut Vec<Point2<f32>>) {
        points.clear();
        self.quality = 0.0;

        let (h, w) = frame.dim();
        let margin = (LK_WINDOW_SIZE / 2 + 1) as f32;
        if w as f32 <= 2.0 * margin || h as f32 <= 2.0 * margin {
            self.propagated.clear();
            return;
        }

        let grid = VirtualGrid::new(self.config.grid, Rect::from_size(w as f32, h as f32));
        let per_cell = self.config.features_per_cell;
        let min_dist_sq = self.config.min_feature_distance.powi(2);
        let mut cell_counts = vec![0usize; grid.cell_count()];

        let usable = Rect::new(margin, margin, w as f32 - 2.0 * margin, h as f32 - 2.0 * margin);
        let mut accept = |p: Point2<f32>, points: &mut Vec<Point2<f32>>| -> bool {
            if !usable.contains(p) {
                return false;
            }
            let Some(key) = grid.try_key_of(p) else {
                return false;
            };
            let cell = grid.index_of(key);
            if cell_counts[cell] >= per_cell {
                return false;
            }
            if points.iter().any(|q| (p - *q).norm_squared() < min_dist_sq) {
                return false;
            }
            cell_counts[cell] += 1;
            points.push(p);
            true
        };

        for p in std::mem::take(&mut self.propagated) {
            accept(p, points);
        }

        for (p, _) in corner_candidates(frame, self.config.corner_quality, margin as usize) {
            if points.len() >= self.capacity() {
                break;
            }
            accept(p, points);
        }

        let occupied = cell_counts.iter().filter(|&&n| n > 0).count();
        self.quality = occupied as f32 / grid.cell_count() as f32;
    }

    fn propagate(&mut self, points: &[Point2<f32>]) {
        self.propagated.clear();
        self.propagated.extend_from_slice(points);
    }

    fn distribution_quality(&self) -> f32 {
        self.quality
    }

    fn capacity(&self) -> usize {
        self.config.capacity()
    }

    fn reset(&mut self) {
        self.propagated.clear();
        self.quality = 0.0;
    }
}

/// Local maxima of the minimum-eigenvalue corner response, strongest first.
fn corner_candidates(frame: &Array2<f32>, quality: f32, margin: usize) -> Vec<(Point2<f32>, f32)> {
    let response = min_eigen_response(frame);
    let peak = response.iter().copied().fold(0.0f32, f32::max);
    if peak <= EPSILON {
        return Vec::new();
    }

    let threshold = (peak * quality).max(EPSILON);
    let (h, w) = response.dim();
    let mut candidates = Vec::new();
    for r in margin..h - margin {
        for c in margin..w - margin {
            let v = response[[r, c]];
            if v < threshold {
                continue;
            }
            let is_peak = (r - 1..=r + 1)
                .all(|rr| (c - 1..=c + 1).all(|cc| response[[rr, cc]] <= v));
            if is_peak {
                candidates.push((Point2::new(c as f32, r as f32), v));
            }
        }
    }

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates
}

/// Smaller eigenvalue of the 3×3 box-summed structure tensor per pixel.
fn min_eigen_response(frame: &Array2<f32>) -> Array2<f32> {
    let (gx, gy) = imgproc::scharr(frame);
    let xx = gx.mapv(|v| v * v);
    let yy = gy.mapv(|v| v * v);
    let xy = &gx * &gy;

    const BOX: [[f32; 3]; 3] = [[1.0; 3]; 3];
    let sxx = imgproc::filter3x3(&xx, &BOX);
    let syy = imgproc::filter3x3(&yy, &BOX);
    let sxy = imgproc::filter3x3(&xy, &BOX);

    let mut response = Array2::<f32>::zeros(frame.dim());
    ndarray::Zip::from(&mut response)
        .and(&sxx)
        .and(&syy)
        .and(&sxy)
        .for_each(|out, &a, &c, &b| {
            let half_trace = (a + c) * 0.5;
            let det_term = ((a - c) * 0.5).powi(2) + b * b;
            *out = (half_trace - det_term.sqrt()).max(0.0);
        });
    response
}

