//! Projective transforms between image planes.
//!
//! Provides:
//! - Point mapping, inversion and composition.
//! - Exact four-point transforms (corner to corner).
//! - Direct Linear Transform (DLT) with Hartley normalization from ≥4
//!   correspondences, optionally weighted.
//! - Least-squares affine fits from ≥3 correspondences.

use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};

/// A 3×3 projective transform acting on 2D points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn from_translation(tx: f64, ty: f64) -> Self {
        Self {
            matrix: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Map a point through the transform.
    pub fn apply(&self, point: Point2<f32>) -> Point2<f32> {
        let [x, y] = self.apply_f64(point.x as f64, point.y as f64);
        Point2::new(x as f32, y as f32)
    }

    /// Map a point through the transform in double precision.
    pub fn apply_f64(&self, x: f64, y: f64) -> [f64; 2] {
        let p = self.matrix * Vector3::new(x, y, 1.0);
        if p[2].abs() < 1e-15 {
            return [f64::NAN, f64::NAN];
        }
        [p[0] / p[2], p[1] / p[2]]
    }

    pub fn try_invert(&self) -> Option<Homography> {
        self.matrix.try_inverse().map(Homography::from_matrix)
    }

    /// Inverse transform. The transform must be invertible.
    pub fn invert(&self) -> Homography {
        self.try_invert()
            .unwrap_or_else(|| panic!("homography is singular: {:?}", self.matrix))
    }

    /// Transform that applies `first` and then `self`.
    pub fn compose(&self, first: &Homography) -> Homography {
        Homography::from_matrix(self.matrix * first.matrix)
    }

    /// Whether the transform has no perspective component.
    pub fn is_affine(&self) -> bool {
        self.matrix[(2, 0)].abs() < 1e-12
            && self.matrix[(2, 1)].abs() < 1e-12
            && (self.matrix[(2, 2)] - 1.0).abs() < 1e-12
    }

    /// Euclidean distance between `apply(src)` and `dst`.
    pub fn reprojection_error(&self, src: Point2<f32>, dst: Point2<f32>) -> f64 {
        let p = self.apply_f64(src.x as f64, src.y as f64);
        let dx = p[0] - dst.x as f64;
        let dy = p[1] - dst.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Exact transform mapping each of the four `src` corners onto the
    /// matching `dst` corner. Returns `None` for degenerate configurations.
    pub fn from_point_pairs(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (src[i].x as f64, src[i].y as f64);
            let (u, v) = (dst[i].x as f64, dst[i].y as f64);

            a[(i, 0)] = x;
            a[(i, 1)] = y;
            a[(i, 2)] = 1.0;
            a[(i, 6)] = -x * u;
            a[(i, 7)] = -y * u;
            b[i] = u;

            a[(i + 4, 3)] = x;
            a[(i + 4, 4)] = y;
            a[(i + 4, 5)] = 1.0;
            a[(i + 4, 6)] = -x * v;
            a[(i + 4, 7)] = -y * v;
            b[i + 4] = v;
        }

        let h = a.lu().solve(&b)?;
        Some(Homography::from_matrix(Matrix3::new(
            h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
        )))
    }

    /// Projective fit by normalized DLT. `weights`, when given, scale each
    /// correspondence's contribution.
    pub fn estimate_dlt(
        src: &[Point2<f32>],
        dst: &[Point2<f32>],
        weights: Option<&[f64]>,
    ) -> Option<Homography> {
        let n = src.len();
        if n < 4 || dst.len() != n {
            return None;
        }

        let (t_src, src_n) = normalize_points(src);
        let (t_dst, dst_n) = normalize_points(dst);

        let mut a = DMatrix::zeros(2 * n, 9);
        for i in 0..n {
            let w = weights.map_or(1.0, |w| w[i].max(0.0).sqrt());
            let (sx, sy) = (src_n[i][0], src_n[i][1]);
            let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

            a[(2 * i, 3)] = -sx * w;
            a[(2 * i, 4)] = -sy * w;
            a[(2 * i, 5)] = -w;
            a[(2 * i, 6)] = dy * sx * w;
            a[(2 * i, 7)] = dy * sy * w;
            a[(2 * i, 8)] = dy * w;

            a[(2 * i + 1, 0)] = sx * w;
            a[(2 * i + 1, 1)] = sy * w;
            a[(2 * i + 1, 2)] = w;
            a[(2 * i + 1, 6)] = -dx * sx * w;
            a[(2 * i + 1, 7)] = -dx * sy * w;
            a[(2 * i + 1, 8)] = -dx * w;
        }

        // The solution is the eigenvector of AᵀA with the smallest eigenvalue.
        let ata = a.transpose() * &a;
        let eig = nalgebra::SymmetricEigen::new(ata);
        let min_idx = eig
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|x, y| x.1.abs().total_cmp(&y.1.abs()))
            .map(|(i, _)| i)?;

        let h = eig.eigenvectors.column(min_idx);
        let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

        let h = t_dst.try_inverse()? * h_norm * t_src;
        let scale = h[(2, 2)];
        if scale.abs() < 1e-15 || !h.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Homography::from_matrix(h / scale))
    }

    /// Least-squares affine fit. `weights`, when given, scale each
    /// correspondence's contribution.
    pub fn estimate_affine(
        src: &[Point2<f32>],
        dst: &[Point2<f32>],
        weights: Option<&[f64]>,
    ) -> Option<Homography> {
        let n = src.len();
        if n < 3 || dst.len() != n {
            return None;
        }

        let mut m = Matrix3::<f64>::zeros();
        let mut bx = Vector3::<f64>::zeros();
        let mut by = Vector3::<f64>::zeros();
        for i in 0..n {
            let w = weights.map_or(1.0, |w| w[i].max(0.0));
            let p = Vector3::new(src[i].x as f64, src[i].y as f64, 1.0);
            m += p * p.transpose() * w;
            bx += p * (dst[i].x as f64 * w);
            by += p * (dst[i].y as f64 * w);
        }

        let lu = m.lu();
        let row_x = lu.solve(&bx)?;
        let row_y = lu.solve(&by)?;
        if !row_x.iter().chain(row_y.iter()).all(|v| v.is_finite()) {
            return None;
        }

        Some(Homography::from_matrix(Matrix3::new(
            row_x[0], row_x[1], row_x[2], row_y[0], row_y[1], row_y[2], 0.0, 0.0, 1.0,
        )))
    }
}

/// Normalizing transform: centroid to the origin, mean distance sqrt(2).
fn normalize_points(pts: &[Point2<f32>]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / n;

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p.x as f64 - cx), s * (p.y as f64 - cy)])
        .collect();

    (t, normalized)
}
