use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::geometry::Homography;

/// How a hypothesis is scored against all correspondences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMethod {
    /// Truncated quadratic loss.
    Msac,
    /// Smooth loss that fades out towards the threshold, so the score does not
    /// hinge on a single hard cutoff.
    Magsac,
}

/// Refinement applied to each new best hypothesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalOptimization {
    None,
    /// Least-squares refits on random subsets of the inliers.
    InnerLo,
    /// Iteratively reweighted refits over all correspondences.
    Sigma,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorParams {
    pub score: ScoreMethod,
    pub local_optimization: LocalOptimization,
    pub max_iterations: usize,
    /// Probability that the returned model was drawn from an all-inlier
    /// sample, used to stop early.
    pub confidence: f64,
    pub lo_iterations: usize,
    pub lo_sample_size: usize,
    /// Reprojection error (px) separating inliers from outliers.
    pub threshold: f64,
    pub seed: u64,
}

impl EstimatorParams {
    /// Tight settings for a single accurate global transform.
    pub fn global_motion() -> Self {
        Self {
            score: ScoreMethod::Magsac,
            local_optimization: LocalOptimization::Sigma,
            max_iterations: 100,
            confidence: 0.99,
            lo_iterations: 10,
            lo_sample_size: 20,
            threshold: 4.0,
            seed: 0,
        }
    }

    /// Loose settings that only reject gross outliers, letting local motion
    /// through to the field fit.
    pub fn local_motion() -> Self {
        Self {
            score: ScoreMethod::Msac,
            local_optimization: LocalOptimization::InnerLo,
            threshold: 20.0,
            ..Self::global_motion()
        }
    }
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self::global_motion()
    }
}

/// Fits a transform mapping `origin` onto `warped` while rejecting outliers.
pub trait RobustEstimator: Send {
    /// Returns `None` if no model could be found. On success `inliers` holds
    /// one flag per correspondence. `force_affine` restricts the model to
    /// affine transforms.
    fn estimate(
        &mut self,
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        params: &EstimatorParams,
        force_affine: bool,
        inliers: &mut Vec<bool>,
    ) -> Option<Homography>;
}

/// Uniform minimal sampling with local optimisation of the best hypotheses.
/// The iteration budget adapts to the best inlier ratio seen so far.
#[derive(Clone, Debug, Default)]
pub struct Ransac {
    indices: Vec<usize>,
    subset_origin: Vec<Point2<f32>>,
    subset_warped: Vec<Point2<f32>>,
    weights: Vec<f64>,
}

struct Hypothesis {
    model: Homography,
    cost: f64,
    inliers: usize,
}

impl Ransac {
    pub fn new() -> Self {
        Self::default()
    }

    fn evaluate(
        model: Homography,
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        params: &EstimatorParams,
    ) -> Hypothesis {
        let t2 = params.threshold * params.threshold;
        let mut cost = 0.0;
        let mut inliers = 0;
        for (o, w) in origin.iter().zip(warped) {
            let e = model.reprojection_error(*o, *w);
            let e2 = if e.is_finite() { e * e } else { f64::INFINITY };
            if e2 < t2 {
                inliers += 1;
            }
            cost += match params.score {
                ScoreMethod::Msac => e2.min(t2),
                ScoreMethod::Magsac => {
                    if e2 < t2 {
                        t2 * (1.0 - (1.0 - e2 / t2).powi(3))
                    } else {
                        t2
                    }
                }
            };
        }
        Hypothesis {
            model,
            cost,
            inliers,
        }
    }

    fn refit(
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        weights: Option<&[f64]>,
        affine: bool,
    ) -> Option<Homography> {
        if affine {
            Homography::estimate_affine(origin, warped, weights)
        } else {
            Homography::estimate_dlt(origin, warped, weights)
        }
    }

    /// Copy the correspondences listed in `self.indices` into the subset
    /// buffers.
    fn gather(&mut self, origin: &[Point2<f32>], warped: &[Point2<f32>]) {
        self.subset_origin.clear();
        self.subset_warped.clear();
        for &i in &self.indices {
            self.subset_origin.push(origin[i]);
            self.subset_warped.push(warped[i]);
        }
    }

    fn local_optimize(
        &mut self,
        best: Hypothesis,
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        params: &EstimatorParams,
        affine: bool,
        rng: &mut StdRng,
    ) -> Hypothesis {
        let min_sample = if affine { 3 } else { 4 };
        let t2 = params.threshold * params.threshold;
        let mut best = best;

        match params.local_optimization {
            LocalOptimization::None => {}
            LocalOptimization::InnerLo => {
                for _ in 0..params.lo_iterations {
                    self.indices.clear();
                    self.indices.extend((0..origin.len()).filter(|&i| {
                        best.model.reprojection_error(origin[i], warped[i]).powi(2) < t2
                    }));
                    if self.indices.len() <= min_sample {
                        break;
                    }
                    let k = params.lo_sample_size.clamp(min_sample + 1, self.indices.len());
                    partial_shuffle(&mut self.indices, k, rng);
                    self.indices.truncate(k);
                    self.gather(origin, warped);

                    let refit = Self::refit(&self.subset_origin, &self.subset_warped, None, affine);
                    if let Some(model) = refit {
                        let h = Self::evaluate(model, origin, warped, params);
                        if h.cost < best.cost {
                            best = h;
                        }
                    }
                }
            }
            LocalOptimization::Sigma => {
                for _ in 0..params.lo_iterations {
                    self.weights.clear();
                    self.weights.extend(origin.iter().zip(warped).map(|(o, w)| {
                        let e2 = best.model.reprojection_error(*o, *w).powi(2);
                        if e2 < t2 {
                            (1.0 - e2 / t2).powi(2)
                        } else {
                            0.0
                        }
                    }));
                    let support = self.weights.iter().filter(|&&w| w > 0.0).count();
                    let refit = if support > min_sample {
                        Self::refit(origin, warped, Some(&self.weights), affine)
                    } else {
                        None
                    };

                    match refit.map(|m| Self::evaluate(m, origin, warped, params)) {
                        Some(h) if h.cost < best.cost => best = h,
                        _ => break,
                    }
                }
            }
        }
        best
    }
}

impl RobustEstimator for Ransac {
    fn estimate(
        &mut self,
        origin: &[Point2<f32>],
        warped: &[Point2<f32>],
        params: &EstimatorParams,
        force_affine: bool,
        inliers: &mut Vec<bool>,
    ) -> Option<Homography> {
        assert_eq!(
            origin.len(),
            warped.len(),
            "correspondence sets must have equal length"
        );
        inliers.clear();

        let n = origin.len();
        let min_sample = if force_affine { 3 } else { 4 };
        if n < min_sample {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut best: Option<Hypothesis> = None;
        let mut budget = params.max_iterations;
        let mut iteration = 0;

        while iteration < budget {
            iteration += 1;

            self.indices.clear();
            self.indices.extend(0..n);
            partial_shuffle(&mut self.indices, min_sample, &mut rng);
            self.indices.truncate(min_sample);

            let model = if force_affine {
                let o = [origin[self.indices[0]], origin[self.indices[1]], origin[self.indices[2]]];
                let w = [warped[self.indices[0]], warped[self.indices[1]], warped[self.indices[2]]];
                Homography::estimate_affine(&o, &w, None)
            } else {
                let o = [
                    origin[self.indices[0]],
                    origin[self.indices[1]],
                    origin[self.indices[2]],
                    origin[self.indices[3]],
                ];
                let w = [
                    warped[self.indices[0]],
                    warped[self.indices[1]],
                    warped[self.indices[2]],
                    warped[self.indices[3]],
                ];
                Homography::from_point_pairs(&o, &w)
            };
            let Some(model) = model else {
                continue;
            };

            let hypothesis = Self::evaluate(model, origin, warped, params);
            if best.as_ref().is_some_and(|b| hypothesis.cost >= b.cost) {
                continue;
            }

            let polished = self.local_optimize(hypothesis, origin, warped, params, force_affine, &mut rng);
            budget = budget.min(adaptive_budget(
                polished.inliers as f64 / n as f64,
                min_sample,
                params.confidence,
                params.max_iterations,
            ));
            best = Some(polished);
        }

        let best = best?;
        let t2 = params.threshold * params.threshold;

        // Final least-squares refit over the inliers.
        self.indices.clear();
        self.indices.extend(
            (0..n).filter(|&i| best.model.reprojection_error(origin[i], warped[i]).powi(2) < t2),
        );
        let mut model = best.model;
        if self.indices.len() > min_sample {
            self.gather(origin, warped);
            let refit = Self::refit(&self.subset_origin, &self.subset_warped, None, force_affine);
            if let Some(refined) = refit {
                if Self::evaluate(refined, origin, warped, params).cost <= best.cost {
                    model = refined;
                }
            }
        }

        inliers.extend(
            origin
                .iter()
                .zip(warped)
                .map(|(o, w)| model.reprojection_error(*o, *w).powi(2) < t2),
        );
        if inliers.iter().filter(|&&m| m).count() < min_sample {
            inliers.clear();
            return None;
        }
        Some(model)
    }
}

/// Iterations needed to draw one all-inlier sample with `confidence`, given
/// the inlier ratio.
fn adaptive_budget(inlier_ratio: f64, sample_size: usize, confidence: f64, cap: usize) -> usize {
    let p_good = inlier_ratio.powi(sample_size as i32);
    if p_good <= f64::EPSILON {
        return cap;
    }
    if p_good >= 1.0 - f64::EPSILON {
        return 1;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if k.is_finite() {
        (k.ceil().max(1.0) as usize).min(cap)
    } else {
        cap
    }
}

/// Move `k` uniformly chosen elements to the front of `indices`.
fn partial_shuffle(indices: &mut [usize], k: usize, rng: &mut impl Rng) {
    let n = indices.len();
    debug_assert!(k <= n);
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_budget() {
        assert_eq!(adaptive_budget(1.0, 4, 0.99, 100), 1);
        assert_eq!(adaptive_budget(0.0, 4, 0.99, 100), 100);
        // 50% inliers, 4-point samples: log(0.01) / log(1 - 1/16) ≈ 71.4
        assert_eq!(adaptive_budget(0.5, 4, 0.99, 100), 72);
        assert_eq!(adaptive_budget(0.5, 4, 0.99, 50), 50);
    }
}
