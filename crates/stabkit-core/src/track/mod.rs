//! Frame-to-frame motion tracking.
//!
//! [`MotionTracker`] consumes frames one at a time and, from the second frame
//! onwards, reports the motion between the previous frame and the current one
//! as a [`WarpField`]. Tracking degrades gracefully: whenever the scene cannot
//! be tracked reliably the tracker reports why, resets, and starts over from
//! the next frame.

pub mod config;
pub mod estimator;
pub mod features;
pub mod flow;

use std::fmt;

use nalgebra::{Point2, Vector2};
use ndarray::Array2;
use tracing::{debug, info};

use crate::consts::{GOOD_DISTRIBUTION_QUALITY, SHARPEN_KERNEL};
use crate::field::WarpField;
use crate::frame::{Frame, Resolution};
use crate::geometry::Rect;
use crate::imgproc::{self, Interpolation};

pub use config::{DetectorConfig, TrackerConfig};
pub use estimator::{EstimatorParams, LocalOptimization, Ransac, RobustEstimator, ScoreMethod};
pub use features::{FeatureDetector, GridDetector};
pub use flow::{OpticalFlow, PyramidalLk};

/// Result of tracking one frame.
#[derive(Clone, Debug)]
pub enum TrackOutcome {
    /// Motion from the previous frame to this one, scaled to frame pixels.
    Motion(WarpField),
    /// No motion is available for this frame.
    Lost(LossReason),
}

impl TrackOutcome {
    pub fn motion(self) -> Option<WarpField> {
        match self {
            TrackOutcome::Motion(field) => Some(field),
            TrackOutcome::Lost(_) => None,
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, TrackOutcome::Lost(_))
    }
}

/// Why a frame produced no motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LossReason {
    /// First frame after construction or a reset; there is nothing to compare
    /// against yet.
    FirstFrame,
    /// Too few features were found in the previous frame.
    InsufficientSamples,
    /// Features were too clustered to represent the whole frame.
    PoorUniformity,
    /// Too few features were matched in the current frame.
    InsufficientMatches,
    /// The robust estimator found no transform.
    NoModel,
    /// Too few matches agreed with the estimated transform.
    LowStability,
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LossReason::FirstFrame => "first frame",
            LossReason::InsufficientSamples => "insufficient samples",
            LossReason::PoorUniformity => "poor uniformity",
            LossReason::InsufficientMatches => "insufficient matches",
            LossReason::NoModel => "no model",
            LossReason::LowStability => "low stability",
        };
        f.write_str(text)
    }
}

/// Where the tracker is in its frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    /// Waiting for a first frame.
    Uninitialized,
    /// Holding one frame, waiting for a second.
    Primed,
    /// Last frame produced motion.
    Tracking,
}

pub struct MotionTracker {
    config: TrackerConfig,
    params: EstimatorParams,
    state: TrackerState,

    detector: Box<dyn FeatureDetector>,
    flow: Box<dyn OpticalFlow>,
    estimator: Box<dyn RobustEstimator>,

    prev_frame: Array2<f32>,
    next_frame: Array2<f32>,
    tracked_points: Vec<Point2<f32>>,
    matched_points: Vec<Point2<f32>>,
    match_status: Vec<bool>,
    inlier_status: Vec<bool>,

    uniformity: f32,
    stability: f32,
}

impl MotionTracker {
    /// Tracker using the built-in detector, flow and estimator.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_capabilities(
            config,
            Box::new(GridDetector::default()),
            Box::new(PyramidalLk::default()),
            Box::new(Ransac::new()),
        )
    }

    pub fn with_capabilities(
        config: TrackerConfig,
        detector: Box<dyn FeatureDetector>,
        flow: Box<dyn OpticalFlow>,
        estimator: Box<dyn RobustEstimator>,
    ) -> Self {
        let mut tracker = Self {
            config: TrackerConfig::default(),
            params: EstimatorParams::default(),
            state: TrackerState::Uninitialized,
            detector,
            flow,
            estimator,
            prev_frame: Array2::zeros((0, 0)),
            next_frame: Array2::zeros((0, 0)),
            tracked_points: Vec::new(),
            matched_points: Vec::new(),
            match_status: Vec::new(),
            inlier_status: Vec::new(),
            uniformity: 0.0,
            stability: 0.0,
        };
        tracker.configure(config);
        tracker
    }

    /// Apply new settings and restart tracking.
    ///
    /// # Panics
    /// If `config` fails [`TrackerConfig::validate`].
    pub fn configure(&mut self, config: TrackerConfig) {
        if let Err(e) = config.validate() {
            panic!("{e}");
        }

        self.detector.configure(&config.detector);
        let capacity = self.detector.capacity();
        self.tracked_points.reserve(capacity);
        self.matched_points.reserve(capacity);
        self.match_status.reserve(capacity);
        self.inlier_status.reserve(capacity);

        self.params = if config.is_global() {
            EstimatorParams::global_motion()
        } else {
            EstimatorParams::local_motion()
        };

        info!(
            motion_resolution = %config.motion_resolution,
            detect_resolution = %config.detect_resolution,
            sample_size_threshold = config.sample_size_threshold,
            "Configured motion tracker"
        );
        self.config = config;
        self.restart();
    }

    /// Forget the previous frame; the next call to [`track`](Self::track)
    /// starts a new sequence.
    pub fn restart(&mut self) {
        self.uniformity = 0.0;
        self.stability = 0.0;
        self.state = TrackerState::Uninitialized;
        self.detector.reset();
    }

    /// Track `frame` against the previous frame.
    pub fn track(&mut self, frame: &Frame) -> TrackOutcome {
        assert!(!frame.is_empty(), "cannot track an empty frame");

        self.tracked_points.clear();
        self.matched_points.clear();

        // Downsample to the tracking resolution, sharpening to recover detail
        // lost in scaling.
        std::mem::swap(&mut self.prev_frame, &mut self.next_frame);
        let small = imgproc::resize(&frame.data, self.config.detect_resolution, Interpolation::Area);
        self.next_frame = imgproc::filter3x3(&small, &SHARPEN_KERNEL);

        if self.state == TrackerState::Uninitialized {
            self.state = TrackerState::Primed;
            debug!(frame = frame.metadata.frame_index, "Primed motion tracker");
            return TrackOutcome::Lost(LossReason::FirstFrame);
        }

        // Includes the inliers propagated from the last frame.
        self.detector.detect(&self.prev_frame, &mut self.tracked_points);
        self.uniformity = self.detector.distribution_quality();

        if self.tracked_points.len() < self.config.sample_size_threshold {
            return self.abort(LossReason::InsufficientSamples);
        }
        if self.uniformity < self.config.uniformity_threshold {
            return self.abort(LossReason::PoorUniformity);
        }

        self.flow.track(
            &self.prev_frame,
            &self.next_frame,
            &self.tracked_points,
            &mut self.matched_points,
            &mut self.match_status,
        );
        let tracked = self.tracked_points.len();
        if self.match_status.len() != tracked || self.matched_points.len() != tracked {
            return self.abort(LossReason::InsufficientMatches);
        }
        retain_flagged(&mut self.tracked_points, &mut self.matched_points, &self.match_status);
        if self.matched_points.len() < self.config.sample_size_threshold {
            return self.abort(LossReason::InsufficientMatches);
        }

        // A poorly distributed point set is dominated by whatever it covers,
        // so restrict it to an affine model to avoid perspective distortion.
        let force_affine = self.uniformity < GOOD_DISTRIBUTION_QUALITY;
        let motion = self.estimator.estimate(
            &self.tracked_points,
            &self.matched_points,
            &self.params,
            force_affine,
            &mut self.inlier_status,
        );
        let Some(motion) = motion else {
            return self.abort(LossReason::NoModel);
        };
        if self.inlier_status.len() != self.matched_points.len() {
            return self.abort(LossReason::NoModel);
        }

        retain_flagged(&mut self.tracked_points, &mut self.matched_points, &self.inlier_status);
        self.detector.propagate(&self.matched_points);

        self.stability = self.matched_points.len() as f32 / self.inlier_status.len() as f32;
        if self.stability < self.config.stability_threshold {
            return self.abort(LossReason::LowStability);
        }

        let tracking_size = self.config.detect_resolution;
        let (tw, th) = tracking_size.to_f32();
        let mut field = if self.config.is_global() {
            WarpField::from_homography(self.config.motion_resolution, &motion, Vector2::new(tw, th))
        } else {
            WarpField::from_points(
                self.config.motion_resolution,
                Rect::from_size(tw, th),
                &self.tracked_points,
                &self.matched_points,
                Some(&motion),
            )
        };

        let (fw, fh) = frame.resolution().to_f32();
        field *= Vector2::new(fw / tw, fh / th);

        debug!(
            frame = frame.metadata.frame_index,
            points = self.matched_points.len(),
            uniformity = self.uniformity,
            stability = self.stability,
            affine = force_affine,
            "Tracked frame"
        );
        self.state = TrackerState::Tracking;
        TrackOutcome::Motion(field)
    }

    fn abort(&mut self, reason: LossReason) -> TrackOutcome {
        debug!(
            %reason,
            points = self.tracked_points.len(),
            uniformity = self.uniformity,
            stability = self.stability,
            "Lost track"
        );
        self.restart();
        TrackOutcome::Lost(reason)
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Inlier ratio of the last tracked frame.
    pub fn stability(&self) -> f32 {
        self.stability
    }

    /// Feature distribution quality of the last tracked frame.
    pub fn uniformity(&self) -> f32 {
        self.uniformity
    }

    pub fn motion_resolution(&self) -> Resolution {
        self.config.motion_resolution
    }

    pub fn tracking_resolution(&self) -> Resolution {
        self.config.detect_resolution
    }

    /// Inlier points of the last tracked frame, in tracking coordinates.
    pub fn tracking_points(&self) -> &[Point2<f32>] {
        &self.matched_points
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

/// Keep only the pairs whose flag is set.
fn retain_flagged(a: &mut Vec<Point2<f32>>, b: &mut Vec<Point2<f32>>, flags: &[bool]) {
    debug_assert_eq!(a.len(), flags.len());
    debug_assert_eq!(b.len(), flags.len());

    let mut kept = 0;
    for i in 0..flags.len() {
        if flags[i] {
            a[kept] = a[i];
            b[kept] = b[i];
            kept += 1;
        }
    }
    a.truncate(kept);
    b.truncate(kept);
}
