/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Smallest grid a warp field may have. A field of exactly this size is a
/// global projective transform.
pub const MIN_FIELD_COLS: usize = 2;
pub const MIN_FIELD_ROWS: usize = 2;

/// Light sharpening kernel applied after downsampling a frame for tracking.
/// Sums to one, so flat regions are unchanged.
pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [
    [0.0, -0.5, 0.0],
    [-0.5, 3.0, -0.5],
    [0.0, -0.5, 0.0],
];

/// Below this feature distribution quality the robust estimator is forced to
/// fit an affine model, so that dominant local motion is not applied globally
/// as perspective.
pub const GOOD_DISTRIBUTION_QUALITY: f32 = 0.6;

/// Minimum allowed sample size threshold (a homography needs four points).
pub const MIN_SAMPLE_SIZE_THRESHOLD: usize = 4;

/// Default motion field resolution (cols, rows).
pub const DEFAULT_MOTION_RESOLUTION: (usize, usize) = (16, 16);

/// Default tracking resolution (width, height).
pub const DEFAULT_DETECT_RESOLUTION: (usize, usize) = (640, 360);

/// Default minimum number of correspondences for a frame to be tracked.
pub const DEFAULT_SAMPLE_SIZE_THRESHOLD: usize = 40;

/// Default minimum feature distribution quality.
pub const DEFAULT_UNIFORMITY_THRESHOLD: f32 = 0.3;

/// Default minimum inlier ratio.
pub const DEFAULT_STABILITY_THRESHOLD: f32 = 0.3;

/// Default detection grid (cols, rows) used to spread features over the frame.
pub const DEFAULT_DETECT_GRID: (usize, usize) = (16, 9);

/// Default number of features kept per detection grid cell.
pub const DEFAULT_FEATURES_PER_CELL: usize = 2;

/// Default corner response threshold, relative to the strongest response.
pub const DEFAULT_CORNER_QUALITY: f32 = 0.02;

/// Default minimum spacing between two features, in tracking pixels.
pub const DEFAULT_MIN_FEATURE_DISTANCE: f32 = 6.0;

/// Lucas-Kanade integration window size (must be odd).
pub const LK_WINDOW_SIZE: usize = 7;

/// Lucas-Kanade pyramid levels above the base level.
pub const LK_PYRAMID_LEVELS: usize = 3;

/// Lucas-Kanade iterations per pyramid level.
pub const LK_ITERATIONS: usize = 10;

/// Lucas-Kanade early termination when the update is smaller than this (px).
pub const LK_EPSILON: f32 = 0.01;

/// Smallest structure tensor eigenvalue accepted by Lucas-Kanade, relative to
/// the window area.
pub const LK_MIN_EIGENVALUE: f32 = 1e-4;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;
