//! Motion estimation and dense warp fields for video stabilization.
//!
//! - [`track::MotionTracker`] estimates frame-to-frame motion from sparse
//!   feature tracks and a robust global fit.
//! - [`field::WarpField`] represents that motion as a dense, resizable grid of
//!   backward offsets with the algebra needed to combine and apply it.
//! - [`ring_buffer::RingBuffer`] holds a temporal window of fields for
//!   smoothing.

pub mod consts;
pub mod error;
pub mod field;
pub mod frame;
pub mod geometry;
pub mod imgproc;
pub mod io;
pub mod ring_buffer;
pub mod track;

pub use error::{Result, StabError};
pub use field::{Traversal, WarpContext, WarpField};
pub use frame::{Frame, FrameMetadata, Resolution};
pub use geometry::Homography;
pub use ring_buffer::RingBuffer;
pub use track::{LossReason, MotionTracker, TrackOutcome, TrackerConfig};
