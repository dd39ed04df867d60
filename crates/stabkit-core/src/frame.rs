use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single grayscale video frame.
/// Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Optional per-frame metadata
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array2<f32>) -> Self {
        Self {
            data,
            metadata: FrameMetadata::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameMetadata {
    pub frame_index: usize,
}

/// Width/height pair used for image resolutions and warp field grid sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Shape in ndarray order, `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn from_shape((rows, cols): (usize, usize)) -> Self {
        Self::new(cols, rows)
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Component-wise maximum of two resolutions.
    pub fn max(&self, other: &Resolution) -> Resolution {
        Resolution::new(self.width.max(other.width), self.height.max(other.height))
    }

    /// Width and height as floating point.
    pub fn to_f32(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }
}

impl From<(usize, usize)> for Resolution {
    fn from((width, height): (usize, usize)) -> Self {
        Self::new(width, height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
