pub mod grid;
pub mod homography;
pub mod rect;

pub use grid::VirtualGrid;
pub use homography::Homography;
pub use rect::Rect;
