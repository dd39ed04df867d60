use nalgebra::{Point2, Vector2};

/// Axis-aligned rectangle in continuous image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn top_left(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    pub fn top_right(&self) -> Point2<f32> {
        Point2::new(self.x + self.width, self.y)
    }

    pub fn bottom_left(&self) -> Point2<f32> {
        Point2::new(self.x, self.y + self.height)
    }

    pub fn bottom_right(&self) -> Point2<f32> {
        Point2::new(self.x + self.width, self.y + self.height)
    }

    pub fn size(&self) -> Vector2<f32> {
        Vector2::new(self.width, self.height)
    }

    /// Half-open containment test: `[x, x + width) × [y, y + height)`.
    pub fn contains(&self, p: Point2<f32>) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }

    /// Rectangle with the same centre and `factor` times the size.
    pub fn scaled_about_centre(&self, factor: f32) -> Rect {
        let w = self.width * factor;
        let h = self.height * factor;
        Rect::new(
            self.x + (self.width - w) / 2.0,
            self.y + (self.height - h) / 2.0,
            w,
            h,
        )
    }
}
