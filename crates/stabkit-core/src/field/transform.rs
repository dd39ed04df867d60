use nalgebra::{Point2, Rotation2, Vector2};

use crate::geometry::Rect;

use super::{Traversal, WarpField};

impl WarpField {
    /// Pull the field towards the closest per-row and per-column linear fits.
    ///
    /// Each row's y-offsets are regressed against the column index and each
    /// column's x-offsets against the row index. Offsets are then blended
    /// towards the fitted lines, keeping `tolerance` of the original value:
    /// `1.0` leaves the field untouched, `0.0` replaces it with the fits.
    pub fn undistort(&mut self, tolerance: f32) {
        assert!(
            (0.0..=1.0).contains(&tolerance),
            "undistort tolerance must be in [0, 1], got {tolerance}"
        );

        let (rows, cols) = self.offsets.dim();
        let row_lines: Vec<(f32, f32)> = (0..rows)
            .map(|r| fit_line(self.offsets.row(r).iter().map(|v| v.y)))
            .collect();
        let col_lines: Vec<(f32, f32)> = (0..cols)
            .map(|c| fit_line(self.offsets.column(c).iter().map(|v| v.x)))
            .collect();

        self.write(
            |offset, coord| {
                let (row_slope, row_intercept) = row_lines[coord.y];
                let (col_slope, col_intercept) = col_lines[coord.x];
                let rigid_x = coord.y as f32 * col_slope + col_intercept;
                let rigid_y = coord.x as f32 * row_slope + row_intercept;

                offset.x = tolerance * offset.x + (1.0 - tolerance) * rigid_x;
                offset.y = tolerance * offset.y + (1.0 - tolerance) * rigid_y;
            },
            Traversal::Parallel,
        );
    }

    /// Clamp every offset component to `[-magnitude, magnitude]`.
    pub fn clamp(&mut self, magnitude: Vector2<f32>) {
        self.clamp_range(-magnitude, magnitude);
    }

    /// Clamp every offset component to `[min, max]`.
    pub fn clamp_range(&mut self, min: Vector2<f32>, max: Vector2<f32>) {
        assert!(
            min.x <= max.x && min.y <= max.y,
            "invalid clamp range {min:?}..{max:?}"
        );
        self.offsets.mapv_inplace(|v| {
            Vector2::new(v.x.clamp(min.x, max.x), v.y.clamp(min.y, max.y))
        });
    }

    /// `self = (1 - field_weight) * self + field_weight * field`.
    pub fn blend(&mut self, field_weight: f32, field: &WarpField) {
        self.blend_weighted(1.0 - field_weight, field_weight, field);
    }

    /// `self = self_weight * self + field_weight * field`.
    pub fn blend_weighted(&mut self, self_weight: f32, field_weight: f32, field: &WarpField) {
        assert_eq!(self.size(), field.size(), "warp fields must have the same size");
        self.offsets
            .zip_mut_with(&field.offsets, |a, b| *a = *a * self_weight + *b * field_weight);
    }

    /// `self += scaling * field`.
    pub fn combine(&mut self, field: &WarpField, scaling: f32) {
        self.blend_weighted(1.0, scaling, field);
    }

    /// Compose a scaling about the image centre onto the field. Factors above
    /// one zoom in.
    pub fn scale(&mut self, factor: Vector2<f32>, field_scale: Vector2<f32>) {
        assert!(
            factor.x > 0.0 && factor.y > 0.0,
            "scale factor must be positive, got {factor:?}"
        );
        let centre = Point2::from(field_scale / 2.0);
        self.add_displacement(field_scale, |p| {
            centre + (p - centre).component_div(&factor)
        });
    }

    /// Compose a crop onto the field so that the full image extent samples
    /// from `region` instead.
    pub fn crop_in(&mut self, region: Rect, field_scale: Vector2<f32>) {
        assert!(
            region.width > 0.0 && region.height > 0.0,
            "crop region must have a positive area"
        );
        let ratio = region.size().component_div(&field_scale);
        self.add_displacement(field_scale, |p| {
            region.top_left() + p.coords.component_mul(&ratio)
        });
    }

    /// Compose a rotation about the image centre onto the field.
    pub fn rotate(&mut self, degrees: f32, field_scale: Vector2<f32>) {
        let rotation = Rotation2::new(degrees.to_radians());
        let centre = Point2::from(field_scale / 2.0);
        self.add_displacement(field_scale, |p| centre + rotation * (p - centre));
    }

    /// Add `source(p) - p` to every node, where `p` is the node's position
    /// over an image of extent `field_scale`.
    fn add_displacement<F>(&mut self, field_scale: Vector2<f32>, source: F)
    where
        F: Fn(Point2<f32>) -> Point2<f32> + Sync + Send,
    {
        let step = self.node_spacing(field_scale);
        self.write(
            |offset, coord| {
                let p = Point2::new(coord.x as f32 * step.x, coord.y as f32 * step.y);
                *offset += source(p) - p;
            },
            Traversal::Parallel,
        );
    }
}

/// Least-squares line through `(i, values[i])`, as `(slope, intercept)`.
fn fit_line(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let mut n = 0.0f32;
    let mut sum_y = 0.0f32;
    let mut sum_xy = 0.0f32;
    for (i, y) in values.enumerate() {
        sum_y += y;
        sum_xy += i as f32 * y;
        n += 1.0;
    }

    let sum_x = n * (n - 1.0) / 2.0;
    let sum_x2 = (n - 1.0) * n * (2.0 * n - 1.0) / 6.0;
    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < f32::EPSILON {
        return (0.0, sum_y / n.max(1.0));
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}
