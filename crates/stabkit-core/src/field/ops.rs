use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use nalgebra::{Point2, Vector2};

use super::{Traversal, WarpField};

impl AddAssign<&WarpField> for WarpField {
    fn add_assign(&mut self, rhs: &WarpField) {
        assert_same_size(self, rhs);
        self.offsets += &rhs.offsets;
    }
}

impl SubAssign<&WarpField> for WarpField {
    fn sub_assign(&mut self, rhs: &WarpField) {
        assert_same_size(self, rhs);
        self.offsets -= &rhs.offsets;
    }
}

impl MulAssign<&WarpField> for WarpField {
    fn mul_assign(&mut self, rhs: &WarpField) {
        // Map cell centres into the other grid's coordinates.
        let sx = rhs.cols() as f32 / self.cols() as f32;
        let sy = rhs.rows() as f32 / self.rows() as f32;
        self.write(
            |offset, coord| {
                let p = Point2::new((coord.x as f32 + 0.5) * sx, (coord.y as f32 + 0.5) * sy);
                *offset = offset.component_mul(&rhs.sample(p));
            },
            Traversal::Parallel,
        );
    }
}

impl AddAssign<Vector2<f32>> for WarpField {
    fn add_assign(&mut self, rhs: Vector2<f32>) {
        self.offsets.mapv_inplace(|v| v + rhs);
    }
}

impl SubAssign<Vector2<f32>> for WarpField {
    fn sub_assign(&mut self, rhs: Vector2<f32>) {
        self.offsets.mapv_inplace(|v| v - rhs);
    }
}

impl MulAssign<Vector2<f32>> for WarpField {
    fn mul_assign(&mut self, rhs: Vector2<f32>) {
        self.offsets.mapv_inplace(|v| v.component_mul(&rhs));
    }
}

impl DivAssign<Vector2<f32>> for WarpField {
    fn div_assign(&mut self, rhs: Vector2<f32>) {
        assert!(
            rhs.x != 0.0 && rhs.y != 0.0,
            "cannot divide a warp field by {rhs:?}"
        );
        self.offsets.mapv_inplace(|v| v.component_div(&rhs));
    }
}

impl MulAssign<f32> for WarpField {
    fn mul_assign(&mut self, rhs: f32) {
        self.offsets.mapv_inplace(|v| v * rhs);
    }
}

impl DivAssign<f32> for WarpField {
    fn div_assign(&mut self, rhs: f32) {
        assert!(rhs != 0.0, "cannot divide a warp field by zero");
        self.offsets.mapv_inplace(|v| v / rhs);
    }
}

/// Binary operators in terms of their compound-assignment form, for owned and
/// borrowed left-hand sides.
macro_rules! forward_binop {
    ($Op:ident, $op:ident, $Assign:ident, $assign:ident, field) => {
        impl $Op<&WarpField> for WarpField {
            type Output = WarpField;
            fn $op(mut self, rhs: &WarpField) -> WarpField {
                $Assign::$assign(&mut self, rhs);
                self
            }
        }

        impl $Op<WarpField> for WarpField {
            type Output = WarpField;
            fn $op(self, rhs: WarpField) -> WarpField {
                $Op::$op(self, &rhs)
            }
        }

        impl $Op<&WarpField> for &WarpField {
            type Output = WarpField;
            fn $op(self, rhs: &WarpField) -> WarpField {
                $Op::$op(self.clone(), rhs)
            }
        }
    };
    ($Op:ident, $op:ident, $Assign:ident, $assign:ident, $Rhs:ty) => {
        impl $Op<$Rhs> for WarpField {
            type Output = WarpField;
            fn $op(mut self, rhs: $Rhs) -> WarpField {
                $Assign::$assign(&mut self, rhs);
                self
            }
        }

        impl $Op<$Rhs> for &WarpField {
            type Output = WarpField;
            fn $op(self, rhs: $Rhs) -> WarpField {
                $Op::$op(self.clone(), rhs)
            }
        }
    };
}

forward_binop!(Add, add, AddAssign, add_assign, field);
forward_binop!(Sub, sub, SubAssign, sub_assign, field);
forward_binop!(Mul, mul, MulAssign, mul_assign, field);

forward_binop!(Add, add, AddAssign, add_assign, Vector2<f32>);
forward_binop!(Sub, sub, SubAssign, sub_assign, Vector2<f32>);
forward_binop!(Mul, mul, MulAssign, mul_assign, Vector2<f32>);
forward_binop!(Div, div, DivAssign, div_assign, Vector2<f32>);
forward_binop!(Mul, mul, MulAssign, mul_assign, f32);
forward_binop!(Div, div, DivAssign, div_assign, f32);

impl Mul<WarpField> for f32 {
    type Output = WarpField;
    fn mul(self, rhs: WarpField) -> WarpField {
        rhs * self
    }
}

impl Mul<&WarpField> for f32 {
    type Output = WarpField;
    fn mul(self, rhs: &WarpField) -> WarpField {
        rhs * self
    }
}

fn assert_same_size(lhs: &WarpField, rhs: &WarpField) {
    assert_eq!(
        lhs.size(),
        rhs.size(),
        "warp fields must have the same size"
    );
}
