mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{max_abs_diff, shifted, textured};
use nalgebra::{Matrix3, Point2, Vector2};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stabkit_core::geometry::{Homography, Rect};
use stabkit_core::{Frame, Resolution, Traversal, WarpContext, WarpField};

fn assert_vec_close(a: Vector2<f32>, b: Vector2<f32>, tol: f32) {
    assert!(
        (a - b).abs().max() < tol,
        "vectors differ: {a:?} vs {b:?} (tol {tol})"
    );
}

/// Field whose offset at `(c, r)` is `(c, r) * scale`.
fn coordinate_field(size: Resolution, scale: f32) -> WarpField {
    let mut field = WarpField::new(size);
    field.write(
        |offset, coord| *offset = Vector2::new(coord.x as f32, coord.y as f32) * scale,
        Traversal::Sequential,
    );
    field
}

fn random_field(size: Resolution, magnitude: f32, seed: u64) -> WarpField {
    let mut rng = StdRng::seed_from_u64(seed);
    let offsets = Array2::from_shape_simple_fn(size.shape(), || {
        Vector2::new(
            rng.gen_range(-magnitude..magnitude),
            rng.gen_range(-magnitude..magnitude),
        )
    });
    WarpField::from_offsets(offsets)
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_new_is_identity() {
    let field = WarpField::new(Resolution::new(5, 3));
    assert_eq!(field.cols(), 5);
    assert_eq!(field.rows(), 3);
    assert_eq!(field.size(), Resolution::new(5, 3));
    assert!(field.iter().all(|(_, v)| v == Vector2::zeros()));
}

#[test]
#[should_panic]
fn test_new_rejects_single_row() {
    let _ = WarpField::new(Resolution::new(4, 1));
}

#[test]
fn test_from_motion_stores_negated_motion() {
    let field = WarpField::from_motion(Resolution::new(3, 3), Vector2::new(2.0, -1.0));
    assert!(field.iter().all(|(_, v)| v == Vector2::new(-2.0, 1.0)));
}

#[test]
fn test_from_homography_uses_inverse_displacement() {
    let zoom = Homography::from_matrix(Matrix3::new(2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0));
    let field = WarpField::from_homography(Resolution::new(3, 3), &zoom, Vector2::new(100.0, 100.0));

    // Node (c, r) sits at (50c, 50r); the inverse halves it.
    assert_vec_close(field.at(0, 0), Vector2::zeros(), 1e-5);
    assert_vec_close(field.at(1, 1), Vector2::new(-25.0, -25.0), 1e-4);
    assert_vec_close(field.at(2, 2), Vector2::new(-50.0, -50.0), 1e-4);
    assert_vec_close(field.at(2, 0), Vector2::new(-50.0, 0.0), 1e-4);
}

#[test]
fn test_resize_same_size_is_bitwise_noop() {
    let mut field = random_field(Resolution::new(6, 4), 3.0, 11);
    let before = field.clone();
    field.resize(Resolution::new(6, 4));
    assert_eq!(field, before);
}

#[test]
fn test_resize_constant_field_stays_constant() {
    let mut field = WarpField::from_motion(Resolution::new(2, 2), Vector2::new(1.5, -0.5));
    field.resize(Resolution::new(7, 5));
    assert_eq!(field.size(), Resolution::new(7, 5));
    for (_, v) in field.iter() {
        assert_vec_close(v, Vector2::new(-1.5, 0.5), 1e-6);
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[test]
fn test_sample_at_cell_centres() {
    let field = coordinate_field(Resolution::new(4, 3), 1.0);
    for (coord, v) in field.iter() {
        let centre = Point2::new(coord.x as f32 + 0.5, coord.y as f32 + 0.5);
        assert_vec_close(field.sample(centre), v, 1e-6);
    }
}

#[test]
fn test_sample_between_centres_is_bilinear() {
    let field = coordinate_field(Resolution::new(4, 3), 1.0);
    // Halfway between centres of cells (1, 0) and (2, 1).
    assert_vec_close(field.sample(Point2::new(2.0, 1.0)), Vector2::new(1.5, 0.5), 1e-6);
    // A quarter of the way from cell (1, 1) towards (2, 1).
    assert_vec_close(field.sample(Point2::new(1.75, 1.5)), Vector2::new(1.25, 1.0), 1e-6);
    // Left of cell (2, 1)'s centre: neighbours are (1, 1) and (2, 1).
    assert_vec_close(field.sample(Point2::new(2.25, 1.5)), Vector2::new(1.75, 1.0), 1e-6);
}

#[test]
fn test_sample_boundary_clamps_to_edge_cells() {
    let field = coordinate_field(Resolution::new(4, 3), 1.0);

    assert_vec_close(field.sample(Point2::new(0.0, 0.0)), field.at(0, 0), 1e-6);
    assert_vec_close(field.sample(Point2::new(4.0, 3.0)), field.at(3, 2), 1e-6);
    assert_vec_close(field.sample(Point2::new(4.0, 0.0)), field.at(3, 0), 1e-6);
    assert_vec_close(field.sample(Point2::new(0.0, 3.0)), field.at(0, 2), 1e-6);
    // Far outside behaves like the nearest edge.
    assert_vec_close(field.sample(Point2::new(-10.0, 1.5)), field.at(0, 1), 1e-6);
    assert_vec_close(field.sample(Point2::new(1.5, 40.0)), field.at(1, 2), 1e-6);
}

#[test]
fn test_trace_adds_offset() {
    let field = WarpField::from_motion(Resolution::new(3, 3), Vector2::new(1.0, 2.0));
    let p = field.trace(Point2::new(1.0, 1.0));
    assert!((p.x - 0.0).abs() < 1e-6 && (p.y + 1.0).abs() < 1e-6, "traced {p:?}");
}

#[test]
#[should_panic]
fn test_at_out_of_range_panics() {
    let field = WarpField::new(Resolution::new(3, 3));
    let _ = field.at(3, 0);
}

// ---------------------------------------------------------------------------
// Bulk access
// ---------------------------------------------------------------------------

#[test]
fn test_read_visits_every_cell_once() {
    let field = coordinate_field(Resolution::new(9, 7), 1.0);
    for traversal in [Traversal::Sequential, Traversal::Parallel] {
        let visits = AtomicUsize::new(0);
        field.read(
            |v, coord| {
                assert_eq!(*v, Vector2::new(coord.x as f32, coord.y as f32));
                visits.fetch_add(1, Ordering::Relaxed);
            },
            traversal,
        );
        assert_eq!(visits.load(Ordering::Relaxed), 63, "{traversal:?}");
    }
}

#[test]
fn test_write_parallel_matches_sequential() {
    let mut a = WarpField::new(Resolution::new(8, 5));
    let mut b = a.clone();
    let op = |v: &mut Vector2<f32>, coord: Point2<usize>| {
        *v = Vector2::new(coord.x as f32 * 0.5, -(coord.y as f32));
    };
    a.write(op, Traversal::Sequential);
    b.write(op, Traversal::Parallel);
    assert_eq!(a, b);
}

#[test]
fn test_iter_is_row_major() {
    let field = WarpField::new(Resolution::new(3, 2));
    let coords: Vec<(usize, usize)> = field.iter().map(|(p, _)| (p.x, p.y)).collect();
    assert_eq!(coords, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[test]
fn test_add_sub_fields() {
    let a = coordinate_field(Resolution::new(4, 4), 1.0);
    let b = WarpField::from_motion(Resolution::new(4, 4), Vector2::new(-1.0, -1.0));

    let sum = &a + &b;
    assert_vec_close(sum.at(2, 3), Vector2::new(3.0, 4.0), 1e-6);

    let back = sum - &b;
    assert_eq!(back, a);
}

#[test]
#[should_panic]
fn test_add_mismatched_sizes_panics() {
    let mut a = WarpField::new(Resolution::new(4, 4));
    a += &WarpField::new(Resolution::new(3, 4));
}

#[test]
fn test_mul_field_samples_other_grid() {
    let ones = WarpField::from_motion(Resolution::new(6, 4), Vector2::new(-1.0, -1.0));
    let factors = WarpField::from_motion(Resolution::new(2, 2), Vector2::new(-2.0, -3.0));
    let product = ones * &factors;
    assert_eq!(product.size(), Resolution::new(6, 4));
    for (_, v) in product.iter() {
        assert_vec_close(v, Vector2::new(2.0, 3.0), 1e-6);
    }
}

#[test]
fn test_scalar_and_vector_ops() {
    let field = WarpField::from_motion(Resolution::new(2, 2), Vector2::new(-2.0, -4.0));

    let doubled = 2.0 * &field;
    assert_vec_close(doubled.at(1, 1), Vector2::new(4.0, 8.0), 1e-6);

    let halved = &field / 2.0;
    assert_vec_close(halved.at(0, 1), Vector2::new(1.0, 2.0), 1e-6);

    let scaled = &field * Vector2::new(0.5, 0.25);
    assert_vec_close(scaled.at(1, 0), Vector2::new(1.0, 1.0), 1e-6);

    let divided = &field / Vector2::new(2.0, 4.0);
    assert_vec_close(divided.at(0, 0), Vector2::new(1.0, 1.0), 1e-6);

    let moved = field + Vector2::new(1.0, -1.0);
    assert_vec_close(moved.at(0, 0), Vector2::new(3.0, 3.0), 1e-6);
}

#[test]
#[should_panic]
fn test_divide_by_zero_component_panics() {
    let field = WarpField::new(Resolution::new(2, 2));
    let _ = field / Vector2::new(1.0, 0.0);
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

#[test]
fn test_clamp_bounds_every_offset() {
    let mut field = random_field(Resolution::new(12, 9), 50.0, 3);
    let limit = Vector2::new(1.5, 0.5);
    field.clamp(limit);
    for (_, v) in field.iter() {
        assert!(v.x.abs() <= limit.x && v.y.abs() <= limit.y, "offset {v:?}");
    }
}

#[test]
fn test_clamp_range_asymmetric() {
    let mut field = coordinate_field(Resolution::new(5, 5), 1.0);
    field.clamp_range(Vector2::new(1.0, 0.0), Vector2::new(2.0, 3.0));
    assert_eq!(field.at(0, 0), Vector2::new(1.0, 0.0));
    assert_eq!(field.at(4, 4), Vector2::new(2.0, 3.0));
}

#[test]
fn test_undistort_keeps_linear_field() {
    let mut field = WarpField::new(Resolution::new(6, 5));
    field.write(
        |v, c| *v = Vector2::new(3.0 * c.y as f32 - 1.0, 2.0 * c.x as f32 + c.y as f32),
        Traversal::Sequential,
    );
    let before = field.clone();
    field.undistort(0.0);
    for ((_, a), (_, b)) in field.iter().zip(before.iter()) {
        assert_vec_close(a, b, 1e-4);
    }
}

#[test]
fn test_undistort_flattens_bump() {
    let mut field = WarpField::new(Resolution::new(5, 5));
    *field.at_mut(2, 2) = Vector2::new(5.0, 5.0);

    let mut kept = field.clone();
    kept.undistort(1.0);
    assert_eq!(kept, field);

    field.undistort(0.0);
    // The bump is spread over its row and column fits.
    assert!(field.at(2, 2).x < 5.0 && field.at(2, 2).y < 5.0);
    assert!(field.at(2, 0).x.abs() > 0.0);
}

#[test]
fn test_blend_and_combine() {
    let mut a = WarpField::from_motion(Resolution::new(2, 2), Vector2::new(-4.0, 0.0));
    let b = WarpField::from_motion(Resolution::new(2, 2), Vector2::new(0.0, -8.0));

    let mut blended = a.clone();
    blended.blend(0.25, &b);
    assert_vec_close(blended.at(0, 0), Vector2::new(3.0, 2.0), 1e-6);

    a.combine(&b, 0.5);
    assert_vec_close(a.at(1, 1), Vector2::new(4.0, 4.0), 1e-6);
}

#[test]
fn test_scale_about_centre() {
    let mut field = WarpField::new(Resolution::new(3, 3));
    field.scale(Vector2::new(2.0, 2.0), Vector2::new(100.0, 100.0));
    assert_vec_close(field.at(0, 0), Vector2::new(25.0, 25.0), 1e-4);
    assert_vec_close(field.at(1, 1), Vector2::zeros(), 1e-4);
    assert_vec_close(field.at(2, 1), Vector2::new(-25.0, 0.0), 1e-4);
}

#[test]
fn test_crop_in_maps_corners_to_region() {
    let mut field = WarpField::new(Resolution::new(3, 3));
    field.crop_in(Rect::new(10.0, 20.0, 50.0, 50.0), Vector2::new(100.0, 100.0));
    assert_vec_close(field.at(0, 0), Vector2::new(10.0, 20.0), 1e-4);
    assert_vec_close(field.at(2, 2), Vector2::new(-40.0, -30.0), 1e-4);
}

#[test]
fn test_rotate_quarter_turn() {
    let mut field = WarpField::new(Resolution::new(3, 3));
    field.rotate(90.0, Vector2::new(100.0, 100.0));
    // Node (100, 50) samples from the centre rotated by a quarter turn.
    assert_vec_close(field.at(2, 1), Vector2::new(-50.0, 50.0), 1e-3);
    assert_vec_close(field.at(1, 1), Vector2::zeros(), 1e-4);
}

// ---------------------------------------------------------------------------
// Warping
// ---------------------------------------------------------------------------

#[test]
fn test_identity_warp_returns_input() {
    let src = textured(48, 40, 1);
    let mut ctx = WarpContext::new();

    let dense = WarpField::new(Resolution::new(8, 8)).warp(&src, &mut ctx);
    assert!(max_abs_diff(&dense, &src) < 1e-6);

    let global = WarpField::new(Resolution::new(2, 2)).warp(&src, &mut ctx);
    assert!(max_abs_diff(&global, &src) < 1e-4);
}

#[test]
fn test_global_translation_warp_matches_shift() {
    let (w, h) = (64, 48);
    let src = textured(w, h, 2);
    let expected = shifted(&src, 3, 2);

    let motion = Homography::from_translation(3.0, 2.0);
    let field = WarpField::from_homography(Resolution::new(2, 2), &motion, Vector2::new(w as f32, h as f32));
    let warped = field.warp(&src, &mut WarpContext::new());

    let interior = |a: &Array2<f32>| a.slice(ndarray::s![2.., 3..]).to_owned();
    let diff = max_abs_diff(&interior(&warped), &interior(&expected));
    assert!(diff < 1e-3, "max diff {diff}");
    // Pixels pulled from outside the image are zero.
    assert_eq!(warped[[0, 0]], 0.0);
}

#[test]
fn test_dense_translation_warp_matches_shift() {
    let src = textured(64, 48, 3);
    let expected = shifted(&src, -2, 1);

    let field = WarpField::from_motion(Resolution::new(16, 16), Vector2::new(-2.0, 1.0));
    let warped = field.warp(&src, &mut WarpContext::new());

    let interior = |a: &Array2<f32>| a.slice(ndarray::s![1.., ..62]).to_owned();
    let diff = max_abs_diff(&interior(&warped), &interior(&expected));
    assert!(diff < 1e-5, "max diff {diff}");
}

#[test]
fn test_warp_frame_keeps_metadata() {
    let mut frame = Frame::new(textured(32, 24, 4));
    frame.metadata.frame_index = 17;
    let out = WarpField::new(Resolution::new(4, 4)).warp_frame(&frame, &mut WarpContext::new());
    assert_eq!(out.metadata.frame_index, 17);
    assert_eq!(out.resolution(), frame.resolution());
}

#[test]
fn test_to_map_adds_identity() {
    let field = WarpField::from_motion(Resolution::new(4, 4), Vector2::new(1.0, 0.0));
    let map = field.to_map(Resolution::new(10, 8), &mut WarpContext::new());
    assert_eq!(map.dim(), (8, 10));
    assert_vec_close(map[[0, 0]], Vector2::new(-1.0, 0.0), 1e-6);
    assert_vec_close(map[[7, 9]], Vector2::new(8.0, 7.0), 1e-6);
}

#[test]
fn test_context_identity_grid_grows() {
    let mut ctx = WarpContext::new();
    assert_eq!(ctx.identity_grid(Resolution::new(4, 3)).dim(), (3, 4));

    let grid = ctx.identity_grid(Resolution::new(2, 5));
    assert_eq!(grid.dim(), (5, 2));
    assert_eq!(grid[[4, 1]], Vector2::new(1.0, 4.0));
}

#[test]
fn test_context_reuse_across_resolutions() {
    let mut ctx = WarpContext::new();
    let field = WarpField::from_motion(Resolution::new(4, 4), Vector2::new(1.0, 0.0));

    let large = textured(64, 48, 5);
    let small = textured(20, 16, 6);
    let _ = field.warp(&large, &mut ctx);
    let a = field.warp(&small, &mut ctx);
    let b = field.warp(&small, &mut WarpContext::new());
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

#[test]
fn test_draw_marks_motion_vectors() {
    let mut frame = Frame::new(Array2::zeros((40, 40)));
    let field = WarpField::from_motion(Resolution::new(3, 3), Vector2::new(5.0, 0.0));
    field.draw(&mut frame, 1.0, 1);

    // Centre node at (20, 20) moved right by five pixels.
    for x in 20..=25 {
        assert_eq!(frame.data[[20, x]], 1.0, "pixel ({x}, 20)");
    }
    assert_eq!(frame.data[[20, 26]], 0.0);
    assert_eq!(frame.data[[21, 22]], 0.0);
    assert_eq!(frame.data[[0, 3]], 1.0);
}
