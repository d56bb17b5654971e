//! Drawing Primitive Tests
//!
//! Closed-form arc and rectangle helpers.

use pmsm_geometry::primitives::{
    arc_depth_from_points, arc_included_angle, arc_sagitta, chord_from_included_angle,
    magnet_width_for_depth, rectangle_corners, Bounds,
};
use pmsm_geometry::{GeometryError, Point};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

#[test]
fn rectangle_corners_follow_fixed_winding() {
    let corners = rectangle_corners(Point::ORIGIN, 2.0, 4.0, 0.0);
    let expected = [
        Point::new(1.0, 2.0),
        Point::new(-1.0, 2.0),
        Point::new(-1.0, -2.0),
        Point::new(1.0, -2.0),
    ];
    for (got, want) in corners.iter().zip(expected) {
        assert!(got.approx_eq(want, EPS), "got {:?}, want {:?}", got, want);
    }
}

#[test]
fn rectangle_corners_rotate_about_center() {
    let center = Point::new(3.0, -1.0);
    let corners = rectangle_corners(center, 2.0, 4.0, 90.0);
    let expected = [
        Point::new(-2.0, 1.0),
        Point::new(-2.0, -1.0),
        Point::new(2.0, -1.0),
        Point::new(2.0, 1.0),
    ];
    for (got, want) in corners.iter().zip(expected) {
        assert!(got.approx_eq(want + center, EPS), "got {:?}, want {:?}", got, want + center);
    }
}

#[test]
fn quarter_arc_midpoint_lies_on_circle() {
    let (depth, mid) = arc_depth_from_points(Point::new(1.0, 0.0), Point::new(0.0, 1.0), 90.0);
    let expected = 1.0 - 45.0_f64.to_radians().cos();
    assert!((depth - expected).abs() < EPS);
    assert!((mid.norm() - 1.0).abs() < EPS, "midpoint {:?} off the unit circle", mid);
    assert!((mid.x - mid.y).abs() < EPS);
}

#[test]
fn zero_length_chord_has_no_depth() {
    let p = Point::new(2.0, 2.0);
    let (depth, mid) = arc_depth_from_points(p, p, 30.0);
    assert_eq!(depth, 0.0);
    assert_eq!(mid, p);
}

#[test]
fn sagitta_rejects_chord_longer_than_diameter() {
    let err = arc_sagitta(1.0, 2.5).unwrap_err();
    assert_eq!(
        err,
        GeometryError::ChordExceedsDiameter {
            radius: 1.0,
            chord: 2.5
        }
    );
}

#[test]
fn surface_width_shrinks_with_depth() {
    let shallow = magnet_width_for_depth(16.1, 1.0, 39.0);
    let deep = magnet_width_for_depth(16.1, 4.0, 39.0);
    assert!(shallow > deep);
    let full = magnet_width_for_depth(16.1, 0.0, 39.0);
    assert!((full - 2.0 * 16.1 * 19.5_f64.to_radians().tan()).abs() < 1e-9);
}

proptest! {
    #[test]
    fn included_angle_round_trips_to_chord(radius in 1.0f64..50.0, share in 0.01f64..0.95) {
        let chord = 2.0 * radius * share;
        let angle = arc_included_angle(radius, chord).unwrap();
        let back = chord_from_included_angle(radius, angle);
        prop_assert!((back - chord).abs() < 1e-9 * radius.max(1.0));
    }

    #[test]
    fn clamp_is_idempotent_and_contained(min in -100.0f64..100.0, width in 0.0f64..50.0, value in -1e6f64..1e6) {
        let bounds = Bounds::new(min, min + width);
        let once = bounds.clamp(value);
        prop_assert!(bounds.contains(once));
        prop_assert_eq!(bounds.clamp(once), once);
    }
}
