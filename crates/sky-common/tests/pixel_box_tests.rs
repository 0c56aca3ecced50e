//! Tests for PixelBox construction and geometry.

use sky_common::{PixelBox, Point2D};

// ============================================================================
// Centering convention
// ============================================================================

#[test]
fn test_side_is_exact_for_any_center() {
    for side in [1usize, 2, 3, 50, 51, 64, 101] {
        for &(x, y) in &[(0.0, 0.0), (10.49, 10.51), (-3.5, 7.25), (1234.999, -0.001)] {
            let b = PixelBox::centered(Point2D::new(x, y), side);
            assert_eq!(b.width, side, "side {} at ({}, {})", side, x, y);
            assert_eq!(b.height, side, "side {} at ({}, {})", side, x, y);
        }
    }
}

#[test]
fn test_odd_side_center_pixel_in_middle() {
    let b = PixelBox::centered(Point2D::new(500.2, 300.8), 51);
    assert_eq!(b.x0, 475);
    assert_eq!(b.y0, 276);
    // local index 25 is the target pixel on both axes
    assert_eq!(b.x0 + 25, 500);
    assert_eq!(b.y0 + 25, 301);
}

#[test]
fn test_even_side_center_pixel_is_upper_middle() {
    let b = PixelBox::centered(Point2D::new(500.0, 300.0), 50);
    assert_eq!(b.x0, 475);
    assert_eq!(b.x1(), 525);
    assert_eq!(b.x0 + 25, 500);
}

#[test]
fn test_half_pixel_rounds_up() {
    let b = PixelBox::centered(Point2D::new(10.5, -10.5), 3);
    assert_eq!((b.x0, b.y0), (10, -11));
}

#[test]
fn test_centered_is_deterministic() {
    let p = Point2D::new(4321.123, 8765.987);
    assert_eq!(PixelBox::centered(p, 51), PixelBox::centered(p, 51));
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn test_contains_box() {
    let outer = PixelBox::new(0, 0, 100, 100);
    assert!(outer.contains_box(&PixelBox::new(0, 0, 100, 100)));
    assert!(outer.contains_box(&PixelBox::new(49, 49, 51, 51)));
    assert!(!outer.contains_box(&PixelBox::new(50, 50, 51, 51)));
    assert!(!outer.contains_box(&PixelBox::new(-1, 0, 10, 10)));
}

#[test]
fn test_grow_and_center() {
    let b = PixelBox::new(10, 20, 5, 5).grow(2);
    assert_eq!(b, PixelBox::new(8, 18, 9, 9));
    assert_eq!(b.center(), Point2D::new(12.0, 22.0));
}

#[test]
fn test_display() {
    assert_eq!(PixelBox::new(-2, 3, 4, 5).to_string(), "[-2:2, 3:8]");
}
