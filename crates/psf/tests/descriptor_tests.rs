//! Tests for the analytic PSF models.

use psf::{PsfDescriptor, PsfModel, DEFAULT_PSF_SIZE};
use sky_common::Point2D;

fn centroid(model: &PsfDescriptor, at: Point2D) -> (f64, f64) {
    let img = model.compute_image(at).unwrap();
    let (x0, y0) = img.xy0();
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut total = 0.0;
    for row in 0..img.height() {
        for col in 0..img.width() {
            let v = img.get(col, row).unwrap() as f64;
            sx += v * (x0 + col as i64) as f64;
            sy += v * (y0 + row as i64) as f64;
            total += v;
        }
    }
    (sx / total, sy / total)
}

// ============================================================================
// Normalization and shape
// ============================================================================

#[test]
fn test_default_size_and_unit_sum() {
    let model = PsfDescriptor::gaussian(2.0);
    let img = model.compute_image(Point2D::new(1020.3, 998.7)).unwrap();
    assert_eq!(img.width(), DEFAULT_PSF_SIZE);
    assert_eq!(img.height(), DEFAULT_PSF_SIZE);
    assert!((img.sum() - 1.0).abs() < 1e-6, "sum = {}", img.sum());
    assert_eq!(model.kernel_dims(), (61, 61));
}

#[test]
fn test_double_gaussian_unit_sum() {
    let model = PsfDescriptor::DoubleGaussian {
        sigma1: 1.5,
        sigma2: 4.0,
        ratio: 0.1,
        size: 41,
    };
    let img = model.compute_image(Point2D::new(10.0, 10.0)).unwrap();
    assert_eq!(img.width(), 41);
    assert!((img.sum() - 1.0).abs() < 1e-6);
}

#[test]
fn test_peak_at_center_pixel() {
    let model = PsfDescriptor::gaussian(1.8).with_size(21);
    let img = model.compute_image(Point2D::new(300.0, 200.0)).unwrap();
    assert_eq!(img.xy0(), (290, 190));
    let center = img.get(10, 10).unwrap();
    assert!(img.data().iter().all(|&v| v <= center));
}

// ============================================================================
// Sub-pixel placement
// ============================================================================

#[test]
fn test_centroid_follows_subpixel_position() {
    let model = PsfDescriptor::gaussian(2.0).with_size(31);
    let at = Point2D::new(100.3, 50.8);
    let (cx, cy) = centroid(&model, at);
    assert!((cx - 100.3).abs() < 1e-3, "cx = {}", cx);
    assert!((cy - 50.8).abs() < 1e-3, "cy = {}", cy);
}

#[test]
fn test_varying_gaussian_widens_across_tile() {
    let model = PsfDescriptor::VaryingGaussian {
        sigma0: 1.5,
        gradient_x: 0.001,
        gradient_y: 0.0,
        reference_x: 0.0,
        reference_y: 0.0,
        size: 31,
    };
    let near = model.compute_image(Point2D::new(0.0, 0.0)).unwrap();
    let far = model.compute_image(Point2D::new(2000.0, 0.0)).unwrap();
    // wider profile, lower peak
    assert!(far.get(15, 15).unwrap() < near.get(15, 15).unwrap());
}

// ============================================================================
// Validation and serialization
// ============================================================================

#[test]
fn test_invalid_sigma_rejected() {
    let model = PsfDescriptor::gaussian(0.0);
    let err = model.compute_image(Point2D::new(0.0, 0.0)).unwrap_err();
    assert_eq!(err.kind(), "InvalidParameter");
    assert!(PsfDescriptor::gaussian(f64::NAN).validate().is_err());
}

#[test]
fn test_varying_sigma_going_negative_rejected() {
    let model = PsfDescriptor::VaryingGaussian {
        sigma0: 1.0,
        gradient_x: -0.01,
        gradient_y: 0.0,
        reference_x: 0.0,
        reference_y: 0.0,
        size: 11,
    };
    assert!(model.compute_image(Point2D::new(500.0, 0.0)).is_err());
}

#[test]
fn test_json_defaults_size() {
    let model = PsfDescriptor::from_json(r#"{"type": "gaussian", "sigma": 1.7}"#).unwrap();
    assert_eq!(model, PsfDescriptor::gaussian(1.7));

    let json = model.to_json().unwrap();
    assert!(json.contains("\"type\": \"gaussian\""));
    assert_eq!(PsfDescriptor::from_json(&json).unwrap(), model);
}

#[test]
fn test_json_rejects_invalid_model() {
    assert!(PsfDescriptor::from_json(r#"{"type": "gaussian", "sigma": -1.0}"#).is_err());
    assert!(PsfDescriptor::from_json(r#"{"type": "moffat", "beta": 3.0}"#).is_err());
}
