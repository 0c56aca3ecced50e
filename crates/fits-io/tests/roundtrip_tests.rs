//! File-level tests: multi-extension stamp files written and read back.

use std::fs::OpenOptions;
use std::path::Path;

use fits_io::{write_tan_wcs, FitsError, FitsReader, FitsWriter, Header};
use projection::TanWcs;
use sky_common::{ImageF32, Mask, MaskPlane, PixelBox, Point2D, SkyCoord, StampError};

fn sample_image(bbox: PixelBox) -> ImageF32 {
    let data = (0..bbox.area())
        .map(|i| (i as f32 * 0.37).sin() * 1000.0 + 1e-3)
        .collect();
    ImageF32::new(bbox, data).unwrap()
}

/// Overwrite the first `key` card in the file with an integer value.
fn patch_card(path: &Path, key: &str, value: i64) {
    let mut bytes = std::fs::read(path).unwrap();
    let needle = format!("{:<8}=", key);
    let at = bytes
        .windows(needle.len())
        .position(|w| w == needle.as_bytes())
        .unwrap();
    let card = format!("{:<8}= {:>20}", key, value);
    let card = format!("{:<80}", card);
    bytes[at..at + 80].copy_from_slice(card.as_bytes());
    std::fs::write(path, bytes).unwrap();
}

fn truncate(path: &Path, len: u64) {
    OpenOptions::new().write(true).open(path).unwrap().set_len(len).unwrap();
}

// ============================================================================
// Pixel data
// ============================================================================

#[test]
fn test_exposure_planes_roundtrip_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calexp.fits");

    let bbox = PixelBox::new(4975, 2980, 51, 51);
    let image = sample_image(bbox);
    let variance = ImageF32::filled(bbox, 0.01);
    let mut mask = Mask::clear(bbox);
    mask.set_plane(0, 0, MaskPlane::Sat);
    mask.set_plane(50, 50, MaskPlane::NoData);

    let mut writer = FitsWriter::create(&path).unwrap();
    writer.write_image("IMAGE", &image, &Header::new()).unwrap();
    writer.write_mask("MASK", &mask, &Header::new()).unwrap();
    writer.write_image("VARIANCE", &variance, &Header::new()).unwrap();
    drop(writer);

    let mut reader = FitsReader::open(&path).unwrap();
    let ext = reader.extension("IMAGE").unwrap();
    assert_eq!(ext.bbox(), bbox);
    assert_eq!(reader.read_full_image(&ext).unwrap(), image);

    let ext = reader.extension("MASK").unwrap();
    assert_eq!(reader.read_mask(&ext, &bbox).unwrap(), mask);
    assert_eq!(
        reader.read_string(&ext, &format!("MPNAME{}", MaskPlane::Sat.bit())).as_deref(),
        Some(MaskPlane::Sat.name())
    );

    let ext = reader.extension("VARIANCE").unwrap();
    assert_eq!(reader.read_full_image(&ext).unwrap(), variance);
}

#[test]
fn test_nan_pixels_survive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("padded.fits");

    let mut image = ImageF32::filled(PixelBox::new(-2, -2, 4, 4), 1.0);
    image.set(0, 0, f32::NAN);
    let mut writer = FitsWriter::create(&path).unwrap();
    writer.write_image("IMAGE", &image, &Header::new()).unwrap();
    drop(writer);

    let mut reader = FitsReader::open(&path).unwrap();
    let ext = reader.extension("IMAGE").unwrap();
    let back = reader.read_full_image(&ext).unwrap();
    assert_eq!(back.xy0(), (-2, -2));
    assert!(back.get(0, 0).unwrap().is_nan());
    assert_eq!(back.get(3, 3), Some(1.0));
}

#[test]
fn test_region_read_matches_subimage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tile.fits");

    let image = sample_image(PixelBox::new(1000, 2000, 120, 90));
    let mut writer = FitsWriter::create(&path).unwrap();
    writer.write_image("IMAGE", &image, &Header::new()).unwrap();
    drop(writer);

    let stamp = PixelBox::new(1040, 2030, 25, 17);
    let mut reader = FitsReader::open(&path).unwrap();
    let ext = reader.extension("IMAGE").unwrap();
    let region = reader.read_image(&ext, &stamp).unwrap();
    assert_eq!(region, image.subimage(&stamp).unwrap());
}

// ============================================================================
// Malformed and truncated files
// ============================================================================

#[test]
fn test_huge_declared_axes_fail_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.fits");

    for (naxis1, naxis2) in [(10_000_000_000, 10_000_000_000), (1_000_000_000, 1_000_000_000)] {
        let mut writer = FitsWriter::create(&path).unwrap();
        writer
            .write_image("IMAGE", &ImageF32::filled(PixelBox::new(0, 0, 10, 10), 1.0), &Header::new())
            .unwrap();
        drop(writer);
        // the primary HDU has no axes, so these cards belong to IMAGE
        patch_card(&path, "NAXIS1", naxis1);
        patch_card(&path, "NAXIS2", naxis2);

        let result = FitsReader::open(&path).and_then(|mut reader| {
            let ext = reader.extension("IMAGE")?;
            reader.read_full_image(&ext)
        });
        let err = result.unwrap_err();
        assert_eq!(StampError::from(err).kind(), "IOError");
    }
}

#[test]
fn test_region_read_decodes_only_needed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.fits");

    let bbox = PixelBox::new(0, 0, 1000, 1000);
    let data = (0..bbox.area()).map(|i| i as f32).collect();
    let image = ImageF32::new(bbox, data).unwrap();
    let mut writer = FitsWriter::create(&path).unwrap();
    writer.write_image("IMAGE", &image, &Header::new()).unwrap();
    drop(writer);

    // keep 700 blocks: the header and roughly half the rows
    truncate(&path, 2880 * 700);

    let mut reader = FitsReader::open(&path).unwrap();
    let ext = reader.extension("IMAGE").unwrap();
    assert_eq!(ext.bbox(), bbox);

    let stamp = PixelBox::new(300, 100, 51, 51);
    let region = reader.read_image(&ext, &stamp).unwrap();
    assert_eq!(region.get(0, 0), Some(100_300.0));
    assert_eq!(region.get(50, 50), Some(150_350.0));

    let err = reader.read_full_image(&ext).unwrap_err();
    assert!(matches!(err, FitsError::DataPastEnd { needed: 4_000_000, .. }));
}

// ============================================================================
// World coordinates
// ============================================================================

#[test]
fn test_wcs_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stamp.fits");

    let wcs = TanWcs::new(
        SkyCoord::new(56.123456789, -31.987654321).unwrap(),
        Point2D::new(2099.25, 1987.75),
        [[-5.5e-5, 1.0e-7], [1.2e-7, 5.5e-5]],
    )
    .unwrap();
    let image = sample_image(PixelBox::new(2000, 1900, 51, 51));
    let mut header = Header::new();
    write_tan_wcs(&mut header, &wcs, image.xy0());
    let mut writer = FitsWriter::create(&path).unwrap();
    writer.write_image("IMAGE", &image, &header).unwrap();
    drop(writer);

    let mut reader = FitsReader::open(&path).unwrap();
    let ext = reader.extension("IMAGE").unwrap();
    let back = reader.read_tan_wcs(&ext).unwrap().unwrap();
    assert_eq!(back.crval(), wcs.crval());
    assert_eq!(back.cd(), wcs.cd());
    assert!((back.crpix().x - 2099.25).abs() < 1e-9);
    assert!((back.crpix().y - 1987.75).abs() < 1e-9);

    // the same sky position lands on the same parent pixel
    let sky = wcs.pixel_to_sky(Point2D::new(2025.0, 1925.0)).unwrap();
    let p = back.sky_to_pixel(&sky).unwrap();
    assert!((p.x - 2025.0).abs() < 1e-6);
    assert!((p.y - 1925.0).abs() < 1e-6);
}

#[test]
fn test_extension_without_wcs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.fits");
    let mut writer = FitsWriter::create(&path).unwrap();
    writer
        .write_image("IMAGE", &ImageF32::filled(PixelBox::new(0, 0, 3, 3), 0.0), &Header::new())
        .unwrap();
    drop(writer);

    let mut reader = FitsReader::open(&path).unwrap();
    let ext = reader.extension("IMAGE").unwrap();
    assert!(reader.read_tan_wcs(&ext).unwrap().is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_file_is_io_error() {
    let err = FitsReader::open(Path::new("/nonexistent/stamp.fits")).unwrap_err();
    assert_eq!(StampError::from(err).kind(), "IOError");
}

#[test]
fn test_missing_extension_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.fits");
    let mut writer = FitsWriter::create(&path).unwrap();
    writer
        .write_image("IMAGE", &ImageF32::filled(PixelBox::new(0, 0, 2, 2), 0.0), &Header::new())
        .unwrap();
    drop(writer);

    let mut reader = FitsReader::open(&path).unwrap();
    let err = reader.extension("MASK").unwrap_err();
    assert!(matches!(err, FitsError::HduNotFound { ref name, .. } if name == "MASK"));

    let ext = reader.extension("IMAGE").unwrap();
    assert!(matches!(
        reader.read_mask(&ext, &ext.bbox()),
        Err(FitsError::UnsupportedType { .. })
    ));
}
