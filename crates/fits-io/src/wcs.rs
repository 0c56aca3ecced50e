//! TAN world-coordinate keywords.
//!
//! `TanWcs` stores a 0-based reference pixel in the parent (tract) frame.
//! FITS stores a 1-based `CRPIX` relative to the first pixel of the array, so
//! `CRPIX = crpix - xy0 + 1`.

use projection::TanWcs;
use sky_common::{Point2D, SkyCoord};

use crate::header::{Header, KeyKind};
use crate::{FitsError, FitsResult};

const CTYPE1: &str = "RA---TAN";
const CTYPE2: &str = "DEC--TAN";

/// Keywords [`read_tan_wcs`] looks at, with the type each is read as.
pub const WCS_KEYS: &[(&str, KeyKind)] = &[
    ("CTYPE1", KeyKind::String),
    ("CTYPE2", KeyKind::String),
    ("LTV1", KeyKind::Float),
    ("LTV2", KeyKind::Float),
    ("CRVAL1", KeyKind::Float),
    ("CRVAL2", KeyKind::Float),
    ("CRPIX1", KeyKind::Float),
    ("CRPIX2", KeyKind::Float),
    ("CD1_1", KeyKind::Float),
    ("CD1_2", KeyKind::Float),
    ("CD2_1", KeyKind::Float),
    ("CD2_2", KeyKind::Float),
];

/// Add TAN WCS cards for an array whose first pixel is at `xy0`.
pub fn write_tan_wcs(header: &mut Header, wcs: &TanWcs, xy0: (i64, i64)) {
    let crpix = wcs.crpix();
    let cd = wcs.cd();

    header.set_string("CTYPE1", CTYPE1);
    header.set_string("CTYPE2", CTYPE2);
    header.set_string("CUNIT1", "deg");
    header.set_string("CUNIT2", "deg");
    header.set_string("RADESYS", "ICRS");
    header.set_float("EQUINOX", 2000.0);
    header.set_float("CRVAL1", wcs.crval().ra());
    header.set_float("CRVAL2", wcs.crval().dec());
    header.set_float("CRPIX1", crpix.x - xy0.0 as f64 + 1.0);
    header.set_float("CRPIX2", crpix.y - xy0.1 as f64 + 1.0);
    header.set_float("CD1_1", cd[0][0]);
    header.set_float("CD1_2", cd[0][1]);
    header.set_float("CD2_1", cd[1][0]);
    header.set_float("CD2_2", cd[1][1]);
}

/// Read TAN WCS cards back into the parent frame given by `LTV1`/`LTV2`.
pub fn read_tan_wcs(header: &Header) -> FitsResult<TanWcs> {
    for (key, expected) in [("CTYPE1", CTYPE1), ("CTYPE2", CTYPE2)] {
        match header.get_string(key) {
            Some(value) if value == expected => {}
            Some(value) => {
                return Err(FitsError::invalid(key, format!("unsupported projection {}", value)))
            }
            None => return Err(FitsError::MissingKeyword(key.to_string())),
        }
    }

    let x0 = -header.get_float("LTV1").unwrap_or(0.0);
    let y0 = -header.get_float("LTV2").unwrap_or(0.0);

    let crval = SkyCoord::new(header.require_float("CRVAL1")?, header.require_float("CRVAL2")?)
        .map_err(|e| FitsError::invalid("CRVAL1", e.to_string()))?;
    let crpix = Point2D::new(
        header.require_float("CRPIX1")? - 1.0 + x0,
        header.require_float("CRPIX2")? - 1.0 + y0,
    );
    let cd = [
        [header.require_float("CD1_1")?, header.get_float("CD1_2").unwrap_or(0.0)],
        [header.get_float("CD2_1").unwrap_or(0.0), header.require_float("CD2_2")?],
    ];

    TanWcs::new(crval, crpix, cd).map_err(|e| FitsError::invalid("CD1_1", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wcs() -> TanWcs {
        TanWcs::north_up(SkyCoord::new(61.0, -35.5).unwrap(), Point2D::new(17999.5, 17999.5), 0.2).unwrap()
    }

    #[test]
    fn test_crpix_is_one_based_local() {
        let mut header = Header::new();
        write_tan_wcs(&mut header, &wcs(), (12000, 15000));
        assert_eq!(header.get_float("CRPIX1"), Some(6000.5));
        assert_eq!(header.get_float("CRPIX2"), Some(3000.5));
        assert_eq!(header.get_string("CTYPE2"), Some("DEC--TAN"));
    }

    #[test]
    fn test_roundtrip_into_parent_frame() {
        let mut header = Header::new();
        header.set_int("LTV1", -12000);
        header.set_int("LTV2", -15000);
        write_tan_wcs(&mut header, &wcs(), (12000, 15000));
        assert_eq!(read_tan_wcs(&header).unwrap(), wcs());
    }

    #[test]
    fn test_other_projection_rejected() {
        let mut header = Header::new();
        write_tan_wcs(&mut header, &wcs(), (0, 0));
        header.set_string("CTYPE1", "RA---SIN");
        assert!(read_tan_wcs(&header).is_err());
        assert!(matches!(read_tan_wcs(&Header::new()), Err(FitsError::MissingKeyword(_))));
    }
}
