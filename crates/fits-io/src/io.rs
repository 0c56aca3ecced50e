//! Reading and writing stamp files through cfitsio.

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ReadImage};
use fitsio::FitsFile;
use tracing::{debug, instrument};

use projection::TanWcs;
use sky_common::{ImageF32, Mask, MaskPlane, PixelBox};

use crate::hdu::{ImageHdu, PixelType};
use crate::header::{FitsValue, Header, KeyKind};
use crate::wcs::{read_tan_wcs, WCS_KEYS};
use crate::{FitsError, FitsResult};

/// Keywords cfitsio or the writer manage; header cards with these names are
/// not written.
const RESERVED: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "PCOUNT", "GCOUNT", "EXTNAME",
    "LTV1", "LTV2",
];

/// cfitsio keeps shared buffers unless built reentrant; one open file at a
/// time.
static CFITSIO: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    CFITSIO.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open stamp file.
pub struct FitsReader {
    file: FitsFile,
    path: PathBuf,
    len: u64,
    _guard: MutexGuard<'static, ()>,
}

impl std::fmt::Debug for FitsReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitsReader")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl FitsReader {
    #[instrument]
    pub fn open(path: &Path) -> FitsResult<Self> {
        let guard = lock();
        let len = std::fs::metadata(path)?.len();
        let file = FitsFile::open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file in bytes.
    pub fn file_len(&self) -> u64 {
        self.len
    }

    /// Image extension by `EXTNAME`. Reads the header only.
    pub fn extension(&mut self, name: &str) -> FitsResult<ImageHdu> {
        let hdu = self.file.hdu(name).map_err(|source| FitsError::HduNotFound {
            name: name.to_string(),
            source,
        })?;
        let ltv1 = hdu.read_key::<f64>(&mut self.file, "LTV1").unwrap_or(0.0);
        let ltv2 = hdu.read_key::<f64>(&mut self.file, "LTV2").unwrap_or(0.0);
        ImageHdu::new(name, hdu, (ltv1, ltv2))
    }

    /// Collect the listed keywords present on `ext`.
    pub fn read_keys(&mut self, ext: &ImageHdu, keys: &[(&str, KeyKind)]) -> Header {
        let mut header = Header::new();
        for &(key, kind) in keys {
            if let Some(value) = read_key(&ext.hdu, &mut self.file, key, kind) {
                header.set(key, value);
            }
        }
        header
    }

    pub fn read_float(&mut self, ext: &ImageHdu, key: &str) -> Option<f64> {
        ext.hdu.read_key::<f64>(&mut self.file, key).ok()
    }

    pub fn read_string(&mut self, ext: &ImageHdu, key: &str) -> Option<String> {
        read_key(&ext.hdu, &mut self.file, key, KeyKind::String).and_then(|v| v.as_str().map(str::to_string))
    }

    /// The extension's TAN WCS in the parent frame, if it has one.
    pub fn read_tan_wcs(&mut self, ext: &ImageHdu) -> FitsResult<Option<TanWcs>> {
        let header = self.read_keys(ext, WCS_KEYS);
        if header.get("CTYPE1").is_none() {
            return Ok(None);
        }
        read_tan_wcs(&header).map(Some)
    }

    /// Float pixels inside `bbox` (parent frame).
    pub fn read_image(&mut self, ext: &ImageHdu, bbox: &PixelBox) -> FitsResult<ImageF32> {
        ext.expect_type(PixelType::F32)?;
        let pixels: Vec<f32> = self.read_region(ext, bbox)?;
        ImageF32::new(*bbox, pixels).map_err(|e| FitsError::invalid("NAXIS", e.to_string()))
    }

    /// Every pixel of a float extension.
    pub fn read_full_image(&mut self, ext: &ImageHdu) -> FitsResult<ImageF32> {
        self.read_image(ext, &ext.bbox())
    }

    /// Mask planes inside `bbox`. Bit patterns are stored unchanged as
    /// 32-bit integers.
    pub fn read_mask(&mut self, ext: &ImageHdu, bbox: &PixelBox) -> FitsResult<Mask> {
        ext.expect_type(PixelType::I32)?;
        let pixels: Vec<i32> = self.read_region(ext, bbox)?;
        Mask::new(*bbox, pixels.into_iter().map(|v| v as u32).collect())
            .map_err(|e| FitsError::invalid("NAXIS", e.to_string()))
    }

    /// Decode only the rows spanned by `bbox`, then keep its columns.
    fn read_region<T>(&mut self, ext: &ImageHdu, bbox: &PixelBox) -> FitsResult<Vec<T>>
    where
        T: Copy,
        Vec<T>: ReadImage,
    {
        let region = ext.region(bbox)?;
        let needed = ext.bytes_through(&region)?;
        if needed > self.len {
            return Err(FitsError::DataPastEnd {
                name: ext.name().to_string(),
                needed,
                available: self.len,
            });
        }

        let width = ext.bbox().width;
        let rows: Vec<T> = ext.hdu.read_rows(&mut self.file, region.row0, region.height)?;
        if rows.len() != width * region.height {
            return Err(FitsError::invalid(
                "NAXIS1",
                format!("read {} pixels for {} rows of {}", rows.len(), region.height, width),
            ));
        }
        debug!(ext = ext.name(), rows = region.height, row0 = region.row0, "Read FITS rows");

        if region.col0 == 0 && region.width == width {
            return Ok(rows);
        }
        let mut pixels = Vec::with_capacity(region.width * region.height);
        for row in rows.chunks_exact(width) {
            pixels.extend_from_slice(&row[region.col0..region.col0 + region.width]);
        }
        Ok(pixels)
    }
}

fn read_key(hdu: &FitsHdu, file: &mut FitsFile, key: &str, kind: KeyKind) -> Option<FitsValue> {
    match kind {
        KeyKind::String => hdu
            .read_key::<String>(file, key)
            .ok()
            .map(|s| FitsValue::String(s.trim_end().to_string())),
        KeyKind::Integer => hdu.read_key::<i64>(file, key).ok().map(FitsValue::Integer),
        KeyKind::Float => hdu.read_key::<f64>(file, key).ok().map(FitsValue::Float),
    }
}

/// A stamp file being written: an empty primary HDU stamped with `DATE`,
/// then one extension per call.
pub struct FitsWriter {
    file: FitsFile,
    path: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

impl FitsWriter {
    /// Create `path`, replacing an existing file.
    #[instrument]
    pub fn create(path: &Path) -> FitsResult<Self> {
        let guard = lock();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let mut file = FitsFile::create(path).open()?;
        let primary = file.primary_hdu()?;
        primary.write_key(&mut file, "DATE", Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string())?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Float image extension at the image's parent-frame origin.
    pub fn write_image(&mut self, name: &str, image: &ImageF32, header: &Header) -> FitsResult<()> {
        self.write_extension(name, PixelType::F32, image.bbox(), header, |hdu, file| {
            hdu.write_image(file, image.data())
        })
    }

    /// Integer mask extension, naming each plane in an `MPNAMEn` card keyed
    /// by its bit index.
    pub fn write_mask(&mut self, name: &str, mask: &Mask, header: &Header) -> FitsResult<()> {
        let mut header = header.clone();
        for plane in MaskPlane::ALL {
            header.set_string(&format!("MPNAME{}", plane.bit()), plane.name());
        }
        let pixels: Vec<i32> = mask.data().iter().map(|&v| v as i32).collect();
        self.write_extension(name, PixelType::I32, mask.bbox(), &header, |hdu, file| {
            hdu.write_image(file, &pixels)
        })
    }

    fn write_extension<F>(
        &mut self,
        name: &str,
        pixel_type: PixelType,
        bbox: PixelBox,
        header: &Header,
        write_pixels: F,
    ) -> FitsResult<()>
    where
        F: FnOnce(&FitsHdu, &mut FitsFile) -> fitsio::errors::Result<()>,
    {
        let cards: Vec<_> = header
            .cards()
            .iter()
            .filter(|c| !RESERVED.contains(&c.keyword.as_str()))
            .collect();
        for card in &cards {
            card.validate()?;
        }

        let description = ImageDescription {
            data_type: pixel_type.image_type(),
            dimensions: &[bbox.height, bbox.width],
        };
        let hdu = self.file.create_image(name.to_string(), &description)?;
        write_pixels(&hdu, &mut self.file)?;

        hdu.write_key(&mut self.file, "LTV1", -bbox.x0)?;
        hdu.write_key(&mut self.file, "LTV2", -bbox.y0)?;
        for card in cards {
            match &card.value {
                FitsValue::String(s) => hdu.write_key(&mut self.file, &card.keyword, s.as_str())?,
                FitsValue::Integer(i) => hdu.write_key(&mut self.file, &card.keyword, *i)?,
                FitsValue::Float(f) => write_exact_float(&mut self.file, &card.keyword, *f)?,
            }
        }
        debug!(path = %self.path.display(), ext = name, bbox = %bbox, "Wrote FITS extension");
        Ok(())
    }
}

/// Write a float keyword on the current HDU with 17 significant digits, so
/// that reading it back gives the same `f64`.
fn write_exact_float(file: &mut FitsFile, key: &str, value: f64) -> FitsResult<()> {
    let name = CString::new(key).map_err(|_| FitsError::invalid(key, "keyword contains NUL"))?;
    let mut status: c_int = 0;
    // negative decimals select %.17G
    unsafe {
        fitsio::sys::ffpkyd(file.as_raw(), name.as_ptr(), value, -17, ptr::null(), &mut status);
    }
    if status != 0 {
        return Err(FitsError::Status {
            key: key.to_string(),
            status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_cards_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reserved.fits");
        let image = ImageF32::filled(PixelBox::new(10, 20, 3, 2), 1.0);

        let mut header = Header::new();
        header.set_int("NAXIS1", 99);
        header.set_int("LTV1", 5);
        header.set_string("OBJECT", "star");
        let mut writer = FitsWriter::create(&path).unwrap();
        writer.write_image("IMAGE", &image, &header).unwrap();
        drop(writer);

        let mut reader = FitsReader::open(&path).unwrap();
        let ext = reader.extension("IMAGE").unwrap();
        assert_eq!(ext.bbox(), image.bbox());
        assert_eq!(reader.read_string(&ext, "OBJECT").as_deref(), Some("star"));
        assert_eq!(reader.read_full_image(&ext).unwrap(), image);
    }

    #[test]
    fn test_region_outside_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.fits");
        let image = ImageF32::filled(PixelBox::new(0, 0, 4, 4), 2.0);
        let mut writer = FitsWriter::create(&path).unwrap();
        writer.write_image("IMAGE", &image, &Header::new()).unwrap();
        drop(writer);

        let mut reader = FitsReader::open(&path).unwrap();
        let ext = reader.extension("IMAGE").unwrap();
        let err = reader.read_image(&ext, &PixelBox::new(2, 2, 4, 4)).unwrap_err();
        assert!(matches!(err, FitsError::OutsideImage { .. }));
        assert_eq!(sky_common::StampError::from(err).kind(), "OutOfBounds");
    }

    #[test]
    fn test_invalid_card_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.fits");
        let mut header = Header::new();
        header.set_float("PSFSCALE", f64::INFINITY);
        let mut writer = FitsWriter::create(&path).unwrap();
        let image = ImageF32::filled(PixelBox::new(0, 0, 1, 1), 0.0);
        assert!(writer.write_image("IMAGE", &image, &header).is_err());
    }

    #[test]
    fn test_exact_floats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floats.fits");
        let values = [0.1, -5.555555555555556e-5, 56.123456789012345, 1e-300, 123456789.123];
        let mut header = Header::new();
        for (i, v) in values.iter().enumerate() {
            header.set_float(&format!("VAL{}", i), *v);
        }
        let mut writer = FitsWriter::create(&path).unwrap();
        writer
            .write_image("IMAGE", &ImageF32::filled(PixelBox::new(0, 0, 1, 1), 0.0), &header)
            .unwrap();
        drop(writer);

        let mut reader = FitsReader::open(&path).unwrap();
        let ext = reader.extension("IMAGE").unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(reader.read_float(&ext, &format!("VAL{}", i)), Some(*v));
        }
    }
}
