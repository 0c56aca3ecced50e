//! PNG encoding of rendered stamps.
//!
//! Two encodings are produced:
//! - **Indexed (color type 3)** when the canvas holds at most 256 colors,
//!   which is the common case for stamps drawn through a quantized colormap.
//! - **RGBA (color type 6)** otherwise.
//!
//! `encode_auto` picks between them.

use std::collections::HashMap;
use std::io::Write;

use rayon::prelude::*;

use crate::error::{RenderError, RenderResult};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for an indexed PNG.
const MAX_PALETTE_SIZE: usize = 256;

/// Canvas size (64x64) above which palette extraction runs on the rayon pool.
/// A 51-pixel stamp rendered at zoom 2 or more crosses it; unzoomed stamps
/// stay sequential.
const PARALLEL_THRESHOLD: usize = 4096;

type Palette = Vec<(u8, u8, u8, u8)>;

/// Encode RGBA bytes, choosing the indexed form when the colors fit.
pub fn encode_auto(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_dimensions(pixels.len(), 4, width, height)?;
    let num_pixels = pixels.len() / 4;

    let palette = if num_pixels >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette {
        Some((palette, indices)) => encode_indexed(width, height, &palette, &indices),
        None => encode_rgba(pixels, width, height),
    }
}

fn check_dimensions(len: usize, bytes_per_pixel: usize, width: usize, height: usize) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions(format!("{}x{}", width, height)));
    }
    if len != width * height * bytes_per_pixel {
        return Err(RenderError::InvalidDimensions(format!(
            "{} bytes for {}x{} at {} bytes per pixel",
            len, width, height, bytes_per_pixel
        )));
    }
    Ok(())
}

#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[inline(always)]
fn unpack_color(packed: u32) -> (u8, u8, u8, u8) {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

fn extract_palette_sequential(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk[0], chunk[1], chunk[2], chunk[3]);
        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((chunk[0], chunk[1], chunk[2], chunk[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Palette extraction for zoomed stamp canvases.
///
/// Colormapped stamps rarely use more than a few dozen colors, so each chunk
/// collects its own color set, the sets are merged into one palette, and the
/// canvas is then indexed chunk by chunk. Gives up once the merged palette
/// passes 256 entries.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let chunk_size = (pixels.len() / 4 / rayon::current_num_threads()).max(256) * 4;

    let unique_colors: Vec<u32> = pixels
        .par_chunks(chunk_size)
        .flat_map(|chunk| {
            let mut local: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for pixel in chunk.chunks_exact(4) {
                local.insert(pack_color(pixel[0], pixel[1], pixel[2], pixel[3]), ());
                if local.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            local.into_keys().collect::<Vec<_>>()
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in unique_colors {
        if !lookup.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None;
            }
            lookup.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let pixels_per_chunk = chunk_size / 4;
    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(pixels_per_chunk)
        .enumerate()
        .for_each(|(chunk_idx, idx_chunk)| {
            let start = chunk_idx * pixels_per_chunk * 4;
            for (i, idx) in idx_chunk.iter_mut().enumerate() {
                let p = start + i * 4;
                let packed = pack_color(pixels[p], pixels[p + 1], pixels[p + 2], pixels[p + 3]);
                *idx = lookup.get(&packed).copied().unwrap_or(0);
            }
        });

    Some((palette, indices))
}

/// Encode an indexed PNG (color type 3) from a palette and one index per pixel.
pub fn encode_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
) -> RenderResult<Vec<u8>> {
    check_dimensions(indices.len(), 1, width, height)?;
    if palette.is_empty() || palette.len() > MAX_PALETTE_SIZE {
        return Err(RenderError::Encode(format!("palette of {} colors", palette.len())));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    // alpha per palette entry, only when something is not opaque
    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Encode an RGBA PNG (color type 6).
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_dimensions(pixels.len(), 4, width, height)?;

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width * 4, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&(width as u32).to_be_bytes());
    data.extend_from_slice(&(height as u32).to_be_bytes());
    data.push(8); // bit depth
    data.push(color_type);
    data.push(0); // compression
    data.push(0); // filter
    data.push(0); // interlace
    data
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix every scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(bytes: &[u8], row_bytes: usize, height: usize) -> RenderResult<Vec<u8>> {
    let mut raw = Vec::with_capacity(height * (1 + row_bytes));
    for row in bytes.chunks_exact(row_bytes).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_simple() {
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red again
        ];

        let (palette, indices) = extract_palette_sequential(&pixels).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[0], indices[3]);
    }

    #[test]
    fn test_extract_palette_keeps_alpha() {
        let pixels = [
            255, 0, 0, 255, // opaque
            0, 0, 0, 0, // transparent NaN pixel
        ];
        let (palette, _) = extract_palette_sequential(&pixels).unwrap();
        assert!(palette.iter().any(|&(_, _, _, a)| a == 0));
        assert!(palette.iter().any(|&(_, _, _, a)| a == 255));
    }

    #[test]
    fn test_parallel_matches_sequential_mapping() {
        // 128x128 grey ramp with 64 levels
        let mut pixels = Vec::with_capacity(128 * 128 * 4);
        for y in 0..128u32 {
            for x in 0..128u32 {
                let v = (((x + y) / 4) * 4) as u8;
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }

        let (palette, indices) = extract_palette_parallel(&pixels).unwrap();
        assert!(palette.len() <= 64);
        assert_eq!(indices.len(), 128 * 128);
        for (i, &idx) in indices.iter().enumerate() {
            let (r, g, b, a) = palette[idx as usize];
            assert_eq!([r, g, b, a], pixels[i * 4..i * 4 + 4]);
        }
    }

    #[test]
    fn test_too_many_colors_has_no_palette() {
        let mut pixels = Vec::with_capacity(300 * 4);
        for i in 0..300u32 {
            pixels.extend_from_slice(&[(i % 256) as u8, (i / 256) as u8, 7, 255]);
        }
        assert!(extract_palette_sequential(&pixels).is_none());
        let png = encode_auto(&pixels, 300, 1).unwrap();
        // color type byte of IHDR
        assert_eq!(png[25], 6);
    }

    #[test]
    fn test_auto_prefers_indexed() {
        let pixels = [
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 255, 0, 255, //
            255, 0, 0, 255, //
        ];
        let png = encode_auto(&pixels, 2, 2).unwrap();
        assert_eq!(&png[0..8], &SIGNATURE);
        assert_eq!(png[25], 3);
    }

    #[test]
    fn test_chunk_crc_covers_type_and_data() {
        let mut png = Vec::new();
        write_chunk(&mut png, b"IEND", &[]);
        assert_eq!(&png[0..4], &[0, 0, 0, 0]);
        assert_eq!(&png[4..8], b"IEND");
        assert_eq!(&png[8..12], &crc32fast::hash(b"IEND").to_be_bytes());
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        let err = encode_rgba(&[0u8; 12], 2, 2).unwrap_err();
        assert!(matches!(err, RenderError::InvalidDimensions(_)));
        assert!(encode_auto(&[], 0, 0).is_err());
    }
}
