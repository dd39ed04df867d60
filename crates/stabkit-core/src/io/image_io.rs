use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{Result, StabError};
use crate::frame::Frame;

/// File extensions recognised as frames of an image sequence.
const SEQUENCE_EXTENSIONS: [&str; 6] = ["png", "tif", "tiff", "jpg", "jpeg", "bmp"];

/// Load an image file as a grayscale frame with values in [0, 1].
pub fn load_frame(path: &Path) -> Result<Frame> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return Err(StabError::InvalidDimensions {
            width: w as usize,
            height: h as usize,
        });
    }

    let data = Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / 65535.0
    });
    Ok(Frame::new(data))
}

/// Save a frame as 8-bit grayscale PNG.
pub fn save_png(frame: &Frame, path: &Path) -> Result<()> {
    let mut img = GrayImage::new(frame.width() as u32, frame.height() as u32);
    for ((row, col), &v) in frame.data.indexed_iter() {
        let val = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        img.put_pixel(col as u32, row as u32, Luma([val]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a frame as 16-bit grayscale TIFF.
pub fn save_tiff(frame: &Frame, path: &Path) -> Result<()> {
    let pixels: Vec<u16> = frame
        .data
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
        .collect();
    let img = image::ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        pixels,
    )
    .ok_or(StabError::InvalidDimensions {
        width: frame.width(),
        height: frame.height(),
    })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame, choosing the format from the file extension (PNG unless the
/// extension asks for TIFF).
pub fn save_image(frame: &Frame, path: &Path) -> Result<()> {
    match extension_of(path).as_deref() {
        Some("tif" | "tiff") => save_tiff(frame, path),
        _ => save_png(frame, path),
    }
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_sequence(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path.is_file()
            && extension_of(&path).is_some_and(|ext| SEQUENCE_EXTENSIONS.contains(&ext.as_str()));
        if is_frame {
            frames.push(path);
        }
    }

    if frames.is_empty() {
        return Err(StabError::EmptySequence);
    }
    frames.sort();
    Ok(frames)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
