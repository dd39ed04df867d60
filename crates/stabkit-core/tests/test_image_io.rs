mod common;

use common::ramp;
use stabkit_core::io::{list_sequence, load_frame, save_image, save_png, save_tiff};
use stabkit_core::{Frame, StabError};
use tempfile::TempDir;

#[test]
fn test_png_roundtrip_8bit_precision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frame.png");
    let frame = Frame::new(ramp(37, 11));

    save_png(&frame, &path).unwrap();
    let loaded = load_frame(&path).unwrap();

    assert_eq!(loaded.resolution(), frame.resolution());
    for (a, b) in loaded.data.iter().zip(frame.data.iter()) {
        assert!((a - b).abs() <= 0.5 / 255.0 + 1e-6, "{a} vs {b}");
    }
}

#[test]
fn test_tiff_roundtrip_16bit_precision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frame.tif");
    let frame = Frame::new(ramp(20, 8));

    save_tiff(&frame, &path).unwrap();
    let loaded = load_frame(&path).unwrap();

    for (a, b) in loaded.data.iter().zip(frame.data.iter()) {
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }
}

#[test]
fn test_save_image_picks_format_by_extension() {
    let dir = TempDir::new().unwrap();
    let frame = Frame::new(ramp(8, 8));

    let tiff = dir.path().join("a.tiff");
    save_image(&frame, &tiff).unwrap();
    let magic = std::fs::read(&tiff).unwrap();
    assert!(magic.starts_with(b"II") || magic.starts_with(b"MM"));

    let png = dir.path().join("b.png");
    save_image(&frame, &png).unwrap();
    let magic = std::fs::read(&png).unwrap();
    assert!(magic.starts_with(b"\x89PNG"));
}

#[test]
fn test_values_are_clamped_on_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clamped.png");
    let mut frame = Frame::new(ramp(4, 4));
    frame.data[[0, 0]] = -3.0;
    frame.data[[0, 1]] = 7.0;

    save_png(&frame, &path).unwrap();
    let loaded = load_frame(&path).unwrap();
    assert_eq!(loaded.data[[0, 0]], 0.0);
    assert_eq!(loaded.data[[0, 1]], 1.0);
}

#[test]
fn test_list_sequence_sorted_and_filtered() {
    let dir = TempDir::new().unwrap();
    let frame = Frame::new(ramp(4, 4));
    for name in ["frame_002.png", "frame_000.png", "frame_001.tif"] {
        save_image(&frame, &dir.path().join(name)).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
    std::fs::create_dir(dir.path().join("nested.png")).unwrap();

    let paths = list_sequence(dir.path()).unwrap();
    let names: Vec<_> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["frame_000.png", "frame_001.tif", "frame_002.png"]);
}

#[test]
fn test_list_sequence_empty_dir() {
    let dir = TempDir::new().unwrap();
    let err = list_sequence(dir.path()).unwrap_err();
    assert!(matches!(err, StabError::EmptySequence));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    assert!(load_frame(&dir.path().join("missing.png")).is_err());
}
