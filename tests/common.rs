#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A busy RGB pattern so lossy encoders have something to throw away.
pub fn noisy_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503));
        Rgb([(v >> 3) as u8, (v >> 11) as u8, ((x + y) * 3) as u8])
    }))
}

pub fn write_jpeg(path: &Path, width: u32, height: u32) -> PathBuf {
    noisy_image(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
    path.to_path_buf()
}

pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    noisy_image(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
    path.to_path_buf()
}

pub fn write_overlay(path: &Path) -> PathBuf {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 30, Rgba([255, 255, 255, 160])))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
    path.to_path_buf()
}

pub fn write_text(path: &Path, contents: &[u8]) -> PathBuf {
    File::create(path).unwrap().write_all(contents).unwrap();
    path.to_path_buf()
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

/// Sorted file names directly under `dir`.
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
