// tests/test_utils/mod.rs
//
// Shared helpers for integration tests: synthetic images, metadata-bearing
// byte blobs, canned scorers and binary invocation.

#![allow(dead_code)]

use image::{ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::Arc;

use imagecheckr::core::{ClassifierRegistry, ImageArray, RegistryBuilder};

/// Deterministic pseudo-random bytes (64-bit LCG)
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_u8(&mut self) -> u8 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 56) as u8
    }

    /// Uniform in [0, 1]
    pub fn next_unit(&mut self) -> f64 {
        self.next_u8() as f64 / 255.0
    }
}

pub fn encode_png(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let buffer = ImageBuffer::from_fn(width, height, |x, y| Rgb(pixel(x, y)));
    let mut bytes = Cursor::new(Vec::new());
    buffer
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("PNG encoding failed");
    bytes.into_inner()
}

/// High-contrast noise: flat spectrum
pub fn noise_png(size: u32, seed: u64) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    let values: Vec<u8> = (0..size * size).map(|_| rng.next_u8()).collect();
    encode_png(size, size, |x, y| {
        let v = values[(y * size + x) as usize];
        [v, v, v]
    })
}

/// Smooth horizontal ramp: energy concentrated at low frequencies
pub fn gradient_png(size: u32) -> Vec<u8> {
    encode_png(size, size, |x, _| {
        let v = (x * 255 / size.max(1)) as u8;
        [v, v / 2, 255 - v]
    })
}

pub fn noise_image(size: usize, seed: u64) -> Arc<ImageArray> {
    let mut rng = Lcg::new(seed);
    let data = (0..size * size).map(|_| rng.next_unit() as f32).collect();
    Arc::new(ImageArray::grayscale(size, size, data).expect("valid noise image"))
}

/// Little-endian TIFF structure with a single IFD0 entry (Orientation = 1)
pub fn tiff_exif_block() -> Vec<u8> {
    let mut tiff = b"II*\0".to_vec();
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&[1, 0, 0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff
}

/// JPEG header whose APP1 segment is `Exif\0\0` followed by `payload`,
/// zero-padded to `total_len`. Does not decode as an image.
pub fn jpeg_with_app1(payload: &[u8], total_len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1];
    bytes.extend_from_slice(&((payload.len() + 8) as u16).to_be_bytes());
    bytes.extend_from_slice(b"Exif\0\0");
    bytes.extend_from_slice(payload);
    bytes.resize(total_len.max(bytes.len()), 0);
    bytes
}

/// JPEG header carrying a readable EXIF block
pub fn jpeg_with_exif(total_len: usize) -> Vec<u8> {
    jpeg_with_app1(&tiff_exif_block(), total_len)
}

/// Registry of constant scorers
pub fn constant_registry(scores: &[(&str, f64)]) -> ClassifierRegistry {
    scores
        .iter()
        .fold(RegistryBuilder::new(), |builder, &(name, p)| {
            builder.with_fn(name, move |_: &ImageArray| Ok(p))
        })
        .build()
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("imagecheckr_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

pub fn run_imagecheckr<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_imagecheckr"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute imagecheckr")
}

pub fn run_json_analysis<S: AsRef<std::ffi::OsStr>>(input: S) -> serde_json::Value {
    let output = run_imagecheckr([input.as_ref(), std::ffi::OsStr::new("--json")]);
    assert!(
        output.status.success(),
        "imagecheckr failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}
