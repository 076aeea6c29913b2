use crate::constants::{MAX_FILE_SIZE, MAX_IMAGE_DIMENSION};
use crate::encode::encode;
use crate::error::{BatchError, Result};
use crate::job::{Dimensions, JobPlan, Operation, TransformJob};
use crate::watermark::{apply_watermark, load_overlay};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A job with everything it needs loaded up front (the scaled watermark
/// overlay, for watermark jobs).
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub job: TransformJob,
    overlay: Option<Arc<DynamicImage>>,
}

impl PreparedJob {
    pub fn new(job: TransformJob) -> Self {
        Self { job, overlay: None }
    }
}

/// Loads each distinct watermark overlay once and attaches it to the jobs
/// that use it.
pub fn prepare_plan(plan: &JobPlan) -> Result<Vec<PreparedJob>> {
    let mut overlays: HashMap<(PathBuf, Dimensions), Arc<DynamicImage>> = HashMap::new();
    let mut prepared = Vec::with_capacity(plan.len());

    for job in plan.jobs() {
        let overlay = match &job.operation {
            Operation::Watermark { overlay, size, .. } => {
                let key = (overlay.clone(), *size);
                let image = match overlays.get(&key) {
                    Some(image) => Arc::clone(image),
                    None => {
                        let image = Arc::new(load_overlay(overlay, *size)?);
                        overlays.insert(key, Arc::clone(&image));
                        image
                    }
                };
                Some(image)
            }
            _ => None,
        };
        prepared.push(PreparedJob {
            job: job.clone(),
            overlay,
        });
    }

    Ok(prepared)
}

/// Decodes a source image, sniffing the format from its content. Files over
/// `MAX_FILE_SIZE` are refused before decoding and images wider or taller
/// than `MAX_IMAGE_DIMENSION` after it.
pub fn load_image(path: &Path) -> Result<(DynamicImage, u64)> {
    let unreadable = |source: image::ImageError| BatchError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };

    let file_size = fs::metadata(path)
        .map_err(|e| unreadable(image::ImageError::IoError(e)))?
        .len();
    if file_size > MAX_FILE_SIZE {
        return Err(BatchError::FileTooLarge(file_size, MAX_FILE_SIZE));
    }

    let img = ImageReader::open(path)
        .map_err(|e| unreadable(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| unreadable(image::ImageError::IoError(e)))?
        .decode()
        .map_err(unreadable)?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(BatchError::ImageTooLarge(width, height, MAX_IMAGE_DIMENSION));
    }

    Ok((img, file_size))
}

/// Scales `img` for a resize operation. Both edges: cover-fit and centre
/// crop. One edge: proportional, never below one pixel.
pub fn resize_image(img: &DynamicImage, width: Option<u32>, height: Option<u32>) -> Result<DynamicImage> {
    let (iw, ih) = img.dimensions();
    let resized = match (width, height) {
        (Some(w), Some(h)) => img.resize_to_fill(w, h, FilterType::Lanczos3),
        (Some(w), None) => {
            let h = ((w as u64 * ih as u64) as f64 / iw as f64).round().max(1.0) as u32;
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        (None, Some(h)) => {
            let w = ((h as u64 * iw as u64) as f64 / ih as f64).round().max(1.0) as u32;
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        (None, None) => {
            return Err(BatchError::UnsupportedOperation(
                "resize without a target size".to_string(),
            ))
        }
    };
    Ok(resized)
}

/// The pixel step of a job. Conversions borrow the source unchanged.
pub fn apply_operation<'a>(img: &'a DynamicImage, job: &PreparedJob) -> Result<Cow<'a, DynamicImage>> {
    match &job.job.operation {
        Operation::Convert => Ok(Cow::Borrowed(img)),
        Operation::Resize { width, height } => Ok(Cow::Owned(resize_image(img, *width, *height)?)),
        Operation::Watermark { placement, .. } => {
            let overlay = job.overlay.as_deref().ok_or_else(|| {
                BatchError::UnsupportedOperation("watermark overlay was not loaded".to_string())
            })?;
            Ok(Cow::Owned(apply_watermark(img, overlay, *placement)?))
        }
    }
}

/// Pixel step followed by encoding, entirely in memory.
pub fn render(img: &DynamicImage, job: &PreparedJob) -> Result<Vec<u8>> {
    let transformed = apply_operation(img, job)?;
    encode(&transformed, job.job.format, job.job.quality)
}

/// Runs [`render`] on a helper thread and gives up after `timeout`. An
/// abandoned render keeps running in the background but its bytes are
/// dropped, so nothing reaches the filesystem.
///
/// Each call spawns one OS thread outside the rayon pool, and renders that
/// time out are not bounded: a plan that times out on every file can leave
/// up to one orphaned thread per job until those renders finish.
pub fn render_with_timeout(
    img: Arc<DynamicImage>,
    job: PreparedJob,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let Some(timeout) = timeout else {
        return render(&img, &job);
    };

    let label = job.job.label();
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("render".to_string())
        .spawn(move || {
            let _ = tx.send(render(&img, &job));
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(BatchError::Timeout {
            job: label,
            secs: timeout.as_secs(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(BatchError::UnsupportedOperation(format!(
            "'{}' aborted unexpectedly",
            label
        ))),
    }
}

/// Writes `bytes` to a hidden temp file next to `path`, then renames it into
/// place. A failed write never leaves a partial output behind.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<u64> {
    let write_failure = |source: std::io::Error| BatchError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".img-batch-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_failure)?;

    temp.write_all(bytes).map_err(write_failure)?;
    temp.as_file().sync_all().map_err(write_failure)?;
    temp.persist(path).map_err(|e| write_failure(e.error))?;

    Ok(bytes.len() as u64)
}
