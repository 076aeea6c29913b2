//! Transform jobs and the plan that groups them.
//!
//! A [`TransformJob`] is one `{operation, format, quality, suffix}` unit. The
//! output file for a source `name.ext` is always
//! `<output_dir>/<name><suffix>.<format extension>`, so a [`JobPlan`] rejects
//! any two jobs that would collide on the same path.

use crate::constants::{
    COMPRESSED_SUFFIX, DEFAULT_QUALITY, DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH,
    MAX_QUALITY, MIN_QUALITY, THUMBNAIL_SUFFIX,
};
use crate::error::{BatchError, Result};
use crate::formats::OutputFormat;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Encoder quality, validated to `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Result<Self> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&value) {
            return Err(BatchError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BatchError::InvalidDimensions(format!(
                "{}x{}: both edges must be non-zero",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn thumbnail() -> Self {
        Self {
            width: DEFAULT_THUMBNAIL_WIDTH,
            height: DEFAULT_THUMBNAIL_HEIGHT,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| BatchError::InvalidDimensions(format!("'{}' is not WIDTHxHEIGHT", s)))?;
        let width = parse_edge(w, s)?;
        let height = parse_edge(h, s)?;
        Dimensions::new(width, height)
    }
}

fn parse_edge(value: &str, whole: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| BatchError::InvalidDimensions(format!("'{}' has a bad edge '{}'", whole, value)))
}

/// Anchor used when a watermark has no explicit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gravity {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    Centre,
}

impl Gravity {
    pub fn name(&self) -> &'static str {
        match self {
            Gravity::NorthWest => "north-west",
            Gravity::NorthEast => "north-east",
            Gravity::SouthWest => "south-west",
            Gravity::SouthEast => "south-east",
            Gravity::Centre => "centre",
        }
    }
}

impl FromStr for Gravity {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "northwest" | "topleft" => Ok(Gravity::NorthWest),
            "northeast" | "topright" => Ok(Gravity::NorthEast),
            "southwest" | "bottomleft" => Ok(Gravity::SouthWest),
            "southeast" | "bottomright" => Ok(Gravity::SouthEast),
            "centre" | "center" => Ok(Gravity::Centre),
            _ => Err(BatchError::InvalidConfig(format!("unknown gravity '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Top-left corner of the overlay, in base image pixels.
    Offset { left: u32, top: u32 },
    Gravity(Gravity),
}

impl Placement {
    pub(crate) fn suffix(&self) -> String {
        match self {
            Placement::Offset { left, top } => format!("-watermark-{}-{}", left, top),
            Placement::Gravity(g) => format!("-watermark-{}", g.name()),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Offset { left, top } => write!(f, "{},{}", left, top),
            Placement::Gravity(g) => write!(f, "{}", g.name()),
        }
    }
}

impl FromStr for Placement {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some((left, top)) = s.split_once(',') {
            let left = left.trim().parse().map_err(|_| {
                BatchError::InvalidConfig(format!("bad watermark offset '{}'", s))
            })?;
            let top = top.trim().parse().map_err(|_| {
                BatchError::InvalidConfig(format!("bad watermark offset '{}'", s))
            })?;
            return Ok(Placement::Offset { left, top });
        }
        Ok(Placement::Gravity(s.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Both edges: cover-fit and centre crop. One edge: proportional scale.
    Resize {
        width: Option<u32>,
        height: Option<u32>,
    },
    /// Re-encode without touching the pixels.
    Convert,
    Watermark {
        overlay: PathBuf,
        size: Dimensions,
        placement: Placement,
    },
}

impl Operation {
    pub fn resize(width: Option<u32>, height: Option<u32>) -> Result<Self> {
        match (width, height) {
            (None, None) => Err(BatchError::InvalidDimensions(
                "resize needs a width, a height, or both".to_string(),
            )),
            (Some(0), _) | (_, Some(0)) => Err(BatchError::InvalidDimensions(
                "resize edges must be non-zero".to_string(),
            )),
            _ => Ok(Operation::Resize { width, height }),
        }
    }

    fn describe(&self) -> String {
        match self {
            Operation::Resize {
                width: Some(w),
                height: Some(h),
            } => format!("resize {}x{}", w, h),
            Operation::Resize {
                width: Some(w),
                height: None,
            } => format!("resize width {}", w),
            Operation::Resize { height, .. } => {
                format!("resize height {}", height.unwrap_or_default())
            }
            Operation::Convert => "convert".to_string(),
            Operation::Watermark { placement, .. } => format!("watermark at {}", placement),
        }
    }
}

/// `WIDTHxHEIGHT`, `WIDTHx` or `xHEIGHT` from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeSpec {
    pub(crate) fn suffix(&self) -> String {
        match (self.width, self.height) {
            (Some(w), Some(h)) => format!("-{}x{}", w, h),
            (Some(w), None) => format!("-{}w", w),
            (None, Some(h)) => format!("-{}h", h),
            (None, None) => String::new(),
        }
    }
}

impl FromStr for ResizeSpec {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s.split_once(['x', 'X']).unwrap_or((s, ""));
        let edge = |v: &str| -> Result<Option<u32>> {
            if v.trim().is_empty() {
                Ok(None)
            } else {
                parse_edge(v, s).map(Some)
            }
        };
        let spec = ResizeSpec {
            width: edge(w)?,
            height: edge(h)?,
        };
        Operation::resize(spec.width, spec.height)?;
        Ok(spec)
    }
}

/// `FORMAT[:QUALITY]` from the command line, e.g. `webp:80`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSpec {
    pub format: OutputFormat,
    pub quality: Quality,
}

impl EncodeSpec {
    pub fn new(format: OutputFormat, quality: u8) -> Result<Self> {
        Ok(Self {
            format,
            quality: Quality::new(quality)?,
        })
    }

    /// WebP, AVIF, JPEG and PNG at the default quality, in that order.
    pub fn defaults() -> Vec<EncodeSpec> {
        [
            OutputFormat::WebP,
            OutputFormat::Avif,
            OutputFormat::Jpeg,
            OutputFormat::Png,
        ]
        .into_iter()
        .map(|format| EncodeSpec {
            format,
            quality: Quality::default(),
        })
        .collect()
    }
}

impl FromStr for EncodeSpec {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((fmt, q)) => {
                let quality: u8 = q
                    .trim()
                    .parse()
                    .map_err(|_| BatchError::InvalidConfig(format!("bad quality in '{}'", s)))?;
                EncodeSpec::new(fmt.trim().parse()?, quality)
            }
            None => Ok(EncodeSpec {
                format: s.trim().parse()?,
                quality: Quality::default(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub overlay: PathBuf,
    pub size: Dimensions,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformJob {
    pub operation: Operation,
    pub format: OutputFormat,
    pub quality: Quality,
    pub suffix: String,
}

impl TransformJob {
    pub fn new(operation: Operation, format: OutputFormat, quality: Quality, suffix: &str) -> Self {
        Self {
            operation,
            format,
            quality,
            suffix: suffix.to_string(),
        }
    }

    pub fn output_file_name(&self, stem: &str) -> String {
        format!("{}{}.{}", stem, self.suffix, self.format.extension())
    }

    pub fn output_path(&self, source: &Path, output_dir: &Path) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .ok_or_else(|| {
                BatchError::UnsupportedOperation(format!("invalid file name: {:?}", source))
            })?
            .to_string_lossy();
        Ok(output_dir.join(self.output_file_name(&stem)))
    }

    pub fn label(&self) -> String {
        format!(
            "{} -> {} q{}",
            self.operation.describe(),
            self.format,
            self.quality.value()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    jobs: Vec<TransformJob>,
}

impl JobPlan {
    pub fn new(jobs: Vec<TransformJob>) -> Result<Self> {
        if jobs.is_empty() {
            return Err(BatchError::InvalidConfig("the job plan is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for job in &jobs {
            if job.suffix.contains(['/', '\\']) {
                return Err(BatchError::InvalidConfig(format!(
                    "suffix '{}' must not contain a path separator",
                    job.suffix
                )));
            }
            if !seen.insert(job.output_file_name("")) {
                return Err(BatchError::InvalidConfig(format!(
                    "two jobs write '<name>{}.{}'",
                    job.suffix,
                    job.format.extension()
                )));
            }
        }

        Ok(Self { jobs })
    }

    /// Thumbnail followed by one compression pass per encode spec.
    pub fn default_batch(thumbnail: Dimensions, encodes: &[EncodeSpec]) -> Result<Self> {
        Self::from_parts(Some(thumbnail), &[], encodes, &[])
    }

    /// Builds a plan in a fixed order: thumbnail, resizes, encodes,
    /// watermarks. Suffixes are derived so every job gets its own path.
    pub fn from_parts(
        thumbnail: Option<Dimensions>,
        resizes: &[ResizeSpec],
        encodes: &[EncodeSpec],
        watermarks: &[WatermarkSpec],
    ) -> Result<Self> {
        let mut jobs = Vec::new();

        if let Some(dims) = thumbnail {
            jobs.push(TransformJob::new(
                Operation::resize(Some(dims.width), Some(dims.height))?,
                OutputFormat::Png,
                Quality::default(),
                THUMBNAIL_SUFFIX,
            ));
        }

        for spec in resizes {
            jobs.push(TransformJob::new(
                Operation::resize(spec.width, spec.height)?,
                OutputFormat::Png,
                Quality::default(),
                &spec.suffix(),
            ));
        }

        let mut used = HashSet::new();
        for spec in encodes {
            let mut suffix = if spec.format.is_input_family() {
                COMPRESSED_SUFFIX.to_string()
            } else {
                String::new()
            };
            if !used.insert((suffix.clone(), spec.format)) {
                suffix = format!("{}-quality-{}", suffix, spec.quality.value());
                used.insert((suffix.clone(), spec.format));
            }
            jobs.push(TransformJob::new(
                Operation::Convert,
                spec.format,
                spec.quality,
                &suffix,
            ));
        }

        for spec in watermarks {
            jobs.push(TransformJob::new(
                Operation::Watermark {
                    overlay: spec.overlay.clone(),
                    size: spec.size,
                    placement: spec.placement,
                },
                OutputFormat::Png,
                Quality::default(),
                &spec.placement.suffix(),
            ));
        }

        Self::new(jobs)
    }

    pub fn jobs(&self) -> &[TransformJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobPlan {
    fn default() -> Self {
        let jobs = Self::from_parts(Some(Dimensions::thumbnail()), &[], &EncodeSpec::defaults(), &[])
            .map(|plan| plan.jobs)
            .unwrap_or_default();
        Self { jobs }
    }
}
