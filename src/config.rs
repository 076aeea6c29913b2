//! Run configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML plan
//! file, then command line flags. The result is an immutable
//! [`BatchConfig`] handed to the batch runner.
//!
//! ```toml
//! threads = 4
//! timeout_secs = 60
//! overwrite = true
//!
//! [[jobs]]
//! kind = "resize"
//! width = 800
//! height = 600
//! suffix = "-medium"
//!
//! [[jobs]]
//! kind = "convert"
//! format = "webp"
//! quality = 50
//! suffix = "-quality-50"
//!
//! [[jobs]]
//! kind = "watermark"
//! overlay = "images/watermark.png"
//! left = 700
//! top = 450
//! ```

use crate::constants::{
    COMPRESSED_SUFFIX, DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_WATERMARK_HEIGHT, DEFAULT_WATERMARK_WIDTH,
};
use crate::error::{BatchError, Result};
use crate::formats::OutputFormat;
use crate::job::{
    Dimensions, Gravity, JobPlan, Operation, Placement, Quality, ResizeSpec, TransformJob,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the batch is executed, independent of what it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub threads: usize,
    /// `None` disables the per-operation timeout.
    pub timeout: Option<Duration>,
    /// Replace outputs from a previous run. When off, existing outputs are
    /// left untouched and reported as skipped.
    pub overwrite: bool,
    pub recursive: bool,
    /// Draw a progress bar over the input files.
    pub progress: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(1),
            timeout: Some(Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)),
            overwrite: true,
            recursive: false,
            progress: false,
        }
    }
}

impl ExecutionOptions {
    pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub plan: JobPlan,
    pub options: ExecutionOptions,
    /// Only accept `jpg`/`jpeg`/`png` inputs. Off for single-file runs.
    pub filter_extensions: bool,
}

impl BatchConfig {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            plan: JobPlan::default(),
            options: ExecutionOptions::default(),
            filter_extensions: true,
        }
    }

    pub fn with_plan(mut self, plan: JobPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn single_file(mut self) -> Self {
        self.filter_extensions = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Resize,
    Convert,
    Watermark,
}

/// One `[[jobs]]` entry of a plan file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobEntry {
    pub kind: JobKind,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    pub suffix: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub overlay: Option<PathBuf>,
    pub overlay_width: Option<u32>,
    pub overlay_height: Option<u32>,
    pub left: Option<u32>,
    pub top: Option<u32>,
    pub gravity: Option<String>,
}

impl JobEntry {
    pub fn into_job(self) -> Result<TransformJob> {
        let quality = match self.quality {
            Some(q) => Quality::new(q)?,
            None => Quality::default(),
        };

        let (operation, default_format, default_suffix) = match self.kind {
            JobKind::Resize => {
                let op = Operation::resize(self.width, self.height)?;
                let spec = ResizeSpec {
                    width: self.width,
                    height: self.height,
                };
                (op, OutputFormat::Png, spec.suffix())
            }
            JobKind::Convert => {
                let format = self.format.ok_or_else(|| {
                    BatchError::InvalidConfig("convert jobs need a format".to_string())
                })?;
                let suffix = if format.is_input_family() {
                    COMPRESSED_SUFFIX.to_string()
                } else {
                    String::new()
                };
                (Operation::Convert, format, suffix)
            }
            JobKind::Watermark => {
                let overlay = self.overlay.ok_or_else(|| {
                    BatchError::InvalidConfig("watermark jobs need an overlay".to_string())
                })?;
                let size = Dimensions::new(
                    self.overlay_width.unwrap_or(DEFAULT_WATERMARK_WIDTH),
                    self.overlay_height.unwrap_or(DEFAULT_WATERMARK_HEIGHT),
                )?;
                let placement = match (self.left, self.top, self.gravity) {
                    (_, _, Some(g)) => Placement::Gravity(g.parse()?),
                    (None, None, None) => Placement::Gravity(Gravity::SouthEast),
                    (left, top, None) => Placement::Offset {
                        left: left.unwrap_or(0),
                        top: top.unwrap_or(0),
                    },
                };
                let suffix = placement.suffix();
                (
                    Operation::Watermark {
                        overlay,
                        size,
                        placement,
                    },
                    OutputFormat::Png,
                    suffix,
                )
            }
        };

        Ok(TransformJob::new(
            operation,
            self.format.unwrap_or(default_format),
            quality,
            &self.suffix.unwrap_or(default_suffix),
        ))
    }
}

/// Contents of a `--config` TOML file. Every field is optional; present
/// fields override the command line defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    pub threads: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub overwrite: Option<bool>,
    pub recursive: Option<bool>,
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

impl PlanFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            BatchError::InvalidConfig(format!("cannot read config {:?}: {}", path, e))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BatchError::InvalidConfig(e.to_string()))
    }

    /// `None` when the file lists no jobs.
    pub fn plan(&self) -> Result<Option<JobPlan>> {
        if self.jobs.is_empty() {
            return Ok(None);
        }
        let jobs = self
            .jobs
            .iter()
            .cloned()
            .map(JobEntry::into_job)
            .collect::<Result<Vec<_>>>()?;
        JobPlan::new(jobs).map(Some)
    }

    pub fn apply_to(&self, options: &mut ExecutionOptions) {
        if let Some(threads) = self.threads {
            options.threads = threads.max(1);
        }
        if let Some(secs) = self.timeout_secs {
            options.timeout = ExecutionOptions::timeout_from_secs(secs);
        }
        if let Some(overwrite) = self.overwrite {
            options.overwrite = overwrite;
        }
        if let Some(recursive) = self.recursive {
            options.recursive = recursive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUTORIAL_PLAN: &str = r#"
        threads = 2
        timeout_secs = 0
        overwrite = false

        [[jobs]]
        kind = "resize"
        width = 150
        height = 150
        suffix = "-thumbnail"

        [[jobs]]
        kind = "resize"
        width = 1920
        suffix = "-full"

        [[jobs]]
        kind = "convert"
        format = "avif"
        quality = 50
        suffix = "-quality-50"

        [[jobs]]
        kind = "watermark"
        overlay = "images/watermark.png"
        left = 700
        top = 0

        [[jobs]]
        kind = "watermark"
        overlay = "images/watermark.png"
        gravity = "south-west"
    "#;

    #[test]
    fn test_parse_plan_file() {
        let file = PlanFile::parse(TUTORIAL_PLAN).unwrap();
        let plan = file.plan().unwrap().unwrap();
        let names: Vec<String> = plan.jobs().iter().map(|j| j.output_file_name("logo")).collect();
        assert_eq!(
            names,
            vec![
                "logo-thumbnail.png",
                "logo-full.png",
                "logo-quality-50.avif",
                "logo-watermark-700-0.png",
                "logo-watermark-south-west.png",
            ]
        );
        assert_eq!(plan.jobs()[2].quality.value(), 50);
    }

    #[test]
    fn test_plan_file_overrides_options() {
        let file = PlanFile::parse(TUTORIAL_PLAN).unwrap();
        let mut options = ExecutionOptions::default();
        file.apply_to(&mut options);
        assert_eq!(options.threads, 2);
        assert_eq!(options.timeout, None);
        assert!(!options.overwrite);
        assert!(!options.recursive);
    }

    #[test]
    fn test_empty_plan_file_keeps_cli_plan() {
        let file = PlanFile::parse("threads = 3").unwrap();
        assert!(file.plan().unwrap().is_none());
    }

    #[test]
    fn test_convert_default_suffixes() {
        let file = PlanFile::parse(
            "[[jobs]]\nkind = \"convert\"\nformat = \"png\"\n\n[[jobs]]\nkind = \"convert\"\nformat = \"jpg\"\n\n[[jobs]]\nkind = \"convert\"\nformat = \"webp\"",
        )
        .unwrap();
        let plan = file.plan().unwrap().unwrap();
        let names: Vec<String> = plan.jobs().iter().map(|j| j.output_file_name("logo")).collect();
        assert_eq!(names, vec!["logo-compressed.png", "logo-compressed.jpg", "logo.webp"]);
    }

    #[test]
    fn test_convert_without_format_rejected() {
        let file = PlanFile::parse("[[jobs]]\nkind = \"convert\"").unwrap();
        assert!(matches!(file.plan(), Err(BatchError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(PlanFile::parse("thread = 3").is_err());
        assert!(PlanFile::parse("[[jobs]]\nkind = \"blur\"").is_err());
    }

    #[test]
    fn test_invalid_quality_in_plan() {
        let file = PlanFile::parse("[[jobs]]\nkind = \"convert\"\nformat = \"jpg\"\nquality = 0").unwrap();
        assert!(matches!(file.plan(), Err(BatchError::InvalidQuality(0))));
    }

    #[test]
    fn test_default_config() {
        let config = BatchConfig::new("images", "output");
        assert_eq!(config.plan.len(), 5);
        assert!(config.filter_extensions);
        assert!(config.options.overwrite);
        assert!(config.options.threads >= 1);
        assert!(!config.single_file().filter_extensions);
    }

    #[test]
    fn test_timeout_zero_disables() {
        assert_eq!(ExecutionOptions::timeout_from_secs(0), None);
        assert_eq!(
            ExecutionOptions::timeout_from_secs(5),
            Some(Duration::from_secs(5))
        );
    }
}
