use crate::config::{BatchConfig, ExecutionOptions, PlanFile};
use crate::error::Result;
use crate::job::{Dimensions, EncodeSpec, JobPlan, Placement, ResizeSpec, WatermarkSpec};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-batch",
    about = "Batch image transformer: thumbnails, format conversion, compression and watermarks",
    long_about = "img-batch applies an ordered plan of transform jobs to every JPEG/PNG image in a \
                  directory. By default each image yields a 150x150 thumbnail, WebP and AVIF \
                  conversions, and JPEG/PNG compression passes, all at quality 80.",
    version,
    after_help = "EXAMPLES:\n  \
    img-batch batch ./images ./output\n  \
    img-batch batch ./images ./output -e webp:80 -e avif:50 --no-thumbnail\n  \
    img-batch file logo.png ./output --no-thumbnail --resize 800x600 --resize 1920x\n  \
    img-batch file logo.png ./output --watermark mark.png --watermark-at 0,0 --watermark-at south-east"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short = 'q', long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Log every operation (-vv for debug output)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Transform every JPEG/PNG image in a directory",
        long_about = "Apply the job plan to every .jpg, .jpeg and .png file (case-insensitive) in the \
                      input directory. Other files are ignored. A failing file or operation is \
                      reported and the batch carries on."
    )]
    Batch {
        #[arg(help = "Input directory")]
        input: PathBuf,

        #[arg(help = "Output directory (created if missing)")]
        output: PathBuf,

        #[arg(
            short = 'r',
            long,
            help = "Process subdirectories recursively",
            long_help = "Recursively process all subdirectories. The directory layout is mirrored \
                         under the output directory."
        )]
        recursive: bool,

        #[command(flatten)]
        jobs: JobArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    #[command(
        about = "Transform a single image file",
        long_about = "Apply the job plan to one file. The extension is not checked; anything the \
                      decoder understands is accepted."
    )]
    File {
        #[arg(help = "Input image file")]
        input: PathBuf,

        #[arg(help = "Output directory (created if missing)")]
        output: PathBuf,

        #[command(flatten)]
        jobs: JobArgs,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Flags that shape the job plan.
#[derive(ClapArgs, Debug, Clone)]
pub struct JobArgs {
    #[arg(
        long,
        value_name = "WxH",
        default_value = "150x150",
        help = "Thumbnail size, written as <name>-thumbnail.png"
    )]
    pub thumbnail: Dimensions,

    #[arg(long, help = "Do not generate a thumbnail")]
    pub no_thumbnail: bool,

    #[arg(
        short = 'e',
        long = "encode",
        value_name = "FORMAT[:QUALITY]",
        help = "Encode pass, repeatable (default: webp:80 avif:80 jpeg:80 png:80)",
        long_help = "Encode pass, repeatable. Formats: jpeg, png, webp, avif. Quality 1-100, default 80. \
                     JPEG/PNG outputs get a -compressed suffix; a repeated format gets -quality-<q>. \
                     For PNG, quality selects compression effort (>=90 Zopfli). \
                     Giving any --encode replaces the default list."
    )]
    pub encode: Vec<EncodeSpec>,

    #[arg(
        long,
        value_name = "WxH|Wx|xH",
        help = "Extra resize, repeatable; one edge keeps the aspect ratio"
    )]
    pub resize: Vec<ResizeSpec>,

    #[arg(long, value_name = "PATH", help = "Watermark overlay image")]
    pub watermark: Option<PathBuf>,

    #[arg(
        long,
        value_name = "WxH",
        default_value = "100x100",
        help = "Size the overlay is scaled to"
    )]
    pub watermark_size: Dimensions,

    #[arg(
        long,
        value_name = "LEFT,TOP|GRAVITY",
        help = "Watermark position, repeatable (default: south-east)",
        long_help = "Watermark position, repeatable. Either a pixel offset LEFT,TOP or one of \
                     north-west, north-east, south-west, south-east, centre."
    )]
    pub watermark_at: Vec<Placement>,

    #[arg(long, value_name = "FILE", help = "TOML plan file; its [[jobs]] replace these flags")]
    pub config: Option<PathBuf>,
}

/// Flags that shape how the plan runs.
#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        short = 'j',
        long,
        help = "Number of parallel threads (default: auto)",
        long_help = "Number of worker threads. If not specified, uses number of CPU cores."
    )]
    pub threads: Option<usize>,

    #[arg(long, value_name = "SECS", help = "Per-operation timeout, 0 disables (default: 120)")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Keep outputs that already exist instead of overwriting them")]
    pub skip_existing: bool,

    #[arg(long, value_name = "FILE", help = "Write a JSON report of every operation")]
    pub report: Option<PathBuf>,
}

impl JobArgs {
    pub fn plan(&self) -> Result<JobPlan> {
        let thumbnail = (!self.no_thumbnail).then_some(self.thumbnail);
        let encodes = if self.encode.is_empty() {
            EncodeSpec::defaults()
        } else {
            self.encode.clone()
        };

        let watermarks: Vec<WatermarkSpec> = match &self.watermark {
            Some(overlay) => {
                let placements = if self.watermark_at.is_empty() {
                    vec!["south-east".parse()?]
                } else {
                    self.watermark_at.clone()
                };
                placements
                    .into_iter()
                    .map(|placement| WatermarkSpec {
                        overlay: overlay.clone(),
                        size: self.watermark_size,
                        placement,
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        JobPlan::from_parts(thumbnail, &self.resize, &encodes, &watermarks)
    }
}

/// Defaults, then the plan file, then explicit flags.
pub fn build_config(
    input: PathBuf,
    output: PathBuf,
    recursive: bool,
    jobs: &JobArgs,
    run: &RunArgs,
    show_progress: bool,
) -> Result<BatchConfig> {
    let mut options = ExecutionOptions {
        recursive,
        progress: show_progress,
        ..ExecutionOptions::default()
    };
    let mut plan = jobs.plan()?;

    if let Some(path) = &jobs.config {
        let file = PlanFile::load(path)?;
        file.apply_to(&mut options);
        if let Some(file_plan) = file.plan()? {
            plan = file_plan;
        }
    }

    if let Some(threads) = run.threads {
        options.threads = threads.max(1);
    }
    if let Some(secs) = run.timeout {
        options.timeout = ExecutionOptions::timeout_from_secs(secs);
    }
    if run.skip_existing {
        options.overwrite = false;
    }
    if recursive {
        options.recursive = true;
    }

    Ok(BatchConfig::new(input, output)
        .with_plan(plan)
        .with_options(options))
}
