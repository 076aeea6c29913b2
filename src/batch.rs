use crate::cancel::CancelToken;
use crate::config::{BatchConfig, ExecutionOptions};
use crate::constants::PROGRESS_BAR_TEMPLATE;
use crate::error::{BatchError, Result};
use crate::job::TransformJob;
use crate::processing::{load_image, prepare_plan, render_with_timeout, write_output, PreparedJob};
use crate::report::{BatchReport, FileReport, OperationReport, Outcome};
use crate::utils::{is_hidden, is_supported_input};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Lists the images to process under `input`.
///
/// A file is returned as-is. For a directory, only `jpg`/`jpeg`/`png` files
/// are kept, hidden entries are skipped, and the result is sorted so runs are
/// reproducible. Subdirectories are only entered when `recursive` is set.
///
/// # Errors
/// * `InputNotFound` if `input` does not exist
/// * `InputUnreadable` if the directory itself cannot be listed
pub fn collect_image_files(input: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(BatchError::InputNotFound(input.to_path_buf()));
    }

    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let walker = WalkDir::new(input)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    let mut image_files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(BatchError::InputUnreadable {
                    path: input.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.depth() > 0 && entry.file_type().is_file() && is_supported_input(entry.path()) {
            image_files.push(entry.into_path());
        }
    }

    Ok(image_files)
}

/// Output directory for `source`. In recursive runs the source's directory
/// relative to the input root is mirrored under `output_dir`.
pub fn output_dir_for(source: &Path, input_root: &Path, output_dir: &Path) -> PathBuf {
    source
        .parent()
        .and_then(|parent| parent.strip_prefix(input_root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| output_dir.join(rel))
        .unwrap_or_else(|| output_dir.to_path_buf())
}

/// Finds sources that cannot be processed without clobbering something:
/// an output that would replace the source itself, or one already claimed
/// by an earlier source (`photo.jpg` and `photo.png` share every output
/// name). Sources are taken in the given order, so the first one wins.
pub fn find_output_conflicts(
    files: &[PathBuf],
    input_root: &Path,
    output_dir: &Path,
    jobs: &[TransformJob],
) -> HashMap<PathBuf, BatchError> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut conflicts = HashMap::new();

    for source in files {
        let dir = output_dir_for(source, input_root, output_dir);
        let outputs: Vec<PathBuf> = jobs
            .iter()
            .filter_map(|job| job.output_path(source, &dir).ok())
            .collect();

        let clash = outputs.iter().find_map(|output| {
            if is_same_file(output, source) {
                Some(format!("{:?} would overwrite the source image", output))
            } else {
                claimed
                    .get(output)
                    .map(|other| format!("{:?} is already written for {:?}", output, other))
            }
        });

        match clash {
            Some(message) => {
                conflicts.insert(source.clone(), BatchError::UnsupportedOperation(message));
            }
            None => {
                for output in outputs {
                    claimed.insert(output, source.as_path());
                }
            }
        }
    }

    conflicts
}

/// Path equality after resolving the parent directories. The output file
/// itself may not exist yet.
fn is_same_file(output: &Path, source: &Path) -> bool {
    if output == source {
        return true;
    }
    fn resolve(path: &Path) -> Option<(PathBuf, &std::ffi::OsStr)> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::canonicalize(parent).ok().zip(path.file_name())
    }
    matches!((resolve(output), resolve(source)), (Some(a), Some(b)) if a == b)
}

/// Runs every job of the plan against every input image.
///
/// Fatal errors (missing input, unreadable input directory, bad plan,
/// output directory that cannot be created) are returned as `Err`. Anything
/// that goes wrong for a single file or a single job is captured in the
/// returned [`BatchReport`] and the run carries on.
pub fn run_batch(config: &BatchConfig, cancel: &CancelToken) -> Result<BatchReport> {
    let start_time = Instant::now();
    info!("🚀 Starting batch: {:?} -> {:?}", config.input, config.output_dir);

    let mut image_files = collect_image_files(&config.input, config.options.recursive)?;
    if config.filter_extensions {
        image_files.retain(|f| is_supported_input(f));
    }

    let jobs = prepare_plan(&config.plan)?;

    fs::create_dir_all(&config.output_dir)
        .map_err(|_| BatchError::DirectoryCreationFailed(config.output_dir.clone()))?;

    if image_files.is_empty() {
        info!("⚠️  No image files found in {:?}", config.input);
        return Ok(BatchReport {
            files: Vec::new(),
            elapsed: start_time.elapsed(),
        });
    }

    info!(
        "📊 {} image files x {} jobs on {} threads",
        image_files.len(),
        jobs.len(),
        config.options.threads
    );

    // A scoped pool so the limit applies to this run only
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.options.threads.max(1))
        .build()
        .map_err(|e| BatchError::InvalidConfig(format!("cannot build thread pool: {}", e)))?;

    let progress = if config.options.progress {
        let pb = ProgressBar::new(image_files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let input_root = if config.input.is_dir() {
        config.input.clone()
    } else {
        config.input.parent().map(Path::to_path_buf).unwrap_or_default()
    };

    let conflicts =
        find_output_conflicts(&image_files, &input_root, &config.output_dir, config.plan.jobs());

    let files = pool.install(|| {
        image_files
            .par_iter()
            .map(|source| {
                if let Some(err) = conflicts.get(source) {
                    warn!("❌ Skipping {:?}: {}", source, err);
                    progress.inc(1);
                    let mut report = FileReport::new(source);
                    report.error = Some(err.to_string());
                    return report;
                }

                let output_dir = output_dir_for(source, &input_root, &config.output_dir);
                let report = process_file(source, &output_dir, &jobs, &config.options, cancel);
                progress.inc(1);
                report
            })
            .collect::<Vec<_>>()
    });

    progress.finish_and_clear();

    Ok(BatchReport {
        files,
        elapsed: start_time.elapsed(),
    })
}

/// Applies `jobs` to one source image. The source is decoded once and shared
/// by all its jobs, which run in parallel and fail independently.
pub fn process_file(
    source: &Path,
    output_dir: &Path,
    jobs: &[PreparedJob],
    options: &ExecutionOptions,
    cancel: &CancelToken,
) -> FileReport {
    let mut report = FileReport::new(source);

    let planned: Vec<(&PreparedJob, Result<PathBuf>)> = jobs
        .iter()
        .map(|job| (job, job.job.output_path(source, output_dir)))
        .collect();

    let needs_decode = !cancel.is_cancelled()
        && planned
            .iter()
            .any(|(_, path)| matches!(path, Ok(p) if options.overwrite || !p.exists()));

    let image = if needs_decode {
        if let Err(e) = fs::create_dir_all(output_dir) {
            warn!("❌ Cannot create {:?}: {}", output_dir, e);
            report.error = Some(
                BatchError::WriteFailure {
                    path: output_dir.to_path_buf(),
                    source: e,
                }
                .to_string(),
            );
            return report;
        }

        match load_image(source) {
            Ok((img, size)) => {
                report.source_bytes = size;
                Some(Arc::new(img))
            }
            Err(e) => {
                warn!("❌ Failed to process {:?}: {}", source, e);
                report.error = Some(e.to_string());
                return report;
            }
        }
    } else {
        None
    };

    report.operations = planned
        .into_par_iter()
        .map(|(job, output)| execute_job(source, image.as_ref(), job, output, options, cancel))
        .collect();

    report
}

fn execute_job(
    source: &Path,
    image: Option<&Arc<DynamicImage>>,
    job: &PreparedJob,
    output: Result<PathBuf>,
    options: &ExecutionOptions,
    cancel: &CancelToken,
) -> OperationReport {
    let label = job.job.label();

    let output = match output {
        Ok(path) => path,
        Err(e) => {
            warn!("❌ {:?}: {}: {}", source, label, e);
            return OperationReport {
                job: label,
                output: PathBuf::new(),
                outcome: Outcome::failed(&e),
            };
        }
    };

    let outcome = if !options.overwrite && output.exists() {
        debug!("⏭️  {:?} already exists", output);
        Outcome::SkippedExisting
    } else if cancel.is_cancelled() {
        debug!("⏹️  {:?}: {} not started", source, label);
        Outcome::failed(&BatchError::Cancelled)
    } else {
        let result = match image {
            Some(img) => render_with_timeout(Arc::clone(img), job.clone(), options.timeout)
                .and_then(|bytes| write_output(&output, &bytes)),
            None => Err(BatchError::UnsupportedOperation(
                "source image was not decoded".to_string(),
            )),
        };

        match result {
            Ok(bytes) => {
                info!("✅ {:?}: {} -> {:?}", source, label, output);
                Outcome::Written { bytes }
            }
            Err(e) => {
                warn!("❌ {:?}: {}: {}", source, label, e);
                Outcome::failed(&e)
            }
        }
    };

    OperationReport {
        job: label,
        output,
        outcome,
    }
}
