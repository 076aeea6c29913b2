use crate::error::{BatchError, Result};
use crate::utils::{calculate_compression_ratio, format_file_size};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Written { bytes: u64 },
    SkippedExisting,
    Failed { kind: String, message: String },
    Cancelled,
}

impl Outcome {
    pub fn failed(err: &BatchError) -> Self {
        if matches!(err, BatchError::Cancelled) {
            return Outcome::Cancelled;
        }
        Outcome::Failed {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub job: String,
    pub output: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub source_bytes: u64,
    /// Set when the source could not be decoded; no operations ran.
    pub error: Option<String>,
    pub operations: Vec<OperationReport>,
}

impl FileReport {
    pub fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            source_bytes: 0,
            error: None,
            operations: Vec::new(),
        }
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SkippedExisting))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    pub fn written_bytes(&self) -> u64 {
        self.operations
            .iter()
            .map(|op| match op.outcome {
                Outcome::Written { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.operations.iter().filter(|op| pred(&op.outcome)).count()
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.files.iter().map(FileReport::written).sum()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().map(FileReport::skipped).sum()
    }

    /// Failed operations plus files that could not be decoded.
    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.failed() + usize::from(f.error.is_some()))
            .sum()
    }

    pub fn cancelled(&self) -> usize {
        self.files.iter().map(FileReport::cancelled).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.files.iter().all(FileReport::is_clean)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BatchError::InvalidConfig(format!("cannot serialise report: {}", e)))?;
        fs::write(path, json).map_err(|source| BatchError::WriteFailure {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn print_summary(&self) {
        let total_before: u64 = self.files.iter().map(|f| f.source_bytes).sum();
        let total_after: u64 = self.files.iter().map(FileReport::written_bytes).sum();

        println!("\n📊 Batch Summary:");
        println!("  📁 Files: {}", self.files.len());
        println!("  ✅ Outputs written: {}", self.written());
        if self.skipped() > 0 {
            println!("  ⏭️  Skipped (already present): {}", self.skipped());
        }
        println!(
            "  📦 Sources: {} -> outputs: {}",
            format_file_size(total_before),
            format_file_size(total_after)
        );
        if self.files.len() == 1 && total_before > 0 {
            println!(
                "  🎯 Size change: {:.1}%",
                -calculate_compression_ratio(total_before, total_after)
            );
        }
        println!("  ⏱️  Total time: {:.2?}", self.elapsed);

        for file in self.files.iter().filter(|f| !f.is_clean()) {
            println!("  ❌ {}", file.source.display());
            if let Some(err) = &file.error {
                println!("      {}", err);
            }
            for op in &file.operations {
                if let Outcome::Failed { message, .. } = &op.outcome {
                    println!("      {}: {}", op.job, message);
                }
            }
        }

        if self.failed() > 0 {
            println!("  ⚠️  Failed: {}", self.failed());
        }
        if self.cancelled() > 0 {
            println!("  ⚠️  Cancelled operations: {}", self.cancelled());
        }
    }
}
