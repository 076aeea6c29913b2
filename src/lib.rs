pub mod batch;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod constants;
pub mod encode;
pub mod error;
pub mod formats;
pub mod job;
pub mod logger;
pub mod processing;
pub mod report;
pub mod utils;
pub mod watermark;

pub use batch::{collect_image_files, process_file, run_batch};
pub use cancel::CancelToken;
pub use config::{BatchConfig, ExecutionOptions, PlanFile};
pub use encode::encode;
pub use error::{BatchError, Result};
pub use formats::OutputFormat;
pub use job::{Dimensions, EncodeSpec, JobPlan, Operation, Quality, TransformJob};
pub use processing::{apply_operation, load_image, write_output};
pub use report::{BatchReport, FileReport, Outcome};
