pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 150;
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 150;
pub const THUMBNAIL_SUFFIX: &str = "-thumbnail";
pub const COMPRESSED_SUFFIX: &str = "-compressed";

pub const DEFAULT_WATERMARK_WIDTH: u32 = 100;
pub const DEFAULT_WATERMARK_HEIGHT: u32 = 100;

pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

pub const AVIF_SPEED: u8 = 6;
/// libwebp rejects larger sides.
pub const WEBP_MAX_DIMENSION: u32 = 16383;
pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const OXIPNG_PRESET: u8 = 4;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
