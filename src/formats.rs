/// Image format utilities and type-safe format handling
///
/// Output formats are a closed enum; everything that turns a user-supplied
/// string into a format goes through `FromStr` so the error messages stay
/// consistent between the CLI and plan files.
use crate::error::{BatchError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Supported output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum OutputFormat {
    /// JPEG format with lossy compression
    Jpeg,
    /// PNG format with lossless compression
    Png,
    /// WebP format with lossy compression
    WebP,
    /// AVIF format (AV1 still image)
    Avif,
}

impl OutputFormat {
    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// Formats in the same family as the accepted inputs. Re-encoding to one
    /// of these is a compression pass rather than a conversion.
    pub fn is_input_family(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Png)
    }

    pub fn all_formats() -> Vec<OutputFormat> {
        vec![
            OutputFormat::Jpeg,
            OutputFormat::Png,
            OutputFormat::WebP,
            OutputFormat::Avif,
        ]
    }

    /// Names accepted on the command line and in plan files.
    pub fn format_names() -> Vec<&'static str> {
        vec!["jpeg", "png", "webp", "avif"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
            OutputFormat::Avif => "AVIF",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "heic" | "heif" | "jxl" | "jpegxl" => Err(BatchError::UnsupportedFormat(format!(
                "{} format is not supported. Use AVIF for modern compression",
                s
            ))),
            _ => Err(BatchError::UnsupportedFormat(format!(
                "{} (expected one of: {})",
                s,
                OutputFormat::format_names().join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = BatchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}
