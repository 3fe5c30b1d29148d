use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use imageproc::rect::Rect;

use crate::contrast_crop::pipeline::{PipelineParams, process_image};
use crate::error::{BatchError, FileError};

/// Selects which directory entries are treated as images.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtensionFilter {
    /// Every file whose extension names a format the `image` crate knows
    #[default]
    AnyImage,
    /// Only files with one of these extensions, compared case-insensitively
    Extensions(Vec<String>),
}

impl ExtensionFilter {
    /// Build a filter from a list of extensions; an empty list accepts any image.
    ///
    /// Leading dots are ignored, so `".jpg"` and `"jpg"` are equivalent.
    #[must_use]
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if extensions.is_empty() {
            Self::AnyImage
        } else {
            Self::Extensions(extensions)
        }
    }

    /// Whether `path` passes the filter. Only the file name is inspected.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        match self {
            Self::AnyImage => ImageFormat::from_extension(extension).is_some(),
            Self::Extensions(allowed) => allowed
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(extension)),
        }
    }
}

/// Where a batch reads from and writes to, and how it behaves.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchConfig {
    /// Directory scanned for images; subdirectories are not descended
    pub input_dir: PathBuf,
    /// Directory crops are written to, created when missing
    pub output_dir: PathBuf,
    pub filter: ExtensionFilter,
    pub params: PipelineParams,
    /// Directory for `<file name>_clahe.png` and `<file name>_mask.png`, when set
    pub debug_dir: Option<PathBuf>,
    /// Stop at the first failing file instead of skipping it
    pub fail_fast: bool,
}

impl BatchConfig {
    /// A configuration with the fixed pipeline parameters and skip-on-failure behaviour.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            filter: ExtensionFilter::default(),
            params: PipelineParams::default(),
            debug_dir: None,
            fail_fast: false,
        }
    }
}

/// Position and size of a written crop within its source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<Rect> for CropBox {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.left().max(0) as u32,
            y: rect.top().max(0) as u32,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

/// A file that produced a crop.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub crop: CropBox,
}

/// A file that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailedFile {
    pub input: PathBuf,
    pub error: String,
}

/// Per-file outcomes of a batch, in processing order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchReport {
    pub processed: Vec<ProcessedFile>,
    pub failed: Vec<FailedFile>,
}

impl BatchReport {
    /// Whether every selected file produced a crop.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Lists the files of `dir` accepted by `filter`, sorted by file name.
///
/// # Errors
///
/// * `BatchError::ReadDir` - When the directory or one of its entries cannot be read
pub fn collect_inputs(dir: &Path, filter: &ExtensionFilter) -> Result<Vec<PathBuf>, BatchError> {
    let read_dir_error = |source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.path();
        if path.is_file() && filter.matches(&path) {
            inputs.push(path);
        }
    }
    inputs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(inputs)
}

/// Runs the pipeline on one file and writes its crop under the same file name.
///
/// Debug artifacts, when enabled, are written after the crop into an existing
/// `debug_dir`.
///
/// # Errors
///
/// * `FileError::Decode` - When the file cannot be read as an image
/// * `FileError::Pipeline` - When no crop can be derived from the image
/// * `FileError::Encode` - When the crop or a debug artifact cannot be written
pub fn process_file(input: &Path, config: &BatchConfig) -> Result<ProcessedFile, FileError> {
    let original = image::open(input)
        .map_err(|source| FileError::Decode {
            path: input.to_path_buf(),
            source,
        })?
        .into_rgb8();

    let output = process_image(&original, &config.params).map_err(|source| {
        FileError::Pipeline {
            path: input.to_path_buf(),
            source,
        }
    })?;

    let file_name = input.file_name().unwrap_or(input.as_os_str());
    let output_path = config.output_dir.join(file_name);
    save_impl(&output.crop, &output_path)?;

    if let Some(debug_dir) = &config.debug_dir {
        let name = file_name.to_string_lossy();
        let clahe_path = debug_dir.join(format!("{name}_clahe.png"));
        save_impl(&output.enhanced, &clahe_path)?;
        let mask_path = debug_dir.join(format!("{name}_mask.png"));
        save_impl(&output.annotated_mask(), &mask_path)?;
    }

    Ok(ProcessedFile {
        input: input.to_path_buf(),
        output: output_path,
        crop: output.crop_rect.into(),
    })
}

fn save_impl<P>(image: &imageproc::definitions::Image<P>, path: &Path) -> Result<(), FileError>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    image.save(path).map_err(|source| FileError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir_impl(dir: &Path) -> Result<(), BatchError> {
    fs::create_dir_all(dir).map_err(|source| BatchError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Processes every selected file of `config.input_dir`, one at a time.
///
/// Files are visited in file-name order. A failing file is logged and recorded in
/// the report, then the batch moves on; with `fail_fast` the first failure ends the
/// batch instead. Crops already written stay on disk either way.
///
/// # Errors
///
/// * `BatchError::ReadDir` - When the input directory cannot be listed
/// * `BatchError::CreateDir` - When the output or debug directory cannot be created
/// * `BatchError::Aborted` - When `fail_fast` is set and a file fails
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    let inputs = collect_inputs(&config.input_dir, &config.filter)?;
    create_dir_impl(&config.output_dir)?;
    if let Some(debug_dir) = &config.debug_dir {
        create_dir_impl(debug_dir)?;
    }

    tracing::info!(
        count = inputs.len(),
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        "starting batch"
    );

    let mut report = BatchReport::default();
    for input in inputs {
        match process_file(&input, config) {
            Ok(processed) => {
                tracing::info!(
                    input = %processed.input.display(),
                    x = processed.crop.x,
                    y = processed.crop.y,
                    width = processed.crop.width,
                    height = processed.crop.height,
                    "cropped"
                );
                report.processed.push(processed);
            }
            Err(error) if config.fail_fast => {
                tracing::error!(%error, "aborting batch");
                return Err(BatchError::Aborted(Box::new(error)));
            }
            Err(error) => {
                tracing::warn!(%error, "skipping file");
                report.failed.push(FailedFile {
                    input: error.path().to_path_buf(),
                    error: error.to_string(),
                });
            }
        }
    }

    tracing::info!(
        processed = report.processed.len(),
        failed = report.failed.len(),
        "batch finished"
    );
    Ok(report)
}
