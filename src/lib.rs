//! # contrast-crop
//!
//! Batch contrast enhancement and foreground cropping for directories of images.
//!
//! Each image goes through a fixed pipeline:
//!
//! - **Contrast Enhancement**: CLAHE on every colour channel independently
//! - **Edge-Preserving Smoothing**: Bilateral filter over the enhanced image
//! - **Foreground Extraction**: Saturating channel difference, median filter, Otsu
//!   threshold and morphological closing
//! - **Region Selection**: Largest external contour, its bounding box and a margin
//! - **Cropping**: The *original* pixels cut to the region, clamped to the image
//!
//! [`run_batch`] applies the pipeline to every image of a directory and writes the
//! crops under their original file names.
//!
//! ## Example Usage
//!
//! ```no_run
//! use contrast_crop::{BatchConfig, ExtensionFilter, run_batch};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = BatchConfig::new("photos", "crops");
//! config.filter = ExtensionFilter::from_extensions(["jpg"]);
//!
//! let report = run_batch(&config)?;
//! for failed in &report.failed {
//!     eprintln!("{}: {}", failed.input.display(), failed.error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The stages are also usable on their own:
//!
//! ```no_run
//! use contrast_crop::{BilateralFilterExt, ClaheExt, Image};
//! use image::Rgb;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let image: Image<Rgb<u8>> = Image::new(100, 100);
//! let smoothed = image.clahe(2.0, 8, 8)?.bilateral_filter(35, 75.0, 75.0)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde`: Enables serialization of parameters and batch reports
//! - `cli`: Builds the `contrast-crop` binary (enabled by default)

mod contrast_crop;
mod error;
mod utils;

#[cfg(test)]
mod test_utils;

pub use contrast_crop::batch::{
    BatchConfig, BatchReport, CropBox, ExtensionFilter, FailedFile, ProcessedFile,
    collect_inputs, process_file, run_batch,
};
pub use contrast_crop::bilateral::{
    BilateralFilter, BilateralFilterExt, DEFAULT_DIAMETER, DEFAULT_SIGMA_COLOR,
    DEFAULT_SIGMA_SPACE,
};
pub use contrast_crop::channels::{Channel, ChannelsExt, merge_channels, saturating_subtract};
pub use contrast_crop::clahe::{Clahe, ClaheExt, DEFAULT_CLIP_LIMIT, DEFAULT_TILE_GRID};
pub use contrast_crop::crop::{CropToRegionExt, clamp_to_image};
pub use contrast_crop::foreground::{
    FOREGROUND, ForegroundExtractor, ForegroundMask, binarize_otsu,
};
pub use contrast_crop::pipeline::{PipelineOutput, PipelineParams, process_image};
pub use contrast_crop::region::{
    DEFAULT_MARGIN, RegionSelector, Selection, bounding_rect, contour_area, expand_rect,
    external_contours, largest_contour,
};
pub use error::{
    BatchError, BilateralFilterError, ClaheError, CropError, FileError, ForegroundError,
    PipelineError, RegionError,
};

// Re-export imageproc::definitions::Image for convenience
pub use imageproc::definitions::Image;
