use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during contrast-limited adaptive histogram equalization.
#[derive(Debug, Error)]
pub enum ClaheError {
    /// Image has zero width or height.
    #[error("Image must be non-empty, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// Tile grid has a zero dimension.
    #[error("Tile grid must have at least one tile per axis, got {tiles_x}x{tiles_y}")]
    InvalidTileGrid { tiles_x: u32, tiles_y: u32 },

    /// Clip limit is negative or not finite.
    #[error("Clip limit must be a finite non-negative value, got {clip_limit}")]
    InvalidClipLimit { clip_limit: f32 },
}

/// Errors that can occur during bilateral filtering.
#[derive(Debug, Error)]
pub enum BilateralFilterError {
    /// Image has zero width or height.
    #[error("Image must be non-empty, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// Neighbourhood diameter is zero.
    #[error("Diameter must be positive, got {diameter}")]
    InvalidDiameter { diameter: u32 },

    /// A sigma is zero, negative or not finite.
    #[error("Sigma {name} must be a finite positive value, got {value}")]
    InvalidSigma { name: &'static str, value: f32 },
}

/// Errors that can occur while extracting the foreground mask.
#[derive(Debug, Error)]
pub enum ForegroundError {
    /// Image has zero width or height.
    #[error("Image must be non-empty, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// Both subtraction operands name the same channel.
    #[error("Subtraction requires two distinct channels, got {channel:?} twice")]
    SameChannel { channel: crate::Channel },
}

/// Errors that can occur while selecting the foreground region.
#[derive(Debug, Error)]
pub enum RegionError {
    /// The mask contains no external contour.
    #[error("No foreground contour found in mask")]
    NoForeground,
}

/// Errors that can occur while cropping.
#[derive(Debug, Error)]
pub enum CropError {
    /// The region does not overlap the image at all.
    #[error(
        "Region ({x}, {y}, {width}x{height}) lies outside the {image_width}x{image_height} image"
    )]
    OutsideImage {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}

/// Errors from any stage of the single-image pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Clahe(#[from] ClaheError),

    #[error(transparent)]
    BilateralFilter(#[from] BilateralFilterError),

    #[error(transparent)]
    Foreground(#[from] ForegroundError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Crop(#[from] CropError),
}

/// Failure to process one file of a batch.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file could not be read or decoded as an image.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image went through the pipeline without producing a crop.
    #[error("Failed to process {path}: {source}")]
    Pipeline {
        path: PathBuf,
        #[source]
        source: PipelineError,
    },

    /// The crop or a debug artifact could not be written.
    #[error("Failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl FileError {
    /// The path the failure refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Decode { path, .. } | Self::Pipeline { path, .. } | Self::Encode { path, .. } => {
                path
            }
        }
    }
}

/// Errors that stop a whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input directory could not be listed.
    #[error("Failed to read input directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An output or debug directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file failed while the batch was configured to stop on the first failure.
    #[error("Batch aborted: {0}")]
    Aborted(#[source] Box<FileError>),
}
