use image::{Luma, Rgb};
use imageproc::contrast::otsu_level;
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::map::map_colors;
use imageproc::morphology::close;

use crate::contrast_crop::channels::{Channel, ChannelsExt, saturating_subtract};
use crate::error::ForegroundError;
use crate::utils::validate_non_empty_image;

/// Value of foreground pixels in a mask.
pub const FOREGROUND: u8 = 255;

/// Derives a binary foreground mask from a colour image.
///
/// The mask is built from the saturating difference of two channels, which
/// highlights objects whose colour is dominated by `minuend`. The difference is
/// median filtered, binarized at Otsu's threshold, and morphologically closed with
/// a square structuring element so nearby fragments merge into one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForegroundExtractor {
    /// Channel subtracted from
    pub minuend: Channel,
    /// Channel subtracted
    pub subtrahend: Channel,
    /// Median filter radius (1 gives a 3x3 window)
    pub median_radius: u32,
    /// Closing radius under the L-infinity norm (2 gives a 5x5 square)
    pub closing_radius: u8,
}

impl Default for ForegroundExtractor {
    fn default() -> Self {
        Self {
            minuend: Channel::Blue,
            subtrahend: Channel::Green,
            median_radius: 1,
            closing_radius: 2,
        }
    }
}

/// Intermediate results of foreground extraction.
#[derive(Debug, Clone)]
pub struct ForegroundMask {
    /// Threshold picked by Otsu's method
    pub level: u8,
    /// Closed binary mask, 0 or [`FOREGROUND`]
    pub mask: Image<Luma<u8>>,
}

impl ForegroundExtractor {
    /// Extract the foreground mask of an image.
    ///
    /// # Errors
    ///
    /// * `ForegroundError::EmptyImage` - When the image has a zero dimension
    /// * `ForegroundError::SameChannel` - When both operands name the same channel
    pub fn extract(&self, image: &Image<Rgb<u8>>) -> Result<ForegroundMask, ForegroundError> {
        let (width, height) = image.dimensions();
        validate_non_empty_image(width, height)
            .map_err(|(width, height)| ForegroundError::EmptyImage { width, height })?;
        if self.minuend == self.subtrahend {
            return Err(ForegroundError::SameChannel {
                channel: self.minuend,
            });
        }

        let difference = saturating_subtract(
            &image.channel(self.minuend),
            &image.channel(self.subtrahend),
        );
        let denoised = median_filter(&difference, self.median_radius, self.median_radius);
        let (level, binary) = binarize_otsu(&denoised);
        let mask = close(&binary, Norm::LInf, self.closing_radius);

        tracing::debug!(level, "foreground mask thresholded");
        Ok(ForegroundMask { level, mask })
    }
}

/// Binarizes a grayscale image at Otsu's threshold.
///
/// Pixels strictly above the threshold become [`FOREGROUND`], all others 0.
///
/// # Returns
///
/// The selected threshold and the binary image
#[must_use]
pub fn binarize_otsu(image: &Image<Luma<u8>>) -> (u8, Image<Luma<u8>>) {
    let level = otsu_level(image);
    let binary = map_colors(image, |Luma([value])| {
        Luma([if value > level { FOREGROUND } else { 0 }])
    });
    (level, binary)
}
