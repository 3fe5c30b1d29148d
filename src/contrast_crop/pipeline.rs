use image::{Luma, Rgb};
use imageproc::definitions::Image;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::contrast_crop::bilateral::BilateralFilter;
use crate::contrast_crop::clahe::Clahe;
use crate::contrast_crop::crop::CropToRegionExt;
use crate::contrast_crop::foreground::{FOREGROUND, ForegroundExtractor, ForegroundMask};
use crate::contrast_crop::region::{RegionSelector, Selection};
use crate::error::PipelineError;

/// Thickness of the region outline drawn on annotated masks.
const OUTLINE_THICKNESS: i32 = 4;

/// Parameters of every pipeline stage.
///
/// `Default` gives the fixed parameter set: CLAHE with clip limit 2.0 on 8x8
/// tiles, a bilateral filter of diameter 35 with both sigmas at 75, Blue minus
/// Green subtraction with a 3x3 median and 5x5 closing, and a 10 pixel margin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineParams {
    pub clahe: Clahe,
    pub bilateral: BilateralFilter,
    pub foreground: ForegroundExtractor,
    pub region: RegionSelector,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The original image cut to the clamped region
    pub crop: Image<Rgb<u8>>,
    /// The clamped rectangle `crop` was cut from
    pub crop_rect: Rect,
    /// Contour selection before clamping
    pub selection: Selection,
    /// The contrast-enhanced image
    pub enhanced: Image<Rgb<u8>>,
    /// The closed foreground mask and its threshold
    pub foreground: ForegroundMask,
}

impl PipelineOutput {
    /// The foreground mask with the expanded region outlined on it.
    #[must_use]
    pub fn annotated_mask(&self) -> Image<Luma<u8>> {
        let mut canvas = self.foreground.mask.clone();
        let region = self.selection.region;
        for grow in (1 - OUTLINE_THICKNESS / 2)..=(OUTLINE_THICKNESS / 2) {
            let width = region.width() as i32 + 2 * grow;
            let height = region.height() as i32 + 2 * grow;
            if width <= 0 || height <= 0 {
                continue;
            }
            let outline = Rect::at(region.left() - grow, region.top() - grow)
                .of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut canvas, outline, Luma([FOREGROUND]));
        }
        canvas
    }
}

/// Runs every stage on one image and crops the original to the detected object.
///
/// Stages: per-channel CLAHE, bilateral smoothing, channel-difference foreground
/// mask, largest external contour, margin, clamp, crop. `original` is never
/// modified, and the crop is cut from it rather than from an intermediate.
///
/// # Errors
///
/// * `PipelineError::Region` - When the mask has no foreground (for example a solid image)
/// * `PipelineError::Crop` - When the region lies outside the image
/// * Stage errors for empty images or invalid parameters
///
/// # Examples
/// ```
/// use contrast_crop::{Image, PipelineParams, process_image};
/// use image::Rgb;
///
/// let mut image: Image<Rgb<u8>> = Image::from_pixel(80, 60, Rgb([128, 128, 128]));
/// for y in 20..40 {
///     for x in 30..50 {
///         image.put_pixel(x, y, Rgb([20, 20, 220]));
///     }
/// }
/// let output = process_image(&image, &PipelineParams::default()).unwrap();
/// assert!(output.crop.width() <= 80 && output.crop.height() <= 60);
/// ```
pub fn process_image(
    original: &Image<Rgb<u8>>,
    params: &PipelineParams,
) -> Result<PipelineOutput, PipelineError> {
    let enhanced = params.clahe.apply_rgb(original)?;
    let smoothed = params.bilateral.apply(&enhanced)?;
    let foreground = params.foreground.extract(&smoothed)?;
    let selection = params.region.select(&foreground.mask)?;
    let (crop, crop_rect) = original.crop_to_region(selection.region)?;

    tracing::debug!(
        area = selection.area,
        x = crop_rect.left(),
        y = crop_rect.top(),
        width = crop_rect.width(),
        height = crop_rect.height(),
        "region selected"
    );

    Ok(PipelineOutput {
        crop,
        crop_rect,
        selection,
        enhanced,
        foreground,
    })
}
