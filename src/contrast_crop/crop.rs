use image::{GenericImageView, Pixel};
use imageproc::definitions::Image;
use imageproc::rect::Rect;

use crate::error::CropError;

/// Clamps a region to the bounds of a `width` x `height` image.
///
/// # Errors
///
/// * `CropError::OutsideImage` - When the region and the image do not overlap
pub fn clamp_to_image(region: Rect, width: u32, height: u32) -> Result<Rect, CropError> {
    let outside = || CropError::OutsideImage {
        x: region.left(),
        y: region.top(),
        width: region.width(),
        height: region.height(),
        image_width: width,
        image_height: height,
    };
    if width == 0 || height == 0 {
        return Err(outside());
    }
    region
        .intersect(Rect::at(0, 0).of_size(width, height))
        .ok_or_else(outside)
}

/// Trait for cropping an image to a region that may reach past its borders.
pub trait CropToRegionExt<P: Pixel> {
    /// Crops the image to `region` after clamping it to the image bounds.
    ///
    /// The image is borrowed and left untouched, so a region found on a processed
    /// copy can be cut from the original pixels.
    ///
    /// # Returns
    ///
    /// The cropped image and the clamped rectangle it was cut from
    ///
    /// # Errors
    ///
    /// * `CropError::OutsideImage` - When the region and the image do not overlap
    ///
    /// # Examples
    /// ```
    /// use contrast_crop::{CropToRegionExt, Image};
    /// use image::Rgb;
    /// use imageproc::rect::Rect;
    ///
    /// let image: Image<Rgb<u8>> = Image::new(50, 50);
    /// let (crop, rect) = image.crop_to_region(Rect::at(-5, 40).of_size(20, 20)).unwrap();
    /// assert_eq!(crop.dimensions(), (15, 10));
    /// assert_eq!((rect.left(), rect.top()), (0, 40));
    /// ```
    fn crop_to_region(&self, region: Rect) -> Result<(Image<P>, Rect), CropError>;
}

impl<P> CropToRegionExt<P> for Image<P>
where
    P: Pixel + 'static,
{
    fn crop_to_region(&self, region: Rect) -> Result<(Image<P>, Rect), CropError> {
        let (width, height) = self.dimensions();
        let clamped = clamp_to_image(region, width, height)?;
        let crop = self
            .view(
                clamped.left() as u32,
                clamped.top() as u32,
                clamped.width(),
                clamped.height(),
            )
            .to_image();
        Ok((crop, clamped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    use crate::test_utils::gradient_rgb;

    #[test]
    fn clamp_to_image_with_inner_region_returns_region() {
        let region = Rect::at(40, 40).of_size(40, 40);
        assert_eq!(clamp_to_image(region, 100, 100).unwrap(), region);
    }

    #[test]
    fn clamp_to_image_with_overhanging_region_trims_each_side() {
        let clamped = clamp_to_image(Rect::at(-10, -3).of_size(130, 50), 100, 40).unwrap();
        assert_eq!(clamped, Rect::at(0, 0).of_size(100, 40));
    }

    #[test]
    fn clamp_to_image_with_disjoint_region_returns_error() {
        let result = clamp_to_image(Rect::at(120, 5).of_size(10, 10), 100, 100);
        assert!(matches!(
            result,
            Err(CropError::OutsideImage {
                x: 120,
                y: 5,
                image_width: 100,
                ..
            })
        ));
    }

    #[test]
    fn crop_to_region_with_original_image_copies_original_pixels() {
        let image = gradient_rgb(64, 48);
        let (crop, rect) = image
            .crop_to_region(Rect::at(10, 5).of_size(20, 30))
            .unwrap();

        assert_eq!(crop.dimensions(), (20, 30));
        assert_eq!(rect, Rect::at(10, 5).of_size(20, 30));
        for (x, y, pixel) in crop.enumerate_pixels() {
            assert_eq!(pixel, image.get_pixel(x + 10, y + 5));
        }
    }

    #[test]
    fn crop_to_region_with_edge_region_is_clamped() {
        let image: Image<Rgb<u8>> = Image::new(30, 20);
        let (crop, _) = image
            .crop_to_region(Rect::at(20, 10).of_size(40, 40))
            .unwrap();
        assert_eq!(crop.dimensions(), (10, 10));
    }
}
