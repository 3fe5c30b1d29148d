use image::{ImageBuffer, Pixel};
use imageproc::definitions::{Clamp, Image};
use itertools::iproduct;

use crate::error::BilateralFilterError;
use crate::utils::{reflect_101, validate_non_empty_image};

/// Default neighbourhood diameter.
pub const DEFAULT_DIAMETER: u32 = 35;

/// Default sigma in the colour domain.
pub const DEFAULT_SIGMA_COLOR: f32 = 75.0;

/// Default sigma in the coordinate domain.
pub const DEFAULT_SIGMA_SPACE: f32 = 75.0;

/// Bilateral filter.
///
/// Every output pixel is a weighted mean over a disc of diameter `diameter`. The
/// weight of a neighbour is the product of a Gaussian of its distance to the centre
/// (`sigma_space`) and a Gaussian of the L1 colour difference summed over all
/// channels (`sigma_color`). Flat regions are blurred, strong edges survive.
/// Borders are handled by reflect-101 extension.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BilateralFilter {
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
}

impl Default for BilateralFilter {
    fn default() -> Self {
        Self {
            diameter: DEFAULT_DIAMETER,
            sigma_color: DEFAULT_SIGMA_COLOR,
            sigma_space: DEFAULT_SIGMA_SPACE,
        }
    }
}

impl BilateralFilter {
    /// Create a new bilateral filter.
    ///
    /// # Errors
    ///
    /// * `BilateralFilterError::InvalidDiameter` - When `diameter` is zero
    /// * `BilateralFilterError::InvalidSigma` - When a sigma is not a finite positive value
    pub fn new(
        diameter: u32,
        sigma_color: f32,
        sigma_space: f32,
    ) -> Result<Self, BilateralFilterError> {
        if diameter == 0 {
            return Err(BilateralFilterError::InvalidDiameter { diameter });
        }
        for (name, value) in [("color", sigma_color), ("space", sigma_space)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BilateralFilterError::InvalidSigma { name, value });
            }
        }
        Ok(Self {
            diameter,
            sigma_color,
            sigma_space,
        })
    }

    /// Radius of the support disc.
    #[inline]
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.diameter / 2
    }

    /// Filter an image with up to four 8-bit channels.
    ///
    /// # Errors
    ///
    /// * `BilateralFilterError::EmptyImage` - When the image has a zero dimension
    pub fn apply<P>(&self, image: &Image<P>) -> Result<Image<P>, BilateralFilterError>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (width, height) = image.dimensions();
        validate_non_empty_image(width, height)
            .map_err(|(width, height)| BilateralFilterError::EmptyImage { width, height })?;

        let channels = usize::from(P::CHANNEL_COUNT);
        let radius = self.radius();
        let padded = pad_reflect_impl(image, radius);
        let padded_width = padded.width() as usize;
        let samples = padded.as_raw();

        let kernel = self.kernel_impl(padded_width, channels);
        let color_weights = self.color_weights_impl(channels);
        let radius = radius as usize;

        let output = ImageBuffer::from_fn(width, height, |x, y| {
            let center = ((y as usize + radius) * padded_width + x as usize + radius) * channels;
            let center_pixel = &samples[center..center + channels];

            let mut sums = [0.0f32; 4];
            let mut weight_sum = 0.0f32;
            for &(offset, space_weight) in &kernel {
                let index = center.wrapping_add_signed(offset);
                let neighbour = &samples[index..index + channels];
                let distance: usize = neighbour
                    .iter()
                    .zip(center_pixel)
                    .map(|(&a, &b)| usize::from(a.abs_diff(b)))
                    .sum();
                let weight = space_weight * color_weights[distance];
                for (sum, &value) in sums.iter_mut().zip(neighbour) {
                    *sum += weight * f32::from(value);
                }
                weight_sum += weight;
            }

            let mut pixel = [0u8; 4];
            for (out, sum) in pixel.iter_mut().zip(sums).take(channels) {
                *out = round_sample_impl(sum / weight_sum);
            }
            *P::from_slice(&pixel[..channels])
        });

        Ok(output)
    }

    /// Raw-buffer offsets of the disc's sample positions with their spatial weights.
    fn kernel_impl(&self, padded_width: usize, channels: usize) -> Vec<(isize, f32)> {
        let radius = i64::from(self.radius());
        let space_coeff = -0.5 / (self.sigma_space * self.sigma_space);
        let row_stride = (padded_width * channels) as isize;

        iproduct!(-radius..=radius, -radius..=radius)
            .filter_map(|(dy, dx)| {
                let r = ((dx * dx + dy * dy) as f64).sqrt();
                if r > radius as f64 {
                    return None;
                }
                let offset = dy as isize * row_stride + dx as isize * channels as isize;
                let weight = ((r * r) as f32 * space_coeff).exp();
                Some((offset, weight))
            })
            .collect()
    }

    /// Colour weight for every possible L1 distance between two pixels.
    fn color_weights_impl(&self, channels: usize) -> Vec<f32> {
        let color_coeff = -0.5 / (self.sigma_color * self.sigma_color);
        (0..=255 * channels)
            .map(|distance| {
                let distance = distance as f32;
                (distance * distance * color_coeff).exp()
            })
            .collect()
    }
}

/// Rounds half to even and saturates, as OpenCV's `cvRound` does.
#[inline]
fn round_sample_impl(value: f32) -> u8 {
    <u8 as Clamp<f32>>::clamp(value.round_ties_even())
}

/// Pads the image on every side by `padding` pixels with reflect-101 borders.
fn pad_reflect_impl<P>(image: &Image<P>, padding: u32) -> Image<P>
where
    P: Pixel,
{
    let (width, height) = image.dimensions();
    let offset = i64::from(padding);
    ImageBuffer::from_fn(width + 2 * padding, height + 2 * padding, |x, y| {
        *image.get_pixel(
            reflect_101(i64::from(x) - offset, width),
            reflect_101(i64::from(y) - offset, height),
        )
    })
}

/// Extension trait for `ImageBuffer` to provide fluent bilateral filtering.
pub trait BilateralFilterExt {
    /// Apply a bilateral filter.
    ///
    /// This consumes the original image.
    ///
    /// # Errors
    ///
    /// * `BilateralFilterError::InvalidDiameter` - When `diameter` is zero
    /// * `BilateralFilterError::InvalidSigma` - When a sigma is not a finite positive value
    /// * `BilateralFilterError::EmptyImage` - When the image has a zero dimension
    ///
    /// # Examples
    /// ```
    /// use contrast_crop::{BilateralFilterExt, Image};
    /// use image::Rgb;
    ///
    /// let image: Image<Rgb<u8>> = Image::from_pixel(16, 16, Rgb([40, 80, 120]));
    /// let smoothed = image.bilateral_filter(5, 75.0, 75.0).unwrap();
    /// assert_eq!(smoothed.get_pixel(8, 8), &Rgb([40, 80, 120]));
    /// ```
    fn bilateral_filter(
        self,
        diameter: u32,
        sigma_color: f32,
        sigma_space: f32,
    ) -> Result<Self, BilateralFilterError>
    where
        Self: Sized;
}

impl<P> BilateralFilterExt for Image<P>
where
    P: Pixel<Subpixel = u8>,
{
    fn bilateral_filter(
        self,
        diameter: u32,
        sigma_color: f32,
        sigma_space: f32,
    ) -> Result<Self, BilateralFilterError> {
        BilateralFilter::new(diameter, sigma_color, sigma_space)?.apply(&self)
    }
}
