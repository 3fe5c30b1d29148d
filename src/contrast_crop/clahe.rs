use image::{ImageBuffer, Luma, Rgb};
use imageproc::definitions::{Clamp, Image};
use itertools::iproduct;

use crate::contrast_crop::channels::{ChannelsExt, merge_channels};
use crate::error::ClaheError;
use crate::utils::{reflect_101, validate_non_empty_image};

const HIST_SIZE: usize = 256;

/// Default clip limit, relative to a uniform histogram.
pub const DEFAULT_CLIP_LIMIT: f32 = 2.0;

/// Default number of tiles along each axis.
pub const DEFAULT_TILE_GRID: u32 = 8;

/// Contrast-Limited Adaptive Histogram Equalization (CLAHE).
///
/// The image is divided into a grid of tiles. Each tile's histogram is clipped at
/// `clip_limit` times the uniform bin height, the excess is redistributed over all
/// bins, and the cumulative histogram becomes that tile's lookup table. Output
/// pixels are bilinearly interpolated between the lookup tables of the four
/// nearest tile centres, which hides the tile seams.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clahe {
    clip_limit: f32,
    tiles_x: u32,
    tiles_y: u32,
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: DEFAULT_CLIP_LIMIT,
            tiles_x: DEFAULT_TILE_GRID,
            tiles_y: DEFAULT_TILE_GRID,
        }
    }
}

impl Clahe {
    /// Create a new CLAHE operator.
    ///
    /// A clip limit of `0.0` disables clipping (plain adaptive equalization).
    ///
    /// # Errors
    ///
    /// * `ClaheError::InvalidClipLimit` - When `clip_limit` is negative or not finite
    /// * `ClaheError::InvalidTileGrid` - When either tile count is zero
    pub fn new(clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Result<Self, ClaheError> {
        if !clip_limit.is_finite() || clip_limit < 0.0 {
            return Err(ClaheError::InvalidClipLimit { clip_limit });
        }
        if tiles_x == 0 || tiles_y == 0 {
            return Err(ClaheError::InvalidTileGrid { tiles_x, tiles_y });
        }
        Ok(Self {
            clip_limit,
            tiles_x,
            tiles_y,
        })
    }

    #[inline]
    #[must_use]
    pub const fn clip_limit(&self) -> f32 {
        self.clip_limit
    }

    /// Tile grid as `(tiles_x, tiles_y)`.
    #[inline]
    #[must_use]
    pub const fn tile_grid(&self) -> (u32, u32) {
        (self.tiles_x, self.tiles_y)
    }

    /// Equalize a single-channel image.
    ///
    /// # Errors
    ///
    /// * `ClaheError::EmptyImage` - When the image has a zero dimension
    pub fn apply(&self, image: &Image<Luma<u8>>) -> Result<Image<Luma<u8>>, ClaheError> {
        let (width, height) = image.dimensions();
        validate_non_empty_image(width, height)
            .map_err(|(width, height)| ClaheError::EmptyImage { width, height })?;

        let source = self.lut_source_impl(image);
        let tile_width = source.width() / self.tiles_x;
        let tile_height = source.height() / self.tiles_y;
        let tile_area = tile_width * tile_height;

        let lut_scale = (HIST_SIZE - 1) as f32 / tile_area as f32;
        let clip_limit = if self.clip_limit > 0.0 {
            ((self.clip_limit * tile_area as f32 / HIST_SIZE as f32) as u32).max(1)
        } else {
            0
        };

        let luts: Vec<[u8; HIST_SIZE]> = iproduct!(0..self.tiles_y, 0..self.tiles_x)
            .map(|(tile_y, tile_x)| {
                let mut hist = tile_histogram_impl(
                    &source,
                    tile_x * tile_width,
                    tile_y * tile_height,
                    tile_width,
                    tile_height,
                );
                if clip_limit > 0 {
                    clip_histogram_impl(&mut hist, clip_limit);
                }
                cumulative_lut_impl(&hist, lut_scale)
            })
            .collect();

        Ok(self.interpolate_impl(image, &luts, tile_width, tile_height))
    }

    /// Equalize each channel of an RGB image independently.
    ///
    /// # Errors
    ///
    /// * `ClaheError::EmptyImage` - When the image has a zero dimension
    pub fn apply_rgb(&self, image: &Image<Rgb<u8>>) -> Result<Image<Rgb<u8>>, ClaheError> {
        let [red, green, blue] = image.split_channels();
        let planes = [self.apply(&red)?, self.apply(&green)?, self.apply(&blue)?];
        let (width, height) = image.dimensions();
        merge_channels(&planes).ok_or(ClaheError::EmptyImage { width, height })
    }

    /// Returns the image the tile histograms are computed from.
    ///
    /// When the dimensions are not multiples of the tile grid the image is extended
    /// with reflect-101 borders on the right and bottom; each axis is extended by
    /// `tiles - len % tiles`, so an axis that already divides evenly still grows by
    /// one pixel per tile whenever the other axis does not.
    fn lut_source_impl(&self, image: &Image<Luma<u8>>) -> Image<Luma<u8>> {
        let (width, height) = image.dimensions();
        if width % self.tiles_x == 0 && height % self.tiles_y == 0 {
            return image.clone();
        }

        let padded_width = width + self.tiles_x - width % self.tiles_x;
        let padded_height = height + self.tiles_y - height % self.tiles_y;
        ImageBuffer::from_fn(padded_width, padded_height, |x, y| {
            *image.get_pixel(
                reflect_101(i64::from(x), width),
                reflect_101(i64::from(y), height),
            )
        })
    }

    fn interpolate_impl(
        &self,
        image: &Image<Luma<u8>>,
        luts: &[[u8; HIST_SIZE]],
        tile_width: u32,
        tile_height: u32,
    ) -> Image<Luma<u8>> {
        let (width, height) = image.dimensions();
        let columns: Vec<TileBlend> = (0..width)
            .map(|x| TileBlend::new(x, tile_width, self.tiles_x))
            .collect();
        let rows: Vec<TileBlend> = (0..height)
            .map(|y| TileBlend::new(y, tile_height, self.tiles_y))
            .collect();
        let stride = self.tiles_x as usize;

        ImageBuffer::from_fn(width, height, |x, y| {
            let column = &columns[x as usize];
            let row = &rows[y as usize];
            let value = usize::from(image.get_pixel(x, y)[0]);

            let top_left = f32::from(luts[row.low * stride + column.low][value]);
            let top_right = f32::from(luts[row.low * stride + column.high][value]);
            let bottom_left = f32::from(luts[row.high * stride + column.low][value]);
            let bottom_right = f32::from(luts[row.high * stride + column.high][value]);

            let top = top_left.mul_add(1.0 - column.weight, top_right * column.weight);
            let bottom = bottom_left.mul_add(1.0 - column.weight, bottom_right * column.weight);
            let blended = top.mul_add(1.0 - row.weight, bottom * row.weight);

            Luma([<u8 as Clamp<f32>>::clamp(blended.round_ties_even())])
        })
    }
}

/// The two neighbouring tile indices of a coordinate and the weight of the higher one.
#[derive(Debug, Clone, Copy)]
struct TileBlend {
    low: usize,
    high: usize,
    weight: f32,
}

impl TileBlend {
    fn new(coordinate: u32, tile_size: u32, tiles: u32) -> Self {
        let position = coordinate as f32 / tile_size as f32 - 0.5;
        let low = position.floor();
        let weight = position - low;
        let low = low as i64;
        let last = i64::from(tiles) - 1;
        Self {
            low: low.clamp(0, last) as usize,
            high: (low + 1).clamp(0, last) as usize,
            weight,
        }
    }
}

fn tile_histogram_impl(
    source: &Image<Luma<u8>>,
    x0: u32,
    y0: u32,
    tile_width: u32,
    tile_height: u32,
) -> [u32; HIST_SIZE] {
    let mut hist = [0u32; HIST_SIZE];
    iproduct!(y0..y0 + tile_height, x0..x0 + tile_width).for_each(|(y, x)| {
        hist[usize::from(source.get_pixel(x, y)[0])] += 1;
    });
    hist
}

/// Clips every bin at `clip_limit` and spreads the excess back over the histogram.
fn clip_histogram_impl(hist: &mut [u32; HIST_SIZE], clip_limit: u32) {
    let mut clipped = 0usize;
    for bin in hist.iter_mut() {
        if *bin > clip_limit {
            clipped += (*bin - clip_limit) as usize;
            *bin = clip_limit;
        }
    }

    let batch = clipped / HIST_SIZE;
    let mut residual = clipped - batch * HIST_SIZE;
    for bin in hist.iter_mut() {
        *bin += batch as u32;
    }

    if residual != 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

fn cumulative_lut_impl(hist: &[u32; HIST_SIZE], lut_scale: f32) -> [u8; HIST_SIZE] {
    let mut lut = [0u8; HIST_SIZE];
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = <u8 as Clamp<f32>>::clamp((sum as f32 * lut_scale).round_ties_even());
    }
    lut
}

/// Extension trait providing CLAHE on grayscale and RGB images.
///
/// Colour images are equalized one channel at a time; the channels never
/// influence each other.
pub trait ClaheExt {
    /// Apply CLAHE with the given clip limit and tile grid.
    ///
    /// This consumes the original image.
    ///
    /// # Errors
    ///
    /// * `ClaheError::InvalidClipLimit` - When `clip_limit` is negative or not finite
    /// * `ClaheError::InvalidTileGrid` - When either tile count is zero
    /// * `ClaheError::EmptyImage` - When the image has a zero dimension
    ///
    /// # Examples
    /// ```
    /// use contrast_crop::{ClaheExt, Image};
    /// use image::Rgb;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let image: Image<Rgb<u8>> = Image::from_fn(64, 64, |x, y| Rgb([x as u8, y as u8, 128]));
    /// let equalized = image.clahe(2.0, 8, 8)?;
    /// assert_eq!(equalized.dimensions(), (64, 64));
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    fn clahe(self, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Result<Self, ClaheError>
    where
        Self: Sized;
}

impl ClaheExt for Image<Luma<u8>> {
    fn clahe(self, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Result<Self, ClaheError> {
        Clahe::new(clip_limit, tiles_x, tiles_y)?.apply(&self)
    }
}

impl ClaheExt for Image<Rgb<u8>> {
    fn clahe(self, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Result<Self, ClaheError> {
        Clahe::new(clip_limit, tiles_x, tiles_y)?.apply_rgb(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::gradient_rgb;

    #[test]
    fn new_with_negative_clip_limit_returns_error() {
        assert!(matches!(
            Clahe::new(-1.0, 8, 8),
            Err(ClaheError::InvalidClipLimit { .. })
        ));
        assert!(matches!(
            Clahe::new(f32::NAN, 8, 8),
            Err(ClaheError::InvalidClipLimit { .. })
        ));
    }

    #[test]
    fn new_with_zero_tiles_returns_error() {
        assert!(matches!(
            Clahe::new(2.0, 0, 8),
            Err(ClaheError::InvalidTileGrid {
                tiles_x: 0,
                tiles_y: 8
            })
        ));
    }

    #[test]
    fn default_with_no_arguments_uses_fixed_parameters() {
        let clahe = Clahe::default();
        assert!((clahe.clip_limit() - 2.0).abs() < f32::EPSILON);
        assert_eq!(clahe.tile_grid(), (8, 8));
    }

    #[test]
    fn apply_with_empty_image_returns_error() {
        let image: Image<Luma<u8>> = ImageBuffer::new(0, 4);
        assert!(matches!(
            Clahe::default().apply(&image),
            Err(ClaheError::EmptyImage {
                width: 0,
                height: 4
            })
        ));
    }

    #[test]
    fn clahe_with_rgb_image_keeps_three_channels_and_dimensions() {
        let image = gradient_rgb(37, 23);
        let result = image.clahe(2.0, 8, 8).unwrap();
        assert_eq!(result.dimensions(), (37, 23));
        assert_eq!(result.as_raw().len(), 37 * 23 * 3);
    }

    #[test]
    fn clahe_with_low_contrast_image_stretches_range() {
        let image = ImageBuffer::from_fn(64, 64, |x, _| Luma([100 + (x / 8) as u8]));
        let result = image.clahe(0.0, 1, 1).unwrap();

        let min = result.pixels().map(|p| p[0]).min().unwrap();
        let max = result.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 200, "range {min}..{max} was not stretched");
    }

    #[test]
    fn clahe_with_solid_image_produces_solid_output() {
        let image = ImageBuffer::from_pixel(40, 40, Luma([90u8]));
        let result = image.clahe(2.0, 8, 8).unwrap();
        let first = result.get_pixel(0, 0)[0];
        assert!(result.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn clahe_with_rgb_image_processes_channels_independently() {
        let image = gradient_rgb(32, 32);
        let result = image.clone().clahe(2.0, 4, 4).unwrap();

        let [red, _, _] = image.split_channels();
        let red_alone = red.clahe(2.0, 4, 4).unwrap();
        let [red_result, _, _] = result.split_channels();
        assert_eq!(red_alone, red_result);
    }

    #[test]
    fn clip_histogram_impl_with_peak_preserves_total_count() {
        let mut hist = [0u32; HIST_SIZE];
        hist[10] = 1000;
        hist[20] = 24;
        clip_histogram_impl(&mut hist, 8);

        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist.iter().all(|&bin| bin <= 8 + 4));
    }

    #[test]
    fn cumulative_lut_impl_with_uniform_histogram_is_identity() {
        let hist = [1u32; HIST_SIZE];
        let lut = cumulative_lut_impl(&hist, 255.0 / 256.0);
        assert_eq!(lut[255], 255);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn tile_blend_with_first_pixel_clamps_to_first_tile() {
        let blend = TileBlend::new(0, 8, 4);
        assert_eq!((blend.low, blend.high), (0, 0));

        let blend = TileBlend::new(31, 8, 4);
        assert_eq!((blend.low, blend.high), (3, 3));

        let blend = TileBlend::new(12, 8, 4);
        assert_eq!((blend.low, blend.high), (1, 2));
        assert!((blend.weight - 0.0).abs() < 1e-6);
    }
}
