//! Synthetic images shared by the unit tests.

use image::Rgb;
use imageproc::definitions::Image;
use itertools::iproduct;

/// Background colour of the synthetic scenes; its blue and green channels are equal.
pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Colour of the synthetic objects; blue clearly dominates green.
pub const BLUE: Rgb<u8> = Rgb([20, 20, 220]);

pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> Image<Rgb<u8>> {
    Image::from_pixel(width, height, Rgb(color))
}

/// A smooth, non-uniform image exercising every channel.
pub fn gradient_rgb(width: u32, height: u32) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) * 127 / (width + height).max(1)) as u8,
        ])
    })
}

/// A gray scene with one blue rectangle `(x, y, width, height)`.
pub fn blue_square_on_gray(
    width: u32,
    height: u32,
    (x0, y0, w, h): (u32, u32, u32, u32),
) -> Image<Rgb<u8>> {
    let mut image = Image::from_pixel(width, height, GRAY);
    iproduct!(y0..y0 + h, x0..x0 + w).for_each(|(y, x)| image.put_pixel(x, y, BLUE));
    image
}
