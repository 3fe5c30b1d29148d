use image::{Luma, Rgb};
use imageproc::definitions::Image;
use imageproc::map::{map_colors, map_colors2};

/// A colour component of an RGB image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Channel {
    /// First component
    Red,
    /// Second component
    Green,
    /// Third component
    Blue,
}

impl Channel {
    /// All channels in storage order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Index of the channel within an `Rgb` pixel.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// Trait for splitting and recombining the channels of RGB images.
pub trait ChannelsExt {
    /// Extracts a single channel as a grayscale image.
    ///
    /// # Examples
    /// ```
    /// use contrast_crop::{Channel, ChannelsExt, Image};
    /// use image::Rgb;
    ///
    /// let image: Image<Rgb<u8>> = Image::from_pixel(4, 4, Rgb([10, 20, 30]));
    /// let green = image.channel(Channel::Green);
    /// assert_eq!(green.get_pixel(0, 0)[0], 20);
    /// ```
    fn channel(&self, channel: Channel) -> Image<Luma<u8>>;

    /// Splits the image into its red, green and blue planes.
    fn split_channels(&self) -> [Image<Luma<u8>>; 3] {
        Channel::ALL.map(|channel| self.channel(channel))
    }
}

impl ChannelsExt for Image<Rgb<u8>> {
    fn channel(&self, channel: Channel) -> Image<Luma<u8>> {
        let index = channel.index();
        map_colors(self, |pixel| Luma([pixel[index]]))
    }
}

/// Recombines three equally sized planes into an RGB image.
///
/// Returns `None` when the planes differ in size.
#[must_use]
pub fn merge_channels(planes: &[Image<Luma<u8>>; 3]) -> Option<Image<Rgb<u8>>> {
    let [red, green, blue] = planes;
    let dimensions = red.dimensions();
    if green.dimensions() != dimensions || blue.dimensions() != dimensions {
        return None;
    }

    let red_green = map_colors2(red, green, |Luma([r]), Luma([g])| Rgb([r, g, 0]));
    Some(map_colors2(&red_green, blue, |Rgb([r, g, _]), Luma([b])| {
        Rgb([r, g, b])
    }))
}

/// Pixel-wise `minuend - subtrahend`, saturating at zero.
///
/// # Panics
///
/// Panics if the planes differ in size.
#[must_use]
pub fn saturating_subtract(
    minuend: &Image<Luma<u8>>,
    subtrahend: &Image<Luma<u8>>,
) -> Image<Luma<u8>> {
    map_colors2(minuend, subtrahend, |Luma([a]), Luma([b])| {
        Luma([a.saturating_sub(b)])
    })
}
