//! Internal utility functions for contrast-crop.
//!
//! This module contains border handling and validation shared by the filters.

/// Maps a possibly out-of-range coordinate into `0..len` by mirroring around the
/// edge pixels without repeating them (`gfedcb|abcdefgh|gfedcba`).
///
/// # Arguments
///
/// * `index` - The coordinate to map, may be negative or past the end
/// * `len` - The length of the axis, must be non-zero
///
/// # Returns
///
/// A coordinate within `0..len`
#[inline]
pub fn reflect_101(index: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = index.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as u32
}

/// Validates that an image has non-zero dimensions.
///
/// # Arguments
///
/// * `width` - The width of the image
/// * `height` - The height of the image
///
/// # Returns
///
/// `Ok(())` if the dimensions are valid, otherwise the offending dimensions
pub fn validate_non_empty_image(width: u32, height: u32) -> Result<(), (u32, u32)> {
    if width == 0 || height == 0 {
        Err((width, height))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_101_with_in_range_index_returns_index() {
        assert_eq!(reflect_101(0, 5), 0);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(4, 5), 4);
    }

    #[test]
    fn reflect_101_with_out_of_range_index_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(-9, 5), 1);
    }

    #[test]
    fn reflect_101_with_single_pixel_axis_returns_zero() {
        assert_eq!(reflect_101(-3, 1), 0);
        assert_eq!(reflect_101(7, 1), 0);
    }

    #[test]
    fn validate_non_empty_image_with_valid_dimensions_accepts() {
        validate_non_empty_image(100, 100).unwrap();
        validate_non_empty_image(1, 1).unwrap();
        assert_eq!(validate_non_empty_image(0, 100), Err((0, 100)));
        assert_eq!(validate_non_empty_image(100, 0), Err((100, 0)));
    }
}
