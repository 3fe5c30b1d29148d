use image::{ImageBuffer, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::definitions::Image;
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::error::RegionError;

/// Default margin added around the selected bounding box, in pixels.
pub const DEFAULT_MARGIN: u32 = 10;

/// Selects the dominant foreground region of a binary mask.
///
/// Only external contours take part: holes, and islands nested inside holes, are
/// ignored. The contour enclosing the largest area wins; on a tie the first one
/// found in raster order is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionSelector {
    /// Pixels added on every side of the bounding box
    pub margin: u32,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
        }
    }
}

/// The outcome of region selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Area enclosed by the winning contour
    pub area: f64,
    /// Tight bounding box of the winning contour
    pub bounds: Rect,
    /// `bounds` grown by the margin; may extend past the image
    pub region: Rect,
}

impl RegionSelector {
    /// Select the largest external region of `mask`.
    ///
    /// # Errors
    ///
    /// * `RegionError::NoForeground` - When the mask has no foreground pixel
    pub fn select(&self, mask: &Image<Luma<u8>>) -> Result<Selection, RegionError> {
        let contours = external_contours(mask);
        tracing::debug!(count = contours.len(), "external contours found");

        let (contour, area) = largest_contour(&contours).ok_or(RegionError::NoForeground)?;
        let bounds = bounding_rect(&contour.points).ok_or(RegionError::NoForeground)?;

        Ok(Selection {
            area,
            bounds,
            region: expand_rect(bounds, self.margin),
        })
    }
}

/// Finds the outermost contours of a binary mask.
///
/// Any non-zero pixel counts as foreground. Pixels outside the mask count as
/// background, so regions touching the image border are found too.
#[must_use]
pub fn external_contours(mask: &Image<Luma<u8>>) -> Vec<Contour<i32>> {
    let (width, height) = mask.dimensions();
    let framed: Image<Luma<u8>> = ImageBuffer::from_fn(width + 2, height + 2, |x, y| {
        if x == 0 || y == 0 || x > width || y > height {
            Luma([0])
        } else {
            *mask.get_pixel(x - 1, y - 1)
        }
    });

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|contour| {
            matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
        })
        .map(|mut contour| {
            for point in &mut contour.points {
                point.x -= 1;
                point.y -= 1;
            }
            contour
        })
        .collect()
}

/// Area enclosed by a closed polygon (shoelace formula).
///
/// Degenerate contours (a single pixel, a one pixel wide line) have zero area.
#[must_use]
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Picks the contour with the largest enclosed area, keeping the first on ties.
#[must_use]
pub fn largest_contour(contours: &[Contour<i32>]) -> Option<(&Contour<i32>, f64)> {
    contours
        .iter()
        .map(|contour| (contour, contour_area(&contour.points)))
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
}

/// Axis-aligned bounding box of a set of points, inclusive of the extreme pixels.
#[must_use]
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some(Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}

/// Grows a rectangle by `margin` pixels on every side.
#[must_use]
pub fn expand_rect(rect: Rect, margin: u32) -> Rect {
    let offset = margin as i32;
    Rect::at(rect.left() - offset, rect.top() - offset)
        .of_size(rect.width() + 2 * margin, rect.height() + 2 * margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;

    fn mask_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> Image<Luma<u8>> {
        let mut mask = ImageBuffer::new(width, height);
        for &(x0, y0, w, h) in rects {
            iproduct!(y0..y0 + h, x0..x0 + w).for_each(|(y, x)| mask.put_pixel(x, y, Luma([255])));
        }
        mask
    }

    #[test]
    fn expand_rect_with_default_margin_grows_ten_pixels_per_side() {
        let rect = Rect::at(50, 50).of_size(20, 20);
        let region = expand_rect(rect, DEFAULT_MARGIN);

        assert_eq!((region.left(), region.top()), (40, 40));
        // exclusive end corner
        assert_eq!((region.right() + 1, region.bottom() + 1), (80, 80));
    }

    #[test]
    fn expand_rect_near_origin_allows_negative_corner() {
        let region = expand_rect(Rect::at(3, 0).of_size(5, 5), 10);
        assert_eq!((region.left(), region.top()), (-7, -10));
        assert_eq!((region.width(), region.height()), (25, 25));
    }

    #[test]
    fn select_with_square_mask_returns_square_bounds() {
        let mask = mask_with_rects(100, 100, &[(50, 50, 20, 20)]);
        let selection = RegionSelector::default().select(&mask).unwrap();

        assert_eq!(selection.bounds, Rect::at(50, 50).of_size(20, 20));
        assert_eq!(selection.region, Rect::at(40, 40).of_size(40, 40));
        assert!((selection.area - 19.0 * 19.0).abs() < 1e-9);
    }

    #[test]
    fn select_with_two_objects_picks_larger() {
        let mask = mask_with_rects(120, 80, &[(5, 5, 10, 10), (60, 20, 30, 40)]);
        let selection = RegionSelector { margin: 0 }.select(&mask).unwrap();
        assert_eq!(selection.bounds, Rect::at(60, 20).of_size(30, 40));
    }

    #[test]
    fn select_with_empty_mask_returns_no_foreground() {
        let mask = ImageBuffer::new(30, 30);
        assert!(matches!(
            RegionSelector::default().select(&mask),
            Err(RegionError::NoForeground)
        ));
    }

    #[test]
    fn select_with_mask_touching_left_edge_returns_region() {
        let mask = mask_with_rects(40, 30, &[(0, 0, 10, 30)]);
        let selection = RegionSelector { margin: 0 }.select(&mask).unwrap();

        assert_eq!(selection.bounds, Rect::at(0, 0).of_size(10, 30));
        assert!((selection.area - 9.0 * 29.0).abs() < 1e-9);
    }

    #[test]
    fn select_with_full_mask_returns_whole_image() {
        let mask = mask_with_rects(30, 30, &[(0, 0, 30, 30)]);
        let selection = RegionSelector::default().select(&mask).unwrap();

        assert_eq!(selection.bounds, Rect::at(0, 0).of_size(30, 30));
        assert_eq!(selection.region, Rect::at(-10, -10).of_size(50, 50));
    }

    #[test]
    fn select_with_holed_full_mask_returns_whole_image() {
        let mut mask = mask_with_rects(30, 30, &[(0, 0, 30, 30)]);
        iproduct!(10..20, 10..20).for_each(|(y, x)| mask.put_pixel(x, y, Luma([0])));

        let selection = RegionSelector { margin: 0 }.select(&mask).unwrap();
        assert_eq!(selection.bounds, Rect::at(0, 0).of_size(30, 30));
    }

    #[test]
    fn external_contours_with_edge_object_keeps_later_objects() {
        let mask = mask_with_rects(60, 40, &[(0, 5, 12, 20), (40, 10, 8, 8)]);
        let contours = external_contours(&mask);

        let mut bounds: Vec<Rect> = contours
            .iter()
            .filter_map(|contour| bounding_rect(&contour.points))
            .collect();
        bounds.sort_by_key(Rect::left);
        assert_eq!(
            bounds,
            vec![
                Rect::at(0, 5).of_size(12, 20),
                Rect::at(40, 10).of_size(8, 8)
            ]
        );
    }

    #[test]
    fn external_contours_with_nested_island_ignores_hole_and_island() {
        // ring 40x40 with a 20x20 hole containing a 6x6 island
        let mut mask = mask_with_rects(60, 60, &[(10, 10, 40, 40)]);
        iproduct!(20..40, 20..40).for_each(|(y, x)| mask.put_pixel(x, y, Luma([0])));
        iproduct!(27..33, 27..33).for_each(|(y, x)| mask.put_pixel(x, y, Luma([255])));

        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            bounding_rect(&contours[0].points),
            Some(Rect::at(10, 10).of_size(40, 40))
        );
    }

    #[test]
    fn contour_area_with_square_polygon_returns_area() {
        let points = [
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 3),
            Point::new(0, 3),
        ];
        assert!((contour_area(&points) - 12.0).abs() < 1e-9);
        assert!(contour_area(&points[..2]).abs() < 1e-9);
    }

    #[test]
    fn largest_contour_with_equal_areas_keeps_first() {
        let mask = mask_with_rects(60, 30, &[(5, 5, 10, 10), (35, 5, 10, 10)]);
        let contours = external_contours(&mask);
        let (winner, _) = largest_contour(&contours).unwrap();
        assert_eq!(
            bounding_rect(&winner.points),
            Some(Rect::at(5, 5).of_size(10, 10))
        );
    }

    #[test]
    fn bounding_rect_with_single_point_has_unit_size() {
        let rect = bounding_rect(&[Point::new(7, 9)]).unwrap();
        assert_eq!(rect, Rect::at(7, 9).of_size(1, 1));
        assert!(bounding_rect(&[]).is_none());
    }
}
