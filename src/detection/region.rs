//! Region Extractor
//!
//! Groups target pixels of a refined mask into connected components and
//! turns them into [`DetectedRegion`]s.
//!
//! # Algorithm
//!
//! 1. Breadth-first flood fill over 8-connected neighbours
//! 2. Per component: pixel count, bounding box, centroid, boundary pixels
//! 3. Quality = fill ratio blended with boundary regularity
//! 4. Drop components outside `[min_area, max_area]`
//! 5. Sort by pixel count, largest first

use image::GrayImage;
use std::collections::VecDeque;

use super::cancel::CancellationToken;
use super::types::{DetectedRegion, Point, RegionRect, Result};

// ============================================================
// Constants
// ============================================================

/// Weight of the fill ratio in the quality score
const FILL_WEIGHT: f64 = 0.7;

/// Weight of boundary regularity in the quality score
const REGULARITY_WEIGHT: f64 = 0.3;

/// 8-connected neighbourhood
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

// ============================================================
// Component
// ============================================================

/// Accumulated statistics for one connected component
#[derive(Debug, Clone, Copy)]
struct Component {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixel_count: u32,
    sum_x: u64,
    sum_y: u64,
    boundary_pixels: u32,
}

impl Component {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixel_count: 0,
            sum_x: 0,
            sum_y: 0,
            boundary_pixels: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32, on_boundary: bool) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.pixel_count += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
        if on_boundary {
            self.boundary_pixels += 1;
        }
    }

    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn fill_ratio(&self) -> f64 {
        self.pixel_count as f64 / (self.width() as f64 * self.height() as f64)
    }

    /// Boundary pixels of a solid box of the same size over actual boundary pixels
    fn regularity(&self) -> f64 {
        let (w, h) = (self.width() as f64, self.height() as f64);
        let ideal = if w < 2.0 || h < 2.0 {
            w * h
        } else {
            2.0 * w + 2.0 * h - 4.0
        };
        if self.boundary_pixels == 0 {
            return 0.0;
        }
        (ideal / self.boundary_pixels as f64).min(1.0)
    }

    fn quality(&self) -> f64 {
        (FILL_WEIGHT * self.fill_ratio() + REGULARITY_WEIGHT * self.regularity()).clamp(0.0, 1.0)
    }

    fn into_region(self, image_area: f64) -> DetectedRegion {
        let bounding_box = RegionRect::new(self.min_x, self.min_y, self.width(), self.height());
        let count = self.pixel_count as f64;
        DetectedRegion {
            pixel_count: self.pixel_count,
            bounding_box,
            percentage: count / image_area * 100.0,
            centroid: Point {
                x: self.sum_x as f64 / count,
                y: self.sum_y as f64 / count,
            },
            aspect_ratio: bounding_box.aspect_ratio(),
            confidence: self.quality(),
        }
    }
}

// ============================================================
// Region Extractor
// ============================================================

/// Output of region extraction
#[derive(Debug, Clone)]
pub struct ExtractedRegions {
    /// Regions within the area limits, largest first
    pub regions: Vec<DetectedRegion>,

    /// Components found before area filtering
    pub raw_component_count: usize,
}

/// Connected-component region extractor
pub struct RegionExtractor;

impl RegionExtractor {
    /// Extract regions from a binary mask (non-zero = target)
    pub fn extract(mask: &GrayImage, min_area: u32, max_area: u32) -> Result<ExtractedRegions> {
        Self::extract_with_cancel(mask, min_area, max_area, &CancellationToken::none())
    }

    /// Extract regions, checking `cancel` between rows
    pub fn extract_with_cancel(
        mask: &GrayImage,
        min_area: u32,
        max_area: u32,
        cancel: &CancellationToken,
    ) -> Result<ExtractedRegions> {
        let (width, height) = mask.dimensions();
        let image_area = (width as f64 * height as f64).max(1.0);
        let components = Self::find_connected_components(mask, cancel)?;
        let raw_component_count = components.len();

        let mut regions: Vec<DetectedRegion> = components
            .into_iter()
            .filter(|c| c.pixel_count >= min_area && c.pixel_count <= max_area)
            .map(|c| c.into_region(image_area))
            .collect();

        regions.sort_by(|a, b| {
            b.pixel_count
                .cmp(&a.pixel_count)
                .then(a.bounding_box.y.cmp(&b.bounding_box.y))
                .then(a.bounding_box.x.cmp(&b.bounding_box.x))
        });

        Ok(ExtractedRegions {
            regions,
            raw_component_count,
        })
    }

    /// Find connected components using flood fill
    fn find_connected_components(
        mask: &GrayImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<Component>> {
        let (width, height) = mask.dimensions();
        let mut visited = vec![false; width as usize * height as usize];
        let mut components = Vec::new();

        for y in 0..height {
            cancel.check()?;
            for x in 0..width {
                let idx = y as usize * width as usize + x as usize;
                if !visited[idx] && mask.get_pixel(x, y).0[0] > 0 {
                    components.push(Self::flood_fill(mask, x, y, &mut visited));
                }
            }
        }

        Ok(components)
    }

    /// Flood-fill a single component starting at (start_x, start_y)
    fn flood_fill(mask: &GrayImage, start_x: u32, start_y: u32, visited: &mut [bool]) -> Component {
        let (width, height) = mask.dimensions();
        let mut component = Component::new(start_x, start_y);
        let mut queue = VecDeque::new();

        visited[start_y as usize * width as usize + start_x as usize] = true;
        queue.push_back((start_x, start_y));

        while let Some((x, y)) = queue.pop_front() {
            component.add(x, y, Self::is_boundary(mask, x, y));

            for (dx, dy) in &NEIGHBORS {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;

                if nx >= 0 && nx < width as i32 && ny >= 0 && ny < height as i32 {
                    let (nx, ny) = (nx as u32, ny as u32);
                    let idx = ny as usize * width as usize + nx as usize;

                    if !visited[idx] && mask.get_pixel(nx, ny).0[0] > 0 {
                        visited[idx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }

        component
    }

    /// A pixel is on the boundary when a 4-neighbour is off or outside the image
    fn is_boundary(mask: &GrayImage, x: u32, y: u32) -> bool {
        let (width, height) = mask.dimensions();
        if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
            return true;
        }
        mask.get_pixel(x - 1, y).0[0] == 0
            || mask.get_pixel(x + 1, y).0[0] == 0
            || mask.get_pixel(x, y - 1).0[0] == 0
            || mask.get_pixel(x, y + 1).0[0] == 0
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::color::MASK_ON;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
    }

    #[test]
    fn test_single_rectangle() {
        let mut mask = GrayImage::new(100, 80);
        fill(&mut mask, 10, 20, 30, 10);

        let extracted = RegionExtractor::extract(&mask, 1, u32::MAX).unwrap();
        assert_eq!(extracted.raw_component_count, 1);
        assert_eq!(extracted.regions.len(), 1);

        let region = &extracted.regions[0];
        assert_eq!(region.pixel_count, 300);
        assert_eq!(region.bounding_box, RegionRect::new(10, 20, 30, 10));
        assert!((region.centroid.x - 24.5).abs() < 1e-9);
        assert!((region.centroid.y - 24.5).abs() < 1e-9);
        assert!((region.aspect_ratio - 3.0).abs() < 1e-9);
        assert!((region.percentage - 3.75).abs() < 1e-9);
        assert!((region.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_descending_and_filtered() {
        let mut mask = GrayImage::new(100, 100);
        fill(&mut mask, 0, 0, 5, 5); // 25
        fill(&mut mask, 50, 50, 20, 20); // 400
        fill(&mut mask, 10, 60, 10, 10); // 100
        mask.put_pixel(90, 5, Luma([MASK_ON])); // 1

        let extracted = RegionExtractor::extract(&mask, 20, 1000).unwrap();
        assert_eq!(extracted.raw_component_count, 4);
        let counts: Vec<u32> = extracted.regions.iter().map(|r| r.pixel_count).collect();
        assert_eq!(counts, vec![400, 100, 25]);

        let extracted = RegionExtractor::extract(&mask, 26, 399).unwrap();
        let counts: Vec<u32> = extracted.regions.iter().map(|r| r.pixel_count).collect();
        assert_eq!(counts, vec![100]);
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mut mask = GrayImage::new(10, 10);
        for i in 0..5 {
            mask.put_pixel(i, i, Luma([MASK_ON]));
        }
        let extracted = RegionExtractor::extract(&mask, 1, 100).unwrap();
        assert_eq!(extracted.regions.len(), 1);
        assert_eq!(extracted.regions[0].pixel_count, 5);
        // Sparse diagonal: poor fill
        assert!(extracted.regions[0].confidence < 0.6);
    }

    #[test]
    fn test_empty_mask() {
        let mask = GrayImage::new(30, 30);
        let extracted = RegionExtractor::extract(&mask, 1, 100).unwrap();
        assert!(extracted.regions.is_empty());
        assert_eq!(extracted.raw_component_count, 0);
    }

    #[test]
    fn test_ring_has_lower_quality_than_solid() {
        let mut solid = GrayImage::new(50, 50);
        fill(&mut solid, 10, 10, 20, 20);

        let mut ring = solid.clone();
        for y in 15..25 {
            for x in 15..25 {
                ring.put_pixel(x, y, Luma([0]));
            }
        }

        let solid_q = RegionExtractor::extract(&solid, 1, 10_000).unwrap().regions[0].confidence;
        let ring_q = RegionExtractor::extract(&ring, 1, 10_000).unwrap().regions[0].confidence;
        assert!(ring_q < solid_q);
    }

    #[test]
    fn test_pixel_count_within_bbox_area() {
        let mut mask = GrayImage::new(40, 40);
        fill(&mut mask, 5, 5, 10, 3);
        fill(&mut mask, 5, 8, 3, 10);
        let region = &RegionExtractor::extract(&mask, 1, 10_000).unwrap().regions[0];
        assert!(region.pixel_count as u64 <= region.bounding_box.area());
        assert!(region.bounding_box.fits_within(40, 40));
    }
}
