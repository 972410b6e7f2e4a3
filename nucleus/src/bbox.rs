//! Axis-aligned bounding box for pixel regions.

/// Bounding box with inclusive `usize` pixel bounds.
///
/// A pixel at (x, y) is inside if `x_min <= x <= x_max` and
/// `y_min <= y <= y_max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aabb {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl Aabb {
    #[inline]
    pub const fn new(x_min: usize, x_max: usize, y_min: usize, y_max: usize) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Inverted box that any `include` call overwrites.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            x_min: usize::MAX,
            x_max: 0,
            y_min: usize::MAX,
            y_max: 0,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    #[inline]
    pub fn include(&mut self, x: usize, y: usize) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.x_max.saturating_sub(self.x_min) + 1
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.y_max.saturating_sub(self.y_min) + 1
    }

    #[inline]
    pub const fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// True when the box touches the frame of a `width × height` image.
    #[inline]
    pub const fn touches_border(&self, width: usize, height: usize) -> bool {
        self.x_min == 0 || self.y_min == 0 || self.x_max + 1 >= width || self.y_max + 1 >= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_from_empty() {
        let mut bbox = Aabb::empty();
        assert!(bbox.is_empty());

        bbox.include(5, 3);
        assert_eq!(bbox, Aabb::new(5, 5, 3, 3));
        assert!(!bbox.is_empty());

        bbox.include(2, 7);
        assert_eq!(bbox, Aabb::new(2, 5, 3, 7));
        assert_eq!(bbox.width(), 4);
        assert_eq!(bbox.height(), 5);
        assert!(bbox.contains(3, 4));
        assert!(!bbox.contains(6, 4));
    }

    #[test]
    fn test_touches_border() {
        assert!(Aabb::new(0, 3, 4, 5).touches_border(10, 10));
        assert!(Aabb::new(2, 9, 4, 5).touches_border(10, 10));
        assert!(Aabb::new(2, 3, 4, 9).touches_border(10, 10));
        assert!(!Aabb::new(1, 8, 1, 8).touches_border(10, 10));
    }
}
