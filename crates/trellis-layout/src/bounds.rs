//! Solved view frames.

use glam::DVec2;

/// Axis-aligned frame of a solved view.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create bounds with position and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create bounds from position and size vectors.
    pub fn from_vecs(position: DVec2, size: DVec2) -> Self {
        Self::new(position.x, position.y, size.x, size.y)
    }

    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    /// Get the right edge (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom edge (y + height).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the bounds.
    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Compute union (bounding box) with another bounds.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Bounds::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Round every edge to the nearest multiple of `step` (device pixels).
    pub fn snapped(&self, step: f64) -> Bounds {
        if step <= 0.0 {
            return *self;
        }
        let snap = |v: f64| (v / step).round() * step;
        let (x, y) = (snap(self.x), snap(self.y));
        Bounds::new(x, y, snap(self.right()) - x, snap(self.bottom()) - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let b = Bounds::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(b.right(), 40.0);
        assert_eq!(b.bottom(), 60.0);
        assert_eq!(b.center(), DVec2::new(25.0, 40.0));
        assert_eq!(Bounds::from_vecs(b.position(), b.size()), b);
    }

    #[test]
    fn test_contains() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains(DVec2::new(10.0, 5.0)));
        assert!(!b.contains(DVec2::new(10.5, 5.0)));
    }

    #[test]
    fn test_union() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, -5.0, 10.0, 10.0);
        assert_eq!(a.union(&b), Bounds::new(0.0, -5.0, 15.0, 15.0));
    }

    #[test]
    fn test_snapped() {
        let b = Bounds::new(0.4, 1.6, 10.2, 3.3).snapped(1.0);
        assert_eq!(b, Bounds::new(0.0, 2.0, 11.0, 3.0));
        assert_eq!(b.snapped(0.0), b);
    }
}
