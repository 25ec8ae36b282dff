use glam::DVec3;

/// A point or direction in tree space. The z axis points up.
pub type Vector = DVec3;

/// Angle in degrees. Every angle parameter in this crate uses degrees.
pub type Degrees = f64;

/// Axis-aligned bounding box accumulated while a tree grows.
///
/// Starts out [`Bounds::EMPTY`] (inverted infinities) so the first
/// included point defines both corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vector,
    pub max: Vector,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grows the box so that it contains `p`.
    #[inline]
    pub fn include(&mut self, p: Vector) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grows the box so that it contains `other`.
    pub fn merge(&mut self, other: &Bounds) {
        if !other.is_empty() {
            self.include(other.min);
            self.include(other.max);
        }
    }

    /// Componentwise containment test with a tolerance on every face.
    pub fn contains(&self, p: Vector, tolerance: f64) -> bool {
        p.cmpge(self.min - Vector::splat(tolerance)).all()
            && p.cmple(self.max + Vector::splat(tolerance)).all()
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bounds_take_first_point_as_both_corners() {
        let mut b = Bounds::EMPTY;
        assert!(b.is_empty());

        b.include(Vector::new(1.0, -2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, Vector::new(1.0, -2.0, 3.0));
        assert_eq!(b.max, Vector::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn merge_ignores_empty_boxes() {
        let mut a = Bounds::EMPTY;
        a.include(Vector::ZERO);
        a.merge(&Bounds::EMPTY);
        assert_eq!(a.min, Vector::ZERO);
        assert_eq!(a.max, Vector::ZERO);

        let mut b = Bounds::EMPTY;
        b.include(Vector::new(2.0, 2.0, -1.0));
        a.merge(&b);
        assert_eq!(a.min, Vector::new(0.0, 0.0, -1.0));
        assert_eq!(a.max, Vector::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn contains_respects_tolerance() {
        let mut b = Bounds::EMPTY;
        b.include(Vector::ZERO);
        b.include(Vector::ONE);

        assert!(b.contains(Vector::splat(0.5), 0.0));
        assert!(!b.contains(Vector::new(1.001, 0.5, 0.5), 0.0));
        assert!(b.contains(Vector::new(1.001, 0.5, 0.5), 0.01));
    }
}
