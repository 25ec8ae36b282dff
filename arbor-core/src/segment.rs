//! Segments and their subsegments.
//!
//! A [`Segment`] is one fixed-length slice of a stem. When it is grown it
//! samples its [`SegmentShape`] into an ordered list of [`Subsegment`]s, each
//! a world-space point on the stem axis with the stem radius at that point.

use std::f64::consts::PI;

use crate::{
    frame::Frame,
    level::SegmentShape,
    stem::RadiusProfile,
    types::{Degrees, Vector},
};

/// One sampled cross-section location on a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Subsegment {
    /// World-space position on the stem axis.
    pub position: Vector,
    pub radius: f64,
    /// Distance from the segment base along the segment.
    pub distance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    index: usize,
    frame: Frame,
    length: f64,
    base_radius: f64,
    top_radius: f64,
    shape: SegmentShape,
    subsegments: Vec<Subsegment>,
}

impl Segment {
    /// Builds segment `index` of a stem at `frame` and samples its
    /// subsegments.
    ///
    /// ### Parameters
    /// - `index` - Position of the segment within its stem. Clones keep the
    ///   numbering of the stem they were split from.
    /// - `frame` - Frame at the segment base; the segment extends along its
    ///   local Z axis.
    /// - `length` - Segment length (the stem's segment length).
    /// - `shape` - Sampling policy chosen by the level for this index.
    /// - `profile` - Radius function of the owning stem.
    pub fn grow(
        index: usize,
        frame: Frame,
        length: f64,
        shape: SegmentShape,
        profile: &RadiusProfile,
    ) -> Self {
        let start = index as f64 * length;
        let mut segment = Self {
            index,
            frame,
            length,
            base_radius: profile.radius_at(start),
            top_radius: profile.radius_at(start + length),
            shape,
            subsegments: Vec::with_capacity(shape.sample_count()),
        };

        let cnt = shape.sample_count();
        match shape {
            SegmentShape::Helical { pitch } => {
                let rad = helix_radius(pitch, length);
                for i in 1..=cnt {
                    let pos = i as f64 * length / cnt as f64;
                    let local = helix_offset(rad, length, i, cnt);
                    segment.subsegments.push(Subsegment {
                        position: frame.apply(local),
                        radius: profile.radius_at(start + pos),
                        distance: pos,
                    });
                }
            }
            SegmentShape::SphericalEnd => {
                for i in 1..cnt {
                    let pos = length - length / 2f64.powi(i as i32);
                    segment.push_on_axis(pos, profile);
                }
                segment.subsegments.push(Subsegment {
                    position: segment.upper_position(),
                    radius: segment.top_radius,
                    distance: length,
                });
            }
            SegmentShape::Flare => {
                for i in (0..cnt).rev() {
                    let pos = length / 2f64.powi(i as i32);
                    segment.push_on_axis(pos, profile);
                }
            }
            SegmentShape::PeriodicTaper | SegmentShape::Straight => {
                for i in 1..=cnt {
                    let pos = i as f64 * length / cnt as f64;
                    segment.push_on_axis(pos, profile);
                }
            }
        }
        segment
    }

    fn push_on_axis(&mut self, pos: f64, profile: &RadiusProfile) {
        self.subsegments.push(Subsegment {
            position: self.frame.origin() + self.frame.z() * pos,
            radius: profile.radius_at(self.index as f64 * self.length + pos),
            distance: pos,
        });
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn base_radius(&self) -> f64 {
        self.base_radius
    }

    pub fn top_radius(&self) -> f64 {
        self.top_radius
    }

    pub fn shape(&self) -> SegmentShape {
        self.shape
    }

    pub fn subsegments(&self) -> &[Subsegment] {
        &self.subsegments
    }

    pub fn lower_position(&self) -> Vector {
        self.frame.origin()
    }

    /// End of the segment on its nominal axis. Helical segments return to
    /// this point after their full turn.
    pub fn upper_position(&self) -> Vector {
        self.frame.origin() + self.frame.z() * self.length
    }

    /// Frame of a subsegment: the segment orientation moved to the
    /// subsegment position.
    pub fn subsegment_frame(&self, sub: &Subsegment) -> Frame {
        self.frame.translate_world(sub.position - self.lower_position())
    }

    /// Places a child frame at relative position `fraction` (0 = base,
    /// 1 = top) along this segment.
    ///
    /// `direction` carries the child's orientation and sits at the segment
    /// base. Helical segments interpolate between the bracketing
    /// subsegments because their samples leave the nominal axis.
    pub fn substem_position(&self, direction: Frame, fraction: f64) -> Frame {
        match self.shape {
            SegmentShape::Helical { .. } if self.subsegments.len() >= 2 => {
                let last = self.subsegments.len() - 1;
                let t = (fraction * last as f64).clamp(0.0, last as f64);
                let i = (t.floor() as usize).min(last - 1);
                let p1 = self.subsegments[i].position;
                let p2 = self.subsegments[i + 1].position;
                let pos = p1.lerp(p2, t - i as f64);
                direction.translate_world(pos - self.lower_position())
            }
            _ => direction.translate_world(self.frame.z() * (fraction * self.length)),
        }
    }
}

/// Radius of a helix whose tangent encloses `pitch` degrees with its axis
/// and which completes one turn over `length`.
pub fn helix_radius(pitch: Degrees, length: f64) -> f64 {
    let cos = pitch.to_radians().cos();
    (1.0 / (cos * cos) - 1.0).max(0.0).sqrt() * length / (2.0 * PI)
}

/// Local offset of helix sample `i` of `cnt`. The helix starts and ends on
/// the segment axis.
fn helix_offset(rad: f64, length: f64, i: usize, cnt: usize) -> Vector {
    let angle = 2.0 * PI * i as f64 / cnt as f64;
    Vector::new(
        rad * angle.cos() - rad,
        rad * angle.sin(),
        i as f64 * length / cnt as f64,
    )
}
