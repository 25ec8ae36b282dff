//! Stems: the woody parts of a tree.
//!
//! A [`Stem`] owns its segments, its child stems (substems and clones in
//! creation order) and its leaves. Stems are produced by the growth engine
//! in [`crate::growth`] and are read-only afterwards.

use crate::{
    frame::Frame,
    leaf::Leaf,
    section::{RingParams, StemSection},
    segment::Segment,
    types::{Bounds, Vector},
};

/// Radius of a stem as a function of the distance from its base.
///
/// One profile is shared by every segment, subsegment and child attachment
/// of a stem, and clones copy it from their source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusProfile {
    pub base_radius: f64,
    pub length: f64,
    /// `nTaper` of the stem's level.
    pub taper: f64,
    /// `Flare` for trunks, `0.0` for every other level.
    pub flare: f64,
}

impl RadiusProfile {
    /// Radius at distance `h` from the stem base.
    pub fn radius_at(&self, h: f64) -> f64 {
        if self.length <= 0.0 {
            return self.base_radius;
        }
        let z = (h / self.length).min(1.0);
        let taper = self.taper;

        let unit_taper = if taper <= 1.0 {
            taper
        } else if taper <= 2.0 {
            2.0 - taper
        } else {
            0.0
        };
        let mut radius = self.base_radius * (1.0 - unit_taper * z);

        if taper > 1.0 {
            let z2 = (1.0 - z) * self.length;
            let depth = if taper < 2.0 || z2 < radius {
                1.0
            } else {
                taper - 2.0
            };
            let z3 = if taper < 2.0 {
                z2
            } else {
                (z2 - 2.0 * radius * (z2 / 2.0 / radius + 0.5).trunc()).abs()
            };
            if taper > 2.0 || z3 < radius {
                let cap = (radius * radius - (z3 - radius) * (z3 - radius)).max(0.0);
                radius = (1.0 - depth) * radius + depth * cap.sqrt();
            }
        }

        if self.flare != 0.0 {
            let y = (1.0 - 8.0 * z).max(0.0);
            radius *= 1.0 + self.flare * (100f64.powf(y) - 1.0) / 100.0;
        }
        radius
    }
}

#[derive(Clone, Debug)]
pub struct Stem {
    pub(crate) level: usize,
    pub(crate) index: usize,
    pub(crate) clone_index: Vec<usize>,
    pub(crate) tree_position: String,
    pub(crate) frame: Frame,
    pub(crate) offset: f64,
    pub(crate) length: f64,
    pub(crate) segment_length: f64,
    pub(crate) segment_count: usize,
    pub(crate) profile: RadiusProfile,
    pub(crate) ring: RingParams,
    pub(crate) clone_section_offset: Option<usize>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) children: Vec<Stem>,
    pub(crate) leaves: Vec<Leaf>,
    pub(crate) bounds: Bounds,
}

impl Stem {
    /// Branching level, 0 for trunks.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Index among the parent's substems (or among the trunks). Clones share
    /// the index of their source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Lineage path such as `0.1c2.3`: one `index` per level, with `cN`
    /// appended for every split that produced a clone.
    pub fn tree_position(&self) -> &str {
        &self.tree_position
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Distance of the attachment point from the parent's base.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    /// Planned number of segments (`nCurveRes`). Clones start part way, so
    /// they hold fewer [`Stem::segments`].
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn base_radius(&self) -> f64 {
        self.profile.base_radius
    }

    /// Largest radius of the stem, at the flared base for trunks.
    pub fn peak_radius(&self) -> f64 {
        self.profile.radius_at(0.0).max(self.profile.base_radius)
    }

    pub fn radius_at(&self, distance: f64) -> f64 {
        self.profile.radius_at(distance)
    }

    pub fn profile(&self) -> &RadiusProfile {
        &self.profile
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Substems and clones in creation order.
    pub fn children(&self) -> &[Stem] {
        &self.children
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn is_clone(&self) -> bool {
        self.clone_section_offset.is_some()
    }

    /// Index, in the section sequence of the original (non-clone) stem, of
    /// this clone's first section. Always 0 for stems that are not clones.
    pub fn clone_section_offset(&self) -> usize {
        self.clone_section_offset.unwrap_or(0)
    }

    /// Bounding box of this stem, its children and its leaves.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn min_point(&self) -> Vector {
        self.bounds.min
    }

    pub fn max_point(&self) -> Vector {
        self.bounds.max
    }

    /// A stem too short or too thin to grow keeps no segments.
    pub fn is_grown(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Number of sections: the base ring plus one per subsegment.
    pub fn section_count(&self) -> usize {
        if self.segments.is_empty() {
            return 0;
        }
        1 + self.segments.iter().map(|s| s.subsegments().len()).sum::<usize>()
    }

    /// Cross-sections from base to tip: the base of the first segment, then
    /// every subsegment in order.
    pub fn sections(&self) -> impl Iterator<Item = StemSection> + '_ {
        let seg_len = self.segment_length;
        let ring = self.ring;
        let base = self.segments.first().map(|seg| {
            StemSection::new(
                *seg.frame(),
                seg.base_radius(),
                seg.index() as f64 * seg_len,
                self.clone_section_offset(),
                seg.subsegments().len(),
                ring,
            )
        });
        let rest = self
            .segments
            .iter()
            .flat_map(|seg| seg.subsegments().iter().map(move |sub| (seg, sub)))
            .enumerate()
            .map(move |(i, (seg, sub))| {
                StemSection::new(
                    seg.subsegment_frame(sub),
                    sub.radius,
                    seg.index() as f64 * seg_len + sub.distance,
                    self.clone_section_offset() + i + 1,
                    seg.subsegments().len(),
                    ring,
                )
            });
        base.into_iter().chain(rest)
    }

    /// Starts a clone of this stem from the split frame `frame`.
    ///
    /// The clone copies the dimensions and radius profile and continues
    /// section numbering at `section_offset`.
    pub(crate) fn spawn_clone(
        &self,
        frame: Frame,
        ordinal: usize,
        section_offset: usize,
        ring_seed: u64,
    ) -> Stem {
        let mut clone_index = self.clone_index.clone();
        clone_index.push(ordinal);
        let parent_position = self
            .tree_position
            .rsplit_once('.')
            .map_or("", |(parent, _)| parent);

        Stem {
            level: self.level,
            index: self.index,
            tree_position: tree_position(parent_position, self.index, &clone_index),
            clone_index,
            frame,
            offset: self.offset,
            length: self.length,
            segment_length: self.segment_length,
            segment_count: self.segment_count,
            profile: self.profile,
            ring: RingParams {
                seed: ring_seed,
                ..self.ring
            },
            clone_section_offset: Some(section_offset),
            segments: Vec::new(),
            children: Vec::new(),
            leaves: Vec::new(),
            bounds: Bounds::EMPTY,
        }
    }
}

/// Builds a lineage path: `parent` + `.` + `index` + one `cN` per clone
/// split.
pub(crate) fn tree_position(parent: &str, index: usize, clone_index: &[usize]) -> String {
    let mut token = index.to_string();
    for c in clone_index {
        token.push('c');
        token.push_str(&c.to_string());
    }
    if parent.is_empty() {
        token
    } else {
        format!("{parent}.{token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(taper: f64, flare: f64) -> RadiusProfile {
        RadiusProfile {
            base_radius: 1.0,
            length: 10.0,
            taper,
            flare,
        }
    }

    #[test]
    fn linear_taper_reaches_zero_at_tip() {
        let p = profile(1.0, 0.0);
        assert_eq!(p.radius_at(0.0), 1.0);
        assert!((p.radius_at(5.0) - 0.5).abs() < 1e-12);
        assert!(p.radius_at(10.0).abs() < 1e-12);
        // Past the tip the radius is clamped.
        assert!(p.radius_at(12.0).abs() < 1e-12);
    }

    #[test]
    fn zero_taper_is_cylindrical() {
        let p = profile(0.0, 0.0);
        assert_eq!(p.radius_at(3.0), 1.0);
        assert_eq!(p.radius_at(10.0), 1.0);
    }

    #[test]
    fn spherical_end_rounds_the_tip() {
        let p = profile(2.0, 0.0);
        // Unit taper is 0, so the body stays cylindrical.
        assert_eq!(p.radius_at(2.0), 1.0);
        // Half a radius from the tip the cap follows a circle.
        let r = p.radius_at(9.5);
        assert!((r - (1.0f64 - 0.25).sqrt()).abs() < 1e-9);
        assert!(p.radius_at(10.0).abs() < 1e-9);
    }

    #[test]
    fn periodic_taper_is_non_monotonic() {
        let p = profile(3.0, 0.0);
        let radii: Vec<f64> = (0..=40).map(|i| p.radius_at(i as f64 * 0.25)).collect();
        assert!(radii.iter().all(|r| r.is_finite() && *r >= 0.0));
        let rising = radii.windows(2).any(|w| w[1] > w[0] + 1e-9);
        let falling = radii.windows(2).any(|w| w[1] < w[0] - 1e-9);
        assert!(rising && falling);
    }

    #[test]
    fn flare_widens_only_the_base() {
        let plain = profile(1.0, 0.0);
        let flared = profile(1.0, 0.6);
        assert!((flared.radius_at(0.0) - 1.594).abs() < 1e-12);
        assert_eq!(flared.radius_at(5.0), plain.radius_at(5.0));
    }

    #[test]
    fn tree_position_formats_lineage() {
        assert_eq!(tree_position("", 0, &[]), "0");
        assert_eq!(tree_position("0", 1, &[2]), "0.1c2");
        assert_eq!(tree_position("0.1c2", 3, &[]), "0.1c2.3");
        assert_eq!(tree_position("0", 4, &[0, 1]), "0.4c0c1");
    }
}
