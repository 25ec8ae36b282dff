//! Cross-section rings.
//!
//! Downstream mesh builders walk a stem's [`StemSection`]s in order and
//! stitch consecutive rings together. Rings are computed on demand; trunk
//! rings with lobes or radius noise draw that noise from a stream seeded per
//! section, so asking twice yields the same points.

use crate::{
    config::Params,
    frame::Frame,
    level::LevelParams,
    random::{Random, mix_seed},
    types::Vector,
};

/// Below this radius a section collapses to a single point.
pub const MIN_SECTION_RADIUS: f64 = 0.000_001;

/// How the rings of one stem are sampled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingParams {
    pub mesh_points: usize,
    pub lobes: u32,
    pub lobe_depth: f64,
    /// Relative radius noise (`0ScaleV`).
    pub radius_noise: f64,
    /// Lobes or noise apply (trunks only).
    pub modulated: bool,
    pub seed: u64,
}

impl RingParams {
    pub fn for_level(lpar: &LevelParams, params: &Params, seed: u64) -> Self {
        let trunk = lpar.level == 0;
        Self {
            mesh_points: lpar.mesh_points.max(1),
            lobes: if trunk { params.lobes } else { 0 },
            lobe_depth: params.lobe_depth,
            radius_noise: if trunk { params.trunk_scale_v } else { 0.0 },
            modulated: trunk && (params.lobes != 0 || params.trunk_scale_v != 0.0),
            seed,
        }
    }
}

/// One cross-section of a stem: the base of its first segment or one of its
/// subsegments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StemSection {
    frame: Frame,
    radius: f64,
    distance: f64,
    index: usize,
    subsegment_count: usize,
    ring: RingParams,
}

impl StemSection {
    pub(crate) fn new(
        frame: Frame,
        radius: f64,
        distance: f64,
        index: usize,
        subsegment_count: usize,
        ring: RingParams,
    ) -> Self {
        Self {
            frame,
            radius,
            distance,
            index,
            subsegment_count,
            ring,
        }
    }

    /// World-space center of the ring.
    pub fn position(&self) -> Vector {
        self.frame.origin()
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Distance from the stem base along the stem.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Normal of the section plane.
    pub fn z(&self) -> Vector {
        self.frame.z()
    }

    /// Position of this section in its stem's section sequence. Clones
    /// continue the numbering of their source, see
    /// [`crate::stem::Stem::clone_section_offset`].
    pub fn index(&self) -> usize {
        self.index
    }

    /// The ring of boundary points, counter-clockwise around the local Z
    /// axis.
    ///
    /// ### Returns
    /// `mesh_points` points, or exactly one point (the center) when the
    /// radius is below [`MIN_SECTION_RADIUS`].
    pub fn points(&self) -> Vec<Vector> {
        if self.radius < MIN_SECTION_RADIUS {
            return vec![self.position()];
        }

        let ring = &self.ring;
        let n = ring.mesh_points;
        let mut noise = ring
            .modulated
            .then(|| Random::new(mix_seed(ring.seed, self.index as u64)));

        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let mut angle = i as f64 * 360.0 / n as f64;
            if ring.lobes != 0 {
                // Keep samples off the exact lobe extrema.
                angle -= 10.0 / ring.lobes as f64;
            }
            let a = angle.to_radians();
            let unit = Vector::new(a.cos(), a.sin(), 0.0);

            let radius = match noise.as_mut() {
                Some(rng) => {
                    let jitter = rng.var(ring.radius_noise) / self.subsegment_count.max(1) as f64;
                    let lobe = 1.0 + ring.lobe_depth * (ring.lobes as f64 * a).cos();
                    self.radius * (1.0 + jitter) * lobe
                }
                None => self.radius,
            };
            points.push(self.frame.apply(unit * radius));
        }
        points
    }
}
