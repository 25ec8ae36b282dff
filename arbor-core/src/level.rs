//! Per-level growth policy resolved once per build.
//!
//! [`LevelParams::resolve`] turns the raw [`Params`] and the tree seed into
//! one read-only [`LevelParams`] per level. Numeric policy encodings of the
//! raw parameters (negative `nCurveV` means helix, `nTaper` ranges select a
//! taper profile) are decoded here into a [`SegmentShape`], so segment growth
//! never looks at raw ranges again.

use crate::{
    config::{LevelSettings, Params},
    random::mix_seed,
    types::Degrees,
};

/// Subsegment sampling policy of a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentShape {
    /// One subsegment at the segment end (linear taper).
    Straight,
    /// A full helix turn per segment with the given pitch angle.
    Helical { pitch: Degrees },
    /// Exponentially denser samples toward a rounded tip. Only the last
    /// segment of a stem uses it.
    SphericalEnd,
    /// Dense even sampling of a periodically tapered stem.
    PeriodicTaper,
    /// Exponentially denser samples toward the root of the first trunk
    /// segment.
    Flare,
}

pub const HELIX_SAMPLES: usize = 10;
pub const SPHERICAL_END_SAMPLES: usize = 10;
pub const PERIODIC_SAMPLES: usize = 20;
pub const FLARE_SAMPLES: usize = 10;

impl SegmentShape {
    /// Number of subsegments a segment of this shape produces.
    pub fn sample_count(self) -> usize {
        match self {
            SegmentShape::Straight => 1,
            SegmentShape::Helical { .. } => HELIX_SAMPLES,
            SegmentShape::SphericalEnd => SPHERICAL_END_SAMPLES,
            SegmentShape::PeriodicTaper => PERIODIC_SAMPLES,
            SegmentShape::Flare => FLARE_SAMPLES,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelParams {
    pub level: usize,
    pub length: f64,
    pub length_v: f64,
    pub taper: f64,
    pub seg_splits: f64,
    pub split_angle: Degrees,
    pub split_angle_v: Degrees,
    pub curve_res: usize,
    pub curve: Degrees,
    pub curve_back: Degrees,
    pub curve_v: Degrees,
    pub down_angle: Degrees,
    pub down_angle_v: Degrees,
    pub rotate: Degrees,
    pub rotate_v: Degrees,
    pub branches: usize,
    pub branch_dist: f64,
    /// Points per cross-section ring.
    pub mesh_points: usize,
    /// Whether exporters should emit smoothed normals for this level.
    pub smooth: bool,
    /// Dominant segment policy of the level.
    pub shape: SegmentShape,
    /// Trunk level with a nonzero `Flare`.
    pub flared: bool,
    /// Seed of this level's random stream.
    pub stream_seed: u64,
}

impl LevelParams {
    /// Resolves the levels growth will read: `Levels` entries, plus the
    /// leaf placement entry when the tree has leaves.
    ///
    /// Expects parameters that passed [`Params::validate`].
    pub fn resolve(params: &Params, seed: u64) -> Vec<LevelParams> {
        params
            .level
            .iter()
            .take(params.required_level_entries())
            .enumerate()
            .map(|(level, raw)| Self::from_settings(level, raw, params, seed))
            .collect()
    }

    fn from_settings(level: usize, raw: &LevelSettings, params: &Params, seed: u64) -> Self {
        let flared = level == 0 && params.flare != 0.0;
        let shape = if raw.curve_v < 0.0 {
            SegmentShape::Helical {
                pitch: raw.curve_v.abs(),
            }
        } else if raw.taper > 1.0 && raw.taper <= 2.0 {
            SegmentShape::SphericalEnd
        } else if raw.taper > 2.0 {
            SegmentShape::PeriodicTaper
        } else if flared {
            SegmentShape::Flare
        } else {
            SegmentShape::Straight
        };

        Self {
            level,
            length: raw.length,
            length_v: raw.length_v,
            taper: raw.taper,
            seg_splits: raw.seg_splits,
            split_angle: raw.split_angle,
            split_angle_v: raw.split_angle_v,
            curve_res: raw.curve_res,
            curve: raw.curve,
            curve_back: raw.curve_back,
            curve_v: raw.curve_v,
            down_angle: raw.down_angle,
            down_angle_v: raw.down_angle_v,
            rotate: raw.rotate,
            rotate_v: raw.rotate_v,
            branches: raw.branches,
            branch_dist: raw.branch_dist,
            mesh_points: mesh_points(level, params),
            smooth: (level as f64) < params.smooth * params.levels as f64,
            shape,
            flared,
            stream_seed: mix_seed(seed, level as u64),
        }
    }

    /// Policy for segment `index` of a stem with `count` segments.
    ///
    /// Spherical ends only apply to the last segment and flare only to the
    /// first; other segments of such levels fall back to the next matching
    /// policy.
    pub fn segment_shape(&self, index: usize, count: usize) -> SegmentShape {
        let flare_here = self.flared && index == 0;
        match self.shape {
            SegmentShape::SphericalEnd if index + 1 == count => SegmentShape::SphericalEnd,
            SegmentShape::SphericalEnd | SegmentShape::Flare if flare_here => SegmentShape::Flare,
            SegmentShape::SphericalEnd | SegmentShape::Flare => SegmentShape::Straight,
            shape => shape,
        }
    }

    /// Diagnostic description, e.g. `vertices/section: 8, smooth: yes`.
    pub fn vertex_info(&self) -> String {
        format!(
            "vertices/section: {}, smooth: {}",
            self.mesh_points,
            if self.smooth { "yes" } else { "no" }
        )
    }
}

/// Cross-section point count for `level`, raised by `Smooth` and, on the
/// trunk, by the number of lobes.
fn mesh_points(level: usize, params: &Params) -> usize {
    let smooth = params.smooth;
    if level == 0 {
        let plain = (4.0 * (1.0 + 2.0 * smooth)) as usize;
        if params.lobes > 0 {
            let lobed = params.lobes as f64 * 2f64.powi((1.0 + 2.5 * smooth) as i32);
            plain.max(lobed as usize)
        } else {
            plain
        }
    } else {
        let base = match level {
            1 => 3.0,
            2 => 2.0,
            _ => 1.0,
        };
        ((base * (1.0 + 1.5 * smooth)) as usize).max(3)
    }
}
