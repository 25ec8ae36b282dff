//! Stem growth engine.
//!
//! One [`Growth`] lives for the duration of a single tree build. It owns the
//! per-level random streams and the error-diffusion accumulators, so the
//! order in which stems are grown is part of the result: trunks in order,
//! and within a stem each segment, then that segment's substems (or
//! leaves), then its clones, depth first.
//!
//! Random draws of a decision go to the stream of the level whose
//! parameters drive it: a child's direction draws from the child level's
//! stream, a stem's own curvature from its own.

use tracing::debug;

use crate::{
    config::{Params, Shape},
    error::TreeError,
    frame::Frame,
    leaf::Leaf,
    level::LevelParams,
    progress::{CancelToken, ProgressGuard},
    random::{Random, mix_seed},
    section::RingParams,
    segment::Segment,
    stem::{RadiusProfile, Stem, tree_position},
    types::{Bounds, Degrees, Vector},
};

/// Stems shorter than this are not grown.
pub const MIN_STEM_LENGTH: f64 = 0.0005;
/// Stems thinner than this at the base are not grown.
pub const MIN_STEM_RADIUS: f64 = 0.000_05;

/// Stream id reserved for per-stem ring noise seeds.
const SECTION_STREAM: u64 = u64::MAX;

/// Advances a rotation accumulator.
///
/// With `rotate >= 0` successive children sweep around the parent: the
/// accumulator holds the last azimuth and grows by `rotate + jitter`. With
/// `rotate < 0` children alternate around 180 degrees: the accumulator only
/// holds the sign of the last child, and the first child gets
/// `180 + rotate`.
///
/// ### Returns
/// `(azimuth, accumulator)`, the azimuth normalized to `[0, 360)`.
pub fn next_rotation(acc: f64, rotate: Degrees, jitter: Degrees) -> (Degrees, f64) {
    if rotate >= 0.0 {
        let azimuth = (acc + rotate + jitter + 360.0).rem_euclid(360.0);
        (azimuth, azimuth)
    } else {
        let sign = if acc == 1.0 { -1.0 } else { 1.0 };
        ((sign * (180.0 + rotate + jitter)).rem_euclid(360.0), sign)
    }
}

/// Rounds `value` to a count, carrying the rounding error over to the next
/// call through `error`.
pub(crate) fn diffuse(value: f64, error: &mut f64) -> usize {
    if !value.is_finite() {
        return 0;
    }
    let eff = (value + *error + 0.5).trunc();
    *error -= eff - value;
    if eff > 0.0 { eff as usize } else { 0 }
}

/// What a child needs to know about the stem it grows on.
#[derive(Clone, Copy, Debug)]
struct ParentInfo {
    length: f64,
    length_child_max: f64,
    profile: RadiusProfile,
}

/// Mutable growth state of one stem. Clones start from a copy.
#[derive(Clone, Debug, Default)]
struct StemState {
    parent: Option<ParentInfo>,
    length_child_max: f64,
    substems_per_segment: f64,
    leaves_per_segment: f64,
    split_correction: Degrees,
    rotation: f64,
    substems: usize,
    clones: usize,
}

pub(crate) struct Growth<'a, 'p> {
    params: &'a Params,
    levels: &'a [LevelParams],
    streams: Vec<Random>,
    substem_error: Vec<f64>,
    split_error: Vec<f64>,
    leaves_error: f64,
    scale: f64,
    section_seed: u64,
    stems_created: u64,
    progress: &'a mut ProgressGuard<'p>,
    cancel: &'a CancelToken,
}

impl<'a, 'p> Growth<'a, 'p> {
    /// Seeds one stream per level and draws the tree scale.
    ///
    /// Expects `levels` from [`LevelParams::resolve`] on validated `params`.
    pub(crate) fn new(
        params: &'a Params,
        levels: &'a [LevelParams],
        seed: u64,
        progress: &'a mut ProgressGuard<'p>,
        cancel: &'a CancelToken,
    ) -> Self {
        let mut streams: Vec<Random> = levels.iter().map(|l| Random::new(l.stream_seed)).collect();
        let scale = match streams.first_mut() {
            Some(rng) => params.scale + rng.var(params.scale_v),
            None => params.scale,
        };
        Self {
            params,
            levels,
            streams,
            substem_error: vec![0.0; levels.len()],
            split_error: vec![0.0; levels.len()],
            leaves_error: 0.0,
            scale,
            section_seed: mix_seed(seed, SECTION_STREAM),
            stems_created: 0,
            progress,
            cancel,
        }
    }

    /// Tree scale drawn for this build (`Scale ± ScaleV`).
    pub(crate) fn scale(&self) -> f64 {
        self.scale
    }

    fn var(&mut self, level: usize, max: f64) -> f64 {
        self.streams[level].var(max)
    }

    fn grows_leaves(&self, level: usize) -> bool {
        self.params.leaves != 0 && level > 0 && level + 1 == self.params.levels
    }

    /// Grows `Trunks` level-0 stems.
    ///
    /// Each trunk is shifted sideways by a random angle and a random
    /// distance of up to `0BranchDist`, then oriented by the trunk rotation
    /// accumulator and `0DownAngle`. Trunks are kept even when too small to
    /// grow.
    pub(crate) fn make_trunks(&mut self) -> Result<Vec<Stem>, TreeError> {
        let levels = self.levels;
        let lpar = &levels[0];
        let mut rotation = 0.0;
        let mut trunks = Vec::with_capacity(self.params.trunks);

        for index in 0..self.params.trunks {
            let angle = self.var(0, 360.0).to_radians();
            let dist = self.var(0, lpar.branch_dist);
            let jitter = self.var(0, lpar.rotate_v);
            let (azimuth, acc) = next_rotation(rotation, lpar.rotate, jitter);
            rotation = acc;
            let down = lpar.down_angle + self.var(0, lpar.down_angle_v);

            let frame = Frame::IDENTITY
                .translate(Vector::new(dist * angle.sin(), dist * angle.cos(), 0.0))
                .rotxz(down, azimuth);
            trunks.push(self.make_stem(0, index, "", frame, 0.0, None)?);
        }
        Ok(trunks)
    }

    /// Grows one stem and, recursively, everything on it.
    ///
    /// A stem that is too short or too thin comes back without segments;
    /// callers decide whether to keep it.
    fn make_stem(
        &mut self,
        level: usize,
        index: usize,
        parent_position: &str,
        frame: Frame,
        offset: f64,
        parent: Option<ParentInfo>,
    ) -> Result<Stem, TreeError> {
        self.cancel.check()?;
        self.progress.inc(1);

        let levels = self.levels;
        let lpar = &levels[level];
        let ring_seed = self.next_ring_seed();

        let length = self.stem_length(lpar, offset, parent.as_ref());
        let base_radius = self.stem_base_radius(length, offset, parent.as_ref());
        let segment_count = lpar.curve_res;
        let segment_length = if segment_count > 0 {
            length / segment_count as f64
        } else {
            0.0
        };

        let mut stem = Stem {
            level,
            index,
            clone_index: Vec::new(),
            tree_position: tree_position(parent_position, index, &[]),
            frame,
            offset,
            length,
            segment_length,
            segment_count,
            profile: RadiusProfile {
                base_radius,
                length,
                taper: lpar.taper,
                flare: if level == 0 { self.params.flare } else { 0.0 },
            },
            ring: RingParams::for_level(lpar, self.params, ring_seed),
            clone_section_offset: None,
            segments: Vec::new(),
            children: Vec::new(),
            leaves: Vec::new(),
            bounds: Bounds::EMPTY,
        };

        if level == 0 {
            let width = stem.peak_radius();
            if width.is_finite() {
                let corner = Vector::new(width, width, 0.0);
                stem.bounds.include(frame.origin() - corner);
                stem.bounds.include(frame.origin() + corner);
            }
        }

        if !(length > MIN_STEM_LENGTH) || !(base_radius > MIN_STEM_RADIUS) {
            debug!(
                position = %stem.tree_position,
                length,
                base_radius,
                "stem too short or too thin, not grown"
            );
            return Ok(stem);
        }
        if segment_count == 0 {
            debug!(position = %stem.tree_position, level, "no segments configured");
            return Ok(stem);
        }

        let mut state = self.prepare_substem_params(&stem, parent);
        self.make_segments(&mut stem, &mut state, 0, segment_count)?;
        Ok(stem)
    }

    fn next_ring_seed(&mut self) -> u64 {
        let seed = mix_seed(self.section_seed, self.stems_created);
        self.stems_created += 1;
        seed
    }

    fn stem_length(&mut self, lpar: &LevelParams, offset: f64, parent: Option<&ParentInfo>) -> f64 {
        match parent {
            None => (lpar.length + self.var(lpar.level, lpar.length_v)) * self.scale,
            Some(p) if lpar.level == 1 => {
                let base_length = self.params.base_size * self.scale;
                let ratio = if p.length > base_length {
                    ((p.length - offset) / (p.length - base_length)).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                p.length * p.length_child_max * self.params.shape.ratio(ratio)
            }
            Some(p) => p.length_child_max * (p.length - 0.6 * offset),
        }
    }

    fn stem_base_radius(&mut self, length: f64, offset: f64, parent: Option<&ParentInfo>) -> f64 {
        match parent {
            None => {
                let trunk_scale = self.params.trunk_scale + self.var(0, self.params.trunk_scale_v);
                length * self.params.ratio * trunk_scale
            }
            Some(p) => {
                let max_radius = p.profile.radius_at(offset);
                let radius = p.profile.base_radius * (length / p.length).powf(self.params.ratio_power);
                radius.min(max_radius)
            }
        }
    }

    /// Computes child length limit and per-segment substem and leaf
    /// densities of a stem about to grow its segments.
    fn prepare_substem_params(&mut self, stem: &Stem, parent: Option<ParentInfo>) -> StemState {
        let levels = self.levels;
        let lpar = &levels[stem.level];
        let segments = stem.segment_count as f64;
        let mut state = StemState {
            parent,
            ..StemState::default()
        };

        if let Some(next) = levels.get(stem.level + 1) {
            state.length_child_max = next.length + self.var(next.level, next.length_v);
        }

        if stem.level + 1 < self.params.levels {
            let max = lpar.branches as f64;
            let count = match parent {
                None => max,
                Some(p) if stem.level == 1 => {
                    (max * (0.2 + 0.8 * stem.length / p.length / p.length_child_max)).trunc()
                }
                Some(p) => (max * (1.0 - 0.5 * stem.offset / p.length)).trunc(),
            };
            state.substems_per_segment = if stem.level == 0 {
                count / segments / (1.0 - self.params.base_size)
            } else {
                count / segments
            };
        } else if self.grows_leaves(stem.level) {
            state.leaves_per_segment = self.leaves_per_branch(stem.offset, parent.as_ref()) / segments;
        }
        state
    }

    /// Leaves on one stem of the last level:
    /// `|Leaves| * LeafDistrib(offset / parent length) * LeafQuality`.
    fn leaves_per_branch(&self, offset: f64, parent: Option<&ParentInfo>) -> f64 {
        match parent {
            Some(p) if self.params.leaves != 0 => {
                self.params.leaves.unsigned_abs() as f64
                    * self.params.leaf_distrib.ratio(offset / p.length)
                    * self.params.leaf_quality
            }
            _ => 0.0,
        }
    }

    /// Grows segments `start..end` of `stem`, with their substems, leaves
    /// and clones.
    ///
    /// The frame of segment `start` is the stem frame; clones pass their
    /// split frame there.
    fn make_segments(
        &mut self,
        stem: &mut Stem,
        state: &mut StemState,
        start: usize,
        end: usize,
    ) -> Result<(), TreeError> {
        let levels = self.levels;
        let lpar = &levels[stem.level];
        let mut frame = stem.frame;

        for s in start..end {
            if s != 0 {
                frame = self.new_direction(lpar, state, frame, s);
            }

            let shape = lpar.segment_shape(s, stem.segment_count);
            let segment = Segment::grow(s, frame, stem.segment_length, shape, &stem.profile);
            stem.bounds.include(segment.lower_position());
            stem.bounds.include(segment.upper_position());
            for sub in segment.subsegments() {
                stem.bounds.include(sub.position);
            }
            stem.segments.push(segment);

            if stem.level + 1 < self.params.levels {
                self.make_substems(stem, state)?;
            } else if self.grows_leaves(stem.level) {
                self.make_leaves(stem, state);
            }

            frame = frame.translate_world(frame.z() * stem.segment_length);

            if s + 1 < end {
                frame = self.make_clones(stem, state, frame, s)?;
            }
        }
        Ok(())
    }

    /// Direction of segment `s > 0`: regular curvature plus split
    /// correction, random curvature, and upward attraction from level 2 on.
    fn new_direction(&mut self, lpar: &LevelParams, state: &StemState, frame: Frame, s: usize) -> Frame {
        let res = lpar.curve_res as f64;
        let mut delta = if lpar.curve_back == 0.0 {
            lpar.curve / res
        } else if s < (lpar.curve_res + 1) / 2 {
            lpar.curve * 2.0 / res
        } else {
            lpar.curve_back * 2.0 / res
        };
        delta += state.split_correction;
        let mut frame = frame.rotx(delta);

        if lpar.curve_v > 0.0 {
            let delta = self.var(lpar.level, lpar.curve_v) / res;
            let rho = 180.0 + self.var(lpar.level, 180.0);
            frame = frame.rotaxisz(delta, rho);
        }

        let attraction = self.params.attraction_up;
        if attraction != 0.0 && lpar.level >= 2 {
            let declination = frame.z().z.clamp(-1.0, 1.0).acos();
            let curve_up = attraction * declination * frame.y().z / res;
            frame = frame.rotx(-curve_up.to_degrees());
        }
        frame
    }

    /// Orientation of the next child at `offset` along a stem of `length`.
    ///
    /// The azimuth comes from the stem's rotation accumulator. A negative
    /// `nDownAngleV` derives the down angle from the position along the
    /// stem instead of jittering it.
    fn substem_direction(
        &mut self,
        next: &LevelParams,
        state: &mut StemState,
        frame: &Frame,
        offset: f64,
        stem_length: f64,
    ) -> Frame {
        let jitter = self.var(next.level, next.rotate_v);
        let (azimuth, acc) = next_rotation(state.rotation, next.rotate, jitter);
        state.rotation = acc;

        let down = if next.down_angle_v >= 0.0 {
            next.down_angle + self.var(next.level, next.down_angle_v)
        } else {
            let len = if next.level == 1 {
                stem_length * (1.0 - self.params.base_size)
            } else {
                stem_length
            };
            let ratio = Shape::Conical.ratio((stem_length - offset) / len);
            next.down_angle + next.down_angle_v * (1.0 - 2.0 * ratio)
        };
        frame.rotxz(down, azimuth)
    }

    /// Spawns the substems of the last grown segment of `stem`.
    ///
    /// Trunk segments below `BaseSize` stay bare; a segment crossing that
    /// height only branches above it.
    fn make_substems(&mut self, stem: &mut Stem, state: &mut StemState) -> Result<(), TreeError> {
        let levels = self.levels;
        let next = &levels[stem.level + 1];
        let Some(segment) = stem.segments.last() else {
            return Ok(());
        };
        let seg_index = segment.index() as f64;
        let seg_len = stem.segment_length;

        let (per_segment, offs) = if stem.level > 0 {
            let offs = match (&state.parent, segment.index()) {
                (Some(p), 0) => p.profile.radius_at(stem.offset) / seg_len,
                _ => 0.0,
            };
            (state.substems_per_segment, offs)
        } else {
            let bare = self.params.base_size * stem.length;
            let start = seg_index * seg_len;
            if start > bare {
                (state.substems_per_segment, 0.0)
            } else if start + seg_len <= bare {
                return Ok(());
            } else {
                let offs = (bare - start) / seg_len;
                (state.substems_per_segment * (1.0 - offs), offs)
            }
        };

        let count = diffuse(per_segment, &mut self.substem_error[stem.level]);
        if count == 0 {
            return Ok(());
        }

        let dist = (1.0 - offs) / count as f64 * next.branch_dist;
        let dist_v = dist * 0.25;
        let info = ParentInfo {
            length: stem.length,
            length_child_max: state.length_child_max,
            profile: stem.profile,
        };

        for s in 0..count {
            let fraction = offs + dist / 2.0 + s as f64 * dist + self.var(next.level, dist_v);
            let offset = (seg_index + fraction) * seg_len;
            let direction = self.substem_direction(next, state, segment.frame(), offset, stem.length);
            let frame = segment.substem_position(direction, fraction);

            let child = self.make_stem(
                next.level,
                state.substems,
                &stem.tree_position,
                frame,
                offset,
                Some(info),
            )?;
            if child.is_grown() {
                state.substems += 1;
                stem.bounds.merge(&child.bounds);
                stem.children.push(child);
            }
        }
        Ok(())
    }

    /// Adds the leaves of the last grown segment of `stem`.
    ///
    /// With `Leaves > 0` leaves are spread along every segment. With
    /// `Leaves < 0` they form a fan at the tip of the last segment: one in
    /// the middle for an odd count, the rest in pairs turned left and right.
    fn make_leaves(&mut self, stem: &mut Stem, state: &mut StemState) {
        let levels = self.levels;
        let next = &levels[self.params.levels];
        let bend = self.params.leaf_bend;
        let Some(segment) = stem.segments.last() else {
            return;
        };
        let seg_len = stem.segment_length;

        if self.params.leaves > 0 {
            let count = diffuse(state.leaves_per_segment, &mut self.leaves_error);
            if count == 0 {
                return;
            }
            let offs = match (&state.parent, segment.index()) {
                (Some(p), 0) => p.profile.radius_at(stem.offset) / seg_len,
                _ => 0.0,
            };
            let dist = (1.0 - offs) / count as f64;

            for s in 0..count {
                let fraction = offs + dist / 2.0 + s as f64 * dist + self.var(next.level, dist / 2.0);
                let offset = (segment.index() as f64 + fraction) * seg_len;
                let direction = self.substem_direction(next, state, segment.frame(), offset, stem.length);
                let leaf = Leaf::new(segment.substem_position(direction, fraction), bend);
                stem.bounds.include(leaf.position());
                stem.leaves.push(leaf);
            }
        } else if segment.index() + 1 == stem.segment_count {
            let total = self.leaves_per_branch(stem.offset, state.parent.as_ref()) + 0.5;
            let count = if total > 0.0 { total as usize } else { 0 };
            if count == 0 {
                return;
            }
            let tip = segment
                .frame()
                .translate_world(segment.upper_position() - segment.lower_position());
            let dist_angle = next.rotate / count as f64;
            let var_angle = next.rotate_v / count as f64;

            let offset_angle = if count % 2 == 1 {
                let leaf = Leaf::new(tip, bend);
                stem.bounds.include(leaf.position());
                stem.leaves.push(leaf);
                dist_angle
            } else {
                dist_angle / 2.0
            };

            for s in 0..count / 2 {
                for side in [1.0, -1.0] {
                    let turn = side * (offset_angle + s as f64 * dist_angle + self.var(next.level, var_angle));
                    let down = next.down_angle + self.var(next.level, next.down_angle_v);
                    let leaf = Leaf::new(tip.roty(turn).rotx(down), bend);
                    stem.bounds.include(leaf.position());
                    stem.leaves.push(leaf);
                }
            }
        }
    }

    /// Splits `stem` after segment `nseg`.
    ///
    /// Each clone continues from the split point with the remaining
    /// segments and is stored among the stem's children. Returns the new
    /// frame of the original stem.
    fn make_clones(
        &mut self,
        stem: &mut Stem,
        state: &mut StemState,
        frame: Frame,
        nseg: usize,
    ) -> Result<Frame, TreeError> {
        let levels = self.levels;
        let lpar = &levels[stem.level];
        let splits = if stem.level == 0 && nseg == 0 && self.params.base_splits > 0 {
            self.params.base_splits as usize
        } else {
            diffuse(lpar.seg_splits, &mut self.split_error[stem.level])
        };
        if splits == 0 {
            return Ok(frame);
        }

        let remaining = stem.segment_count - nseg - 1;
        let spread = 360.0 / (splits + 1) as f64;
        let section_offset = stem.clone_section_offset()
            + stem
                .segments
                .iter()
                .map(|seg| seg.subsegments().len())
                .sum::<usize>();

        for i in 0..splits {
            let mut clone_state = StemState {
                rotation: state.rotation + 180.0,
                substems: 0,
                clones: 0,
                ..state.clone()
            };
            let clone_frame = self.split(
                lpar,
                &mut clone_state,
                frame,
                spread * (i + 1) as f64,
                (nseg, remaining),
                splits,
            );

            self.cancel.check()?;
            self.progress.inc(1);
            let ring_seed = self.next_ring_seed();
            let mut clone = stem.spawn_clone(clone_frame, state.clones, section_offset, ring_seed);
            state.clones += 1;

            let end = clone.segment_count;
            self.make_segments(&mut clone, &mut clone_state, nseg + 1, end)?;
            stem.bounds.merge(&clone.bounds);
            stem.children.push(clone);
        }

        Ok(self.split(lpar, state, frame, 0.0, (nseg, remaining), splits))
    }

    /// Turns a stem away at a split by the split angle and, for clones
    /// (`spread > 0`), diverges it about the world Z axis.
    ///
    /// The later segments curve back by the split angle spread over the
    /// `remaining` segments, and the substem density is shared among the
    /// `splits + 1` resulting stems.
    fn split(
        &mut self,
        lpar: &LevelParams,
        state: &mut StemState,
        frame: Frame,
        spread: Degrees,
        (nseg, remaining): (usize, usize),
        splits: usize,
    ) -> Frame {
        let level = lpar.level;
        let declination = frame.z().z.clamp(-1.0, 1.0).acos().to_degrees();
        let split_angle =
            (lpar.split_angle + self.var(level, lpar.split_angle_v) - declination).max(0.0);
        let mut frame = frame.rotx(split_angle);
        state.split_correction -= split_angle / remaining.max(1) as f64;

        if spread > 0.0 {
            let diverge = if self.params.base_splits > 0 && level == 0 && nseg == 0 {
                spread + self.var(level, lpar.split_angle_v)
            } else {
                let t = (self.var(level, 1.0) + 1.0) / 2.0;
                let d = 20.0 + 0.75 * (30.0 + (declination - 90.0).abs()) * t * t;
                if self.var(level, 1.0) >= 0.0 { -d } else { d }
            };
            frame = frame.rotaxis(diverge, Vector::Z);
        }

        state.substems_per_segment /= (splits + 1) as f64;
        frame
    }
}
