//! Raw tree parameters.
//!
//! [`Params`] holds the tree-wide values and one [`LevelSettings`] per
//! branching level, using the Weber/Penn parameter set. Field docs give the
//! conventional parameter name in backticks (`BaseSize`, `nCurveRes`, ...);
//! [`ParamError`] reports problems with those names, prefixing per-level
//! names with the level number (`1CurveRes`).
//!
//! Parameters are validated once by [`Params::validate`] before growth
//! starts. The growth engine never mutates them.

use crate::error::ParamError;

/// Envelope shapes used for branch length distribution and leaf density.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Shape {
    #[default]
    Conical,
    Spherical,
    Hemispherical,
    Cylindrical,
    TaperedCylindrical,
    Flame,
    InverseConical,
    TendFlame,
}

impl Shape {
    /// Relative size at position `ratio` (0 = base, 1 = top) of the envelope.
    pub fn ratio(self, ratio: f64) -> f64 {
        use std::f64::consts::PI;
        match self {
            Shape::Conical => 0.2 + 0.8 * ratio,
            Shape::Spherical => 0.2 + 0.8 * (PI * ratio).sin(),
            Shape::Hemispherical => 0.2 + 0.8 * (0.5 * PI * ratio).sin(),
            Shape::Cylindrical => 1.0,
            Shape::TaperedCylindrical => 0.5 + 0.5 * ratio,
            Shape::Flame => {
                if ratio <= 0.7 {
                    ratio / 0.7
                } else {
                    (1.0 - ratio) / 0.3
                }
            }
            Shape::InverseConical => 1.0 - 0.8 * ratio,
            Shape::TendFlame => {
                if ratio <= 0.7 {
                    0.5 + 0.5 * ratio / 0.7
                } else {
                    0.5 + 0.5 * (1.0 - ratio) / 0.3
                }
            }
        }
    }
}

/// Parameters of one branching level (0 = trunk).
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSettings {
    /// `nLength`, `nLengthV`: stem length (relative to the parent's
    /// maximum child length for levels above 0).
    pub length: f64,
    pub length_v: f64,
    /// `nTaper`: `<= 1` linear taper, `(1, 2]` spherical end, `> 2`
    /// periodic tapering.
    pub taper: f64,
    /// `nSegSplits`: clones spawned per segment (fractional values are
    /// error-diffused).
    pub seg_splits: f64,
    pub split_angle: f64,
    pub split_angle_v: f64,
    /// `nCurveRes`: number of segments per stem.
    pub curve_res: usize,
    pub curve: f64,
    pub curve_back: f64,
    /// `nCurveV`: random curvature; a negative value turns the stem into a
    /// helix with pitch angle `|nCurveV|`.
    pub curve_v: f64,
    pub down_angle: f64,
    /// Negative values derive the down angle from the position along the
    /// parent instead of jittering it.
    pub down_angle_v: f64,
    /// `nRotate`: positive values rotate successive children around the
    /// parent; negative values alternate them.
    pub rotate: f64,
    pub rotate_v: f64,
    /// `nBranches`: child stems grown on one stem of this level.
    pub branches: usize,
    /// `nBranchDist`: spacing factor for children of this level; at level
    /// 0 the lateral spread between trunks.
    pub branch_dist: f64,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            length: 1.0,
            length_v: 0.0,
            taper: 1.0,
            seg_splits: 0.0,
            split_angle: 0.0,
            split_angle_v: 0.0,
            curve_res: 3,
            curve: 0.0,
            curve_back: 0.0,
            curve_v: 0.0,
            down_angle: 0.0,
            down_angle_v: 0.0,
            rotate: 0.0,
            rotate_v: 0.0,
            branches: 0,
            branch_dist: 1.0,
        }
    }
}

/// Tree-wide parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    pub species: String,
    /// `Shape`: envelope of the first branch level's lengths.
    pub shape: Shape,
    /// `Levels`: number of stem levels, trunk included.
    pub levels: usize,
    /// `Trunks`: number of level-0 stems.
    pub trunks: usize,
    pub scale: f64,
    pub scale_v: f64,
    /// `BaseSize`: bare fraction of the trunk without branches.
    pub base_size: f64,
    pub ratio: f64,
    pub ratio_power: f64,
    pub lobes: u32,
    pub lobe_depth: f64,
    pub flare: f64,
    /// `0Scale`, `0ScaleV`: trunk radius scale and its variation. The
    /// variation also roughens trunk cross-sections.
    pub trunk_scale: f64,
    pub trunk_scale_v: f64,
    /// `BaseSplits`: clones at the trunk base.
    pub base_splits: u32,
    /// `Leaves`: leaves per stem of the last level; negative values
    /// arrange them as a fan at the stem tip.
    pub leaves: i32,
    pub leaf_shape: String,
    pub leaf_scale: f64,
    pub leaf_scale_x: f64,
    pub leaf_stem_len: f64,
    pub leaf_bend: f64,
    pub leaf_distrib: Shape,
    pub leaf_quality: f64,
    pub attraction_up: f64,
    /// `Smooth`: `0..=1`, raises cross-section point counts.
    pub smooth: f64,
    /// One entry per level. When `leaves != 0` and `levels > 1` one extra
    /// entry after the last level supplies the leaf down/rotate angles.
    pub level: Vec<LevelSettings>,
}

impl Default for Params {
    /// A quaking aspen.
    fn default() -> Self {
        Self {
            species: "Quaking Aspen".to_string(),
            shape: Shape::TendFlame,
            levels: 3,
            trunks: 1,
            scale: 13.0,
            scale_v: 3.0,
            base_size: 0.4,
            ratio: 0.015,
            ratio_power: 1.2,
            lobes: 5,
            lobe_depth: 0.07,
            flare: 0.6,
            trunk_scale: 1.0,
            trunk_scale_v: 0.0,
            base_splits: 0,
            leaves: 25,
            leaf_shape: "disc".to_string(),
            leaf_scale: 0.17,
            leaf_scale_x: 1.0,
            leaf_stem_len: 0.5,
            leaf_bend: 0.3,
            leaf_distrib: Shape::TaperedCylindrical,
            leaf_quality: 1.0,
            attraction_up: 0.5,
            smooth: 0.5,
            level: vec![
                LevelSettings {
                    curve_v: 20.0,
                    branches: 50,
                    branch_dist: 0.0,
                    ..LevelSettings::default()
                },
                LevelSettings {
                    length: 0.3,
                    curve_res: 5,
                    curve: -40.0,
                    curve_v: 50.0,
                    down_angle: 60.0,
                    down_angle_v: -50.0,
                    rotate: 140.0,
                    branches: 30,
                    ..LevelSettings::default()
                },
                LevelSettings {
                    length: 0.6,
                    curve: -40.0,
                    curve_v: 75.0,
                    down_angle: 45.0,
                    down_angle_v: 10.0,
                    rotate: 140.0,
                    branches: 10,
                    ..LevelSettings::default()
                },
                LevelSettings {
                    length: 0.0,
                    curve_res: 1,
                    down_angle: 45.0,
                    down_angle_v: 10.0,
                    rotate: 77.0,
                    ..LevelSettings::default()
                },
            ],
        }
    }
}

pub const MAX_LEVELS: usize = 9;

impl Params {
    /// Number of [`LevelSettings`] entries growth will read.
    pub fn required_level_entries(&self) -> usize {
        if self.leaves != 0 && self.levels > 1 {
            self.levels + 1
        } else {
            self.levels
        }
    }

    /// Checks every parameter once, before growth.
    ///
    /// ### Returns
    /// The first offending parameter as a [`ParamError`].
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(ParamError::new(
                "Levels",
                format!("must be between 1 and {MAX_LEVELS}, got {}", self.levels),
            ));
        }
        if self.level.len() < self.required_level_entries() {
            return Err(ParamError::new(
                "Levels",
                format!(
                    "{} levels need {} level entries, got {}",
                    self.levels,
                    self.required_level_entries(),
                    self.level.len()
                ),
            ));
        }

        let tree_values = [
            ("Scale", self.scale),
            ("ScaleV", self.scale_v),
            ("BaseSize", self.base_size),
            ("Ratio", self.ratio),
            ("RatioPower", self.ratio_power),
            ("LobeDepth", self.lobe_depth),
            ("Flare", self.flare),
            ("0Scale", self.trunk_scale),
            ("0ScaleV", self.trunk_scale_v),
            ("LeafScale", self.leaf_scale),
            ("LeafScaleX", self.leaf_scale_x),
            ("LeafStemLen", self.leaf_stem_len),
            ("LeafBend", self.leaf_bend),
            ("LeafQuality", self.leaf_quality),
            ("AttractionUp", self.attraction_up),
            ("Smooth", self.smooth),
        ];
        for (name, value) in tree_values {
            finite(name, value)?;
        }

        if self.scale <= 0.0 {
            return Err(ParamError::new("Scale", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.base_size) {
            return Err(ParamError::new("BaseSize", "must be in [0, 1)"));
        }
        if self.ratio < 0.0 {
            return Err(ParamError::new("Ratio", "must not be negative"));
        }
        if self.lobe_depth < 0.0 {
            return Err(ParamError::new("LobeDepth", "must not be negative"));
        }
        if !(self.leaf_quality > 0.0 && self.leaf_quality <= 1.0) {
            return Err(ParamError::new("LeafQuality", "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.smooth) {
            return Err(ParamError::new("Smooth", "must be in [0, 1]"));
        }

        for (n, lvl) in self.level.iter().enumerate().take(self.required_level_entries()) {
            lvl.validate(n)?;
        }
        Ok(())
    }
}

impl LevelSettings {
    fn validate(&self, n: usize) -> Result<(), ParamError> {
        let values = [
            ("Length", self.length),
            ("LengthV", self.length_v),
            ("Taper", self.taper),
            ("SegSplits", self.seg_splits),
            ("SplitAngle", self.split_angle),
            ("SplitAngleV", self.split_angle_v),
            ("Curve", self.curve),
            ("CurveBack", self.curve_back),
            ("CurveV", self.curve_v),
            ("DownAngle", self.down_angle),
            ("DownAngleV", self.down_angle_v),
            ("Rotate", self.rotate),
            ("RotateV", self.rotate_v),
            ("BranchDist", self.branch_dist),
        ];
        for (name, value) in values {
            finite(&format!("{n}{name}"), value)?;
        }
        if !(0.0..=3.0).contains(&self.taper) {
            return Err(ParamError::new(format!("{n}Taper"), "must be in [0, 3]"));
        }
        if self.seg_splits < 0.0 {
            return Err(ParamError::new(format!("{n}SegSplits"), "must not be negative"));
        }
        if self.curve_v <= -90.0 {
            return Err(ParamError::new(
                format!("{n}CurveV"),
                "helix pitch must be above -90 degrees",
            ));
        }
        Ok(())
    }
}

fn finite(name: &str, value: f64) -> Result<(), ParamError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::new(name, format!("must be a finite number, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert_eq!(Params::default().validate(), Ok(()));
    }

    #[test]
    fn shape_ratios_match_envelopes() {
        assert!((Shape::Conical.ratio(0.0) - 0.2).abs() < 1e-12);
        assert!((Shape::Conical.ratio(1.0) - 1.0).abs() < 1e-12);
        assert!((Shape::Spherical.ratio(0.5) - 1.0).abs() < 1e-12);
        assert_eq!(Shape::Cylindrical.ratio(0.3), 1.0);
        assert!((Shape::Flame.ratio(0.7) - 1.0).abs() < 1e-12);
        assert!((Shape::TendFlame.ratio(1.0) - 0.5).abs() < 1e-12);
        assert!((Shape::InverseConical.ratio(1.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_levels_are_rejected() {
        let params = Params {
            levels: 0,
            ..Params::default()
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.name, "Levels");
    }

    #[test]
    fn missing_leaf_level_is_rejected_only_with_leaves() {
        let mut params = Params::default();
        params.level.truncate(3);
        assert_eq!(params.validate().unwrap_err().name, "Levels");

        params.leaves = 0;
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn out_of_range_values_name_the_parameter() {
        let params = Params {
            base_size: 1.0,
            ..Params::default()
        };
        assert_eq!(params.validate().unwrap_err().name, "BaseSize");

        let params = Params {
            leaf_quality: 0.0,
            ..Params::default()
        };
        assert_eq!(params.validate().unwrap_err().name, "LeafQuality");

        let mut params = Params::default();
        params.level[2].taper = 3.5;
        assert_eq!(params.validate().unwrap_err().name, "2Taper");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut params = Params::default();
        params.level[1].curve = f64::NAN;
        let err = params.validate().unwrap_err();
        assert_eq!(err.name, "1Curve");
        assert!(err.reason.contains("finite"));
    }

    #[test]
    fn single_level_tree_needs_no_leaf_level() {
        let mut params = Params {
            levels: 1,
            ..Params::default()
        };
        params.level.truncate(1);
        assert_ne!(params.leaves, 0);
        assert_eq!(params.required_level_entries(), 1);
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn flat_helix_pitch_is_rejected() {
        let mut params = Params::default();
        params.level[0].curve_v = -90.0;
        assert_eq!(params.validate().unwrap_err().name, "0CurveV");

        params.level[0].curve_v = -120.0;
        assert_eq!(params.validate().unwrap_err().name, "0CurveV");

        params.level[0].curve_v = -89.0;
        assert_eq!(params.validate(), Ok(()));
    }

    #[test]
    fn zero_curve_res_is_a_valid_degenerate_shape() {
        let mut params = Params::default();
        params.level[1].curve_res = 0;
        assert_eq!(params.validate(), Ok(()));
    }
}
