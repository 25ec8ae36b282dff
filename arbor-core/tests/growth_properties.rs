use arbor_core::{
    CancelToken, Leaf, NullProgress, Params, Progress, SinkError, Stem, Tree, TreeError,
    TreeTraversal, Vector,
    growth::next_rotation,
    section::MIN_SECTION_RADIUS,
    segment::helix_radius,
};

const EPS: f64 = 1e-9;

/// Flattens every section and leaf of a tree into numbers, in traversal
/// order.
#[derive(Default)]
struct Fingerprint {
    values: Vec<f64>,
    positions: Vec<String>,
}

impl TreeTraversal for Fingerprint {
    fn enter_stem(&mut self, stem: &Stem) -> bool {
        self.positions.push(stem.tree_position().to_string());
        for section in stem.sections() {
            let p = section.position();
            self.values.extend([p.x, p.y, p.z, section.radius(), section.distance()]);
        }
        true
    }

    fn visit_leaf(&mut self, leaf: &Leaf) -> bool {
        let p = leaf.position();
        let z = leaf.frame().z();
        self.values.extend([p.x, p.y, p.z, z.x, z.y, z.z]);
        true
    }
}

/// Collects every stem in traversal order.
#[derive(Default)]
struct Stems<'t> {
    stems: Vec<&'t Stem>,
}

fn all_stems(tree: &Tree) -> Vec<&Stem> {
    fn walk<'t>(stem: &'t Stem, out: &mut Stems<'t>) {
        out.stems.push(stem);
        for child in stem.children() {
            walk(child, out);
        }
    }
    let mut out = Stems::default();
    for trunk in tree.trunks() {
        walk(trunk, &mut out);
    }
    out.stems
}

#[derive(Default)]
struct Calls {
    enter_tree: usize,
    leave_tree: usize,
    enter_stem: usize,
    leave_stem: usize,
    leaves: usize,
}

impl TreeTraversal for Calls {
    fn enter_tree(&mut self, _tree: &Tree) -> bool {
        self.enter_tree += 1;
        true
    }

    fn leave_tree(&mut self, _tree: &Tree) -> bool {
        self.leave_tree += 1;
        true
    }

    fn enter_stem(&mut self, _stem: &Stem) -> bool {
        self.enter_stem += 1;
        true
    }

    fn leave_stem(&mut self, _stem: &Stem) -> bool {
        self.leave_stem += 1;
        true
    }

    fn visit_leaf(&mut self, _leaf: &Leaf) -> bool {
        self.leaves += 1;
        true
    }
}

/// A three level tree with splitting branches, kept small enough for
/// debug test runs.
fn splitting_params() -> Params {
    let mut params = Params {
        trunks: 2,
        ..Params::default()
    };
    params.level[0].branches = 8;
    params.level[0].branch_dist = 1.5;
    params.level[0].seg_splits = 0.4;
    params.level[0].split_angle = 20.0;
    params.level[1].branches = 6;
    params.level[1].seg_splits = 0.6;
    params.level[1].split_angle = 35.0;
    params.level[1].split_angle_v = 10.0;
    params
}

fn trunk_azimuths(tree: &Tree) -> Vec<f64> {
    tree.trunks()
        .iter()
        .map(|t| {
            let z = t.frame().z();
            (z.y.atan2(z.x).to_degrees() + 90.0).rem_euclid(360.0)
        })
        .collect()
}

fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[test]
fn same_seed_reproduces_the_tree() {
    let a = Tree::new(splitting_params(), 99).unwrap();
    let b = Tree::new(splitting_params(), 99).unwrap();

    let (mut fa, mut fb) = (Fingerprint::default(), Fingerprint::default());
    a.traverse(&mut fa);
    b.traverse(&mut fb);

    assert_eq!(a.stem_count(), b.stem_count());
    assert_eq!(a.leaf_count(), b.leaf_count());
    assert_eq!(fa.positions, fb.positions);
    assert_eq!(fa.values.len(), fb.values.len());
    assert!(fa.values.iter().zip(&fb.values).all(|(x, y)| x.to_bits() == y.to_bits()));
    assert_eq!(a.bounds(), b.bounds());
}

#[test]
fn different_seeds_differ() {
    let a = Tree::new(splitting_params(), 1).unwrap();
    let b = Tree::new(splitting_params(), 2).unwrap();
    let (mut fa, mut fb) = (Fingerprint::default(), Fingerprint::default());
    a.traverse(&mut fa);
    b.traverse(&mut fb);
    assert_ne!(fa.values, fb.values);
}

#[test]
fn bounds_contain_every_subsegment_and_leaf() {
    let tree = Tree::new(splitting_params(), 5).unwrap();
    let bounds = tree.bounds();
    assert!(!bounds.is_empty());

    for stem in all_stems(&tree) {
        for segment in stem.segments() {
            assert!(bounds.contains(segment.lower_position(), EPS));
            assert!(bounds.contains(segment.upper_position(), EPS));
            for sub in segment.subsegments() {
                assert!(bounds.contains(sub.position, EPS), "{:?}", sub.position);
                assert!(stem.bounds().contains(sub.position, EPS));
            }
        }
        for leaf in stem.leaves() {
            assert!(bounds.contains(leaf.position(), EPS));
        }
    }
    assert_eq!(tree.min_point(), bounds.min);
    assert_eq!(tree.max_point(), bounds.max);
}

#[test]
fn traversal_visits_every_counted_stem_and_leaf() {
    let tree = Tree::new(splitting_params(), 11).unwrap();
    let mut calls = Calls::default();
    assert!(tree.traverse(&mut calls));

    assert_eq!(calls.enter_tree, 1);
    assert_eq!(calls.leave_tree, 1);
    assert_eq!(calls.enter_stem, tree.stem_count());
    assert_eq!(calls.leave_stem, tree.stem_count());
    assert_eq!(calls.leaves, tree.leaf_count());
    assert_eq!(all_stems(&tree).len(), tree.stem_count());
    assert!(tree.leaf_count() > 0);
}

#[test]
fn distances_increase_along_every_stem() {
    let tree = Tree::new(splitting_params(), 23).unwrap();
    for stem in all_stems(&tree) {
        for segment in stem.segments() {
            let subs = segment.subsegments();
            assert!(subs.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
        let starts: Vec<f64> = stem
            .segments()
            .iter()
            .map(|s| s.index() as f64 * stem.segment_length())
            .collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));

        let distances: Vec<f64> = stem.sections().map(|s| s.distance()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1] + EPS));
    }
}

#[test]
fn clones_continue_the_section_numbering_of_their_source() {
    let tree = Tree::new(splitting_params(), 8).unwrap();
    let mut checked = 0;

    for source in all_stems(&tree) {
        for clone in source.children().iter().filter(|c| c.is_clone() && c.level() == source.level()) {
            assert!(clone.clone_section_offset() > source.clone_section_offset());
            assert!(clone.tree_position().starts_with(source.tree_position()));

            let source_sections: Vec<_> = source.sections().collect();
            for section in clone.sections() {
                let twin = source_sections
                    .iter()
                    .find(|s| s.index() == section.index())
                    .expect("source has a section with the same index");
                assert!((twin.distance() - section.distance()).abs() < EPS);
                assert!((twin.radius() - section.radius()).abs() < EPS);
            }
            // The clone starts where the source split.
            let first = clone.sections().next().unwrap();
            let twin = source_sections.iter().find(|s| s.index() == first.index()).unwrap();
            assert!(twin.position().abs_diff_eq(first.position(), EPS));
            checked += 1;
        }
    }
    assert!(checked > 0, "no clones were grown");
}

#[test]
fn tapered_tip_collapses_to_one_point() {
    let mut params = Params {
        levels: 1,
        leaves: 0,
        flare: 0.0,
        ..Params::default()
    };
    params.level[0].taper = 1.0;
    let tree = Tree::new(params, 3).unwrap();
    let trunk = &tree.trunks()[0];
    let mesh_points = tree.level_params(0).unwrap().mesh_points;

    let sections: Vec<_> = trunk.sections().collect();
    let tip = sections.last().unwrap();
    assert!(tip.radius() < MIN_SECTION_RADIUS);
    assert_eq!(tip.points().len(), 1);
    assert!(tip.points()[0].abs_diff_eq(tip.position(), EPS));

    let base = &sections[0];
    assert_eq!(base.points().len(), mesh_points);
}

#[test]
fn helical_stems_close_every_turn() {
    let mut params = Params {
        levels: 1,
        leaves: 0,
        ..Params::default()
    };
    params.level[0].curve_v = -30.0;
    params.level[0].curve_res = 4;
    let tree = Tree::new(params, 6).unwrap();
    let trunk = &tree.trunks()[0];
    assert_eq!(trunk.segments().len(), 4);

    for segment in trunk.segments() {
        let subs = segment.subsegments();
        assert_eq!(subs.len(), 10);
        assert!(subs.last().unwrap().position.abs_diff_eq(segment.upper_position(), EPS));

        // Every sample sits on the helix cylinder.
        let rad = helix_radius(30.0, segment.length());
        let center = segment.frame().apply(Vector::new(-rad, 0.0, 0.0));
        let axis = segment.frame().z();
        for sub in subs {
            let d = sub.position - center;
            let radial = d - axis * d.dot(axis);
            assert!((radial.length() - rad).abs() < 1e-6);
        }
    }
    assert!((helix_radius(30.0, 10.0) - 0.9189).abs() < 1e-3);
}

#[test]
fn rotating_trunks_sweep_by_rotate() {
    let mut params = Params {
        levels: 1,
        trunks: 4,
        leaves: 0,
        ..Params::default()
    };
    params.level[0].rotate = 90.0;
    params.level[0].rotate_v = 0.0;
    params.level[0].down_angle = 20.0;
    params.level[0].down_angle_v = 0.0;
    let tree = Tree::new(params, 10).unwrap();

    let azimuths = trunk_azimuths(&tree);
    assert_eq!(azimuths.len(), 4);
    for (i, a) in azimuths.iter().enumerate() {
        assert!(angle_diff(*a, 90.0 * (i + 1) as f64) < 1e-6, "{azimuths:?}");
    }
}

#[test]
fn alternating_trunks_flip_around_180() {
    let mut params = Params {
        levels: 1,
        trunks: 4,
        leaves: 0,
        ..Params::default()
    };
    params.level[0].rotate = -40.0;
    params.level[0].rotate_v = 0.0;
    params.level[0].down_angle = 20.0;
    params.level[0].down_angle_v = 0.0;
    let tree = Tree::new(params, 10).unwrap();

    let azimuths = trunk_azimuths(&tree);
    for (i, a) in azimuths.iter().enumerate() {
        let expected = if i % 2 == 0 { 140.0 } else { 220.0 };
        assert!(angle_diff(*a, expected) < 1e-6, "{azimuths:?}");
    }

    // The accumulator alone, with jitter fixed at zero.
    assert_eq!(next_rotation(0.0, -40.0, 0.0), (140.0, 1.0));
    assert_eq!(next_rotation(1.0, -40.0, 0.0), (220.0, -1.0));
}

#[test]
fn single_trunk_scenario() {
    let mut params = Params {
        trunks: 1,
        levels: 1,
        ..Params::default()
    };
    params.level[0].branches = 3;
    params.level[0].curve_res = 5;
    let tree = Tree::new(params, 42).unwrap();

    assert_eq!(tree.trunks().len(), 1);
    assert_eq!(tree.trunks()[0].segments().len(), 5);
    assert_eq!(tree.stem_count(), 1);

    let mut calls = Calls::default();
    tree.traverse(&mut calls);
    assert_eq!(calls.enter_stem, 1);
    assert_eq!(calls.leave_stem, 1);
    assert_eq!(calls.leaves, 0);
}

#[test]
fn cancelled_token_stops_the_build() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = Tree::make(Params::default(), 1, &mut NullProgress, &cancel);
    assert!(matches!(result, Err(TreeError::Cancelled)));
}

/// Cancels the build from inside the progress sink.
struct CancelOnProgress(CancelToken);

impl Progress for CancelOnProgress {
    fn begin_phase(&mut self, _name: &str, _total: i64) -> Result<(), SinkError> {
        Ok(())
    }

    fn inc_progress(&mut self, _n: i64) -> Result<(), SinkError> {
        self.0.cancel();
        Ok(())
    }

    fn end_phase(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[test]
fn cancelling_mid_build_returns_no_tree() {
    let cancel = CancelToken::new();
    let mut sink = CancelOnProgress(cancel.clone());
    let result = Tree::make(Params::default(), 1, &mut sink, &cancel);
    assert!(matches!(result, Err(TreeError::Cancelled)));
}

struct BrokenSink;

impl Progress for BrokenSink {
    fn begin_phase(&mut self, _name: &str, _total: i64) -> Result<(), SinkError> {
        Err("display detached".into())
    }

    fn inc_progress(&mut self, _n: i64) -> Result<(), SinkError> {
        Err("display detached".into())
    }

    fn end_phase(&mut self) -> Result<(), SinkError> {
        Err("display detached".into())
    }
}

#[test]
fn failing_progress_sink_does_not_change_the_tree() {
    let params = splitting_params();
    let reference = Tree::new(params.clone(), 4).unwrap();
    let tree = Tree::make(params, 4, &mut BrokenSink, &CancelToken::new()).unwrap();
    assert_eq!(tree.stem_count(), reference.stem_count());
    assert_eq!(tree.leaf_count(), reference.leaf_count());
    assert_eq!(tree.bounds(), reference.bounds());
}

#[test]
fn invalid_params_name_the_offending_parameter() {
    let mut params = Params::default();
    params.level[1].taper = 4.0;
    match Tree::new(params, 1) {
        Err(TreeError::InvalidParams(err)) => {
            assert_eq!(err.name, "1Taper");
            assert!(err.to_string().contains("1Taper"));
        }
        other => panic!("expected a parameter error, got {other:?}"),
    }

    let params = Params {
        levels: 12,
        ..Params::default()
    };
    assert!(matches!(Tree::new(params, 1), Err(TreeError::InvalidParams(e)) if e.name == "Levels"));
}

#[test]
fn degenerate_branch_settings_do_not_fail() {
    let mut params = splitting_params();
    params.level[1].curve_res = 0;
    let tree = Tree::new(params, 3).unwrap();
    // Level 1 stems cannot grow, so only trunks and their clones remain.
    assert!(all_stems(&tree).iter().all(|s| s.level() == 0));
    assert_eq!(tree.leaf_count(), 0);
}
