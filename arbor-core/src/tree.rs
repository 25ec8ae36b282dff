//! The tree aggregate and its build entry point.

use tracing::{info, info_span, warn};

use crate::{
    config::Params,
    error::TreeError,
    growth::Growth,
    level::LevelParams,
    progress::{CancelToken, NullProgress, Progress, ProgressGuard},
    stem::Stem,
    traversal::Counter,
    types::{Bounds, Vector},
};

/// A fully grown tree. Immutable once built.
#[derive(Clone, Debug)]
pub struct Tree {
    seed: u64,
    params: Params,
    levels: Vec<LevelParams>,
    scale: f64,
    trunks: Vec<Stem>,
    bounds: Bounds,
    stem_count: usize,
    leaf_count: usize,
}

impl Tree {
    /// Grows a tree without progress reporting or cancellation.
    pub fn new(params: Params, seed: u64) -> Result<Tree, TreeError> {
        Self::make(params, seed, &mut NullProgress, &CancelToken::new())
    }

    /// Validates `params` and grows the tree for `seed`.
    ///
    /// The same `(params, seed)` always yields the same tree. Progress sink
    /// failures are logged and ignored. When `cancel` fires, the build
    /// stops at the next stem and returns [`TreeError::Cancelled`].
    pub fn make(
        params: Params,
        seed: u64,
        progress: &mut dyn Progress,
        cancel: &CancelToken,
    ) -> Result<Tree, TreeError> {
        let span = info_span!("tree_make", seed, species = %params.species);
        let _enter = span.enter();

        params.validate()?;
        if params.leaves != 0 && params.levels == 1 {
            warn!(leaves = params.leaves, "trunks cannot carry leaves, no leaves are grown");
        }

        let levels = LevelParams::resolve(&params, seed);
        let mut guard = ProgressGuard::new(progress);
        guard.begin("growing stems", estimate_stems(&params));
        let grown = {
            let mut growth = Growth::new(&params, &levels, seed, &mut guard, cancel);
            growth.make_trunks().map(|trunks| (trunks, growth.scale()))
        };
        guard.end();
        let (trunks, scale) = grown?;

        let mut bounds = Bounds::EMPTY;
        for trunk in &trunks {
            bounds.merge(trunk.bounds());
        }

        let mut tree = Tree {
            seed,
            params,
            levels,
            scale,
            trunks,
            bounds,
            stem_count: 0,
            leaf_count: 0,
        };
        let mut counter = Counter::default();
        tree.traverse(&mut counter);
        tree.stem_count = counter.stems;
        tree.leaf_count = counter.leaves;

        info!(
            stems = tree.stem_count,
            leaves = tree.leaf_count,
            height = tree.height(),
            "tree grown"
        );
        Ok(tree)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn species(&self) -> &str {
        &self.params.species
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Scale drawn for this tree (`Scale ± ScaleV`).
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn trunks(&self) -> &[Stem] {
        &self.trunks
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn min_point(&self) -> Vector {
        self.bounds.min
    }

    pub fn max_point(&self) -> Vector {
        self.bounds.max
    }

    /// Number of stems, trunks and clones included.
    pub fn stem_count(&self) -> usize {
        self.stem_count
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Highest point of the tree.
    pub fn height(&self) -> f64 {
        if self.bounds.is_empty() {
            0.0
        } else {
            self.bounds.max.z
        }
    }

    /// Twice the largest horizontal distance of a bounding box corner from
    /// the vertical axis.
    pub fn width(&self) -> f64 {
        if self.bounds.is_empty() {
            return 0.0;
        }
        let (min, max) = (self.bounds.min, self.bounds.max);
        2.0 * min.truncate().length().max(max.truncate().length())
    }

    pub fn leaf_length(&self) -> f64 {
        self.params.leaf_scale / self.params.leaf_quality.sqrt()
    }

    pub fn leaf_width(&self) -> f64 {
        self.params.leaf_scale * self.params.leaf_scale_x / self.params.leaf_quality.sqrt()
    }

    pub fn leaf_stem_length(&self) -> f64 {
        self.params.leaf_stem_len
    }

    pub fn leaf_shape(&self) -> &str {
        &self.params.leaf_shape
    }

    /// Resolved parameters of `level`, including the leaf placement entry.
    pub fn level_params(&self, level: usize) -> Option<&LevelParams> {
        self.levels.get(level)
    }

    /// Diagnostic mesh description of `level`, see
    /// [`LevelParams::vertex_info`].
    pub fn vertex_info(&self, level: usize) -> Option<String> {
        self.levels.get(level).map(LevelParams::vertex_info)
    }
}

/// Rough number of stems a build will grow, for progress totals.
fn estimate_stems(params: &Params) -> i64 {
    let mut per_trunk: i64 = 1;
    let mut layer: i64 = 1;
    for settings in params.level.iter().take(params.levels.saturating_sub(1)) {
        layer = layer.saturating_mul(settings.branches as i64);
        per_trunk = per_trunk.saturating_add(layer);
    }
    per_trunk.saturating_mul(params.trunks as i64)
}
