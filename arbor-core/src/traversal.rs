//! Hierarchical visitor over a grown tree.
//!
//! Order: enter tree, then for each trunk in creation order: enter stem,
//! its children (substems and clones, in creation order) recursively, its
//! leaves, leave stem; finally leave tree. Exporters number vertices in
//! this order, so it must not change for a given tree.
//!
//! Returning `false` from `enter_*` skips the children of that node and its
//! matching `leave_*`; the caller's siblings are still visited. Returning
//! `false` from `leave_stem` stops the remaining siblings at that level,
//! and `false` from `visit_leaf` the remaining leaves of the stem.

use crate::{leaf::Leaf, stem::Stem, tree::Tree};

/// Callbacks invoked while walking a [`Tree`]. Every method defaults to
/// `true` (continue).
pub trait TreeTraversal {
    fn enter_tree(&mut self, _tree: &Tree) -> bool {
        true
    }

    fn leave_tree(&mut self, _tree: &Tree) -> bool {
        true
    }

    fn enter_stem(&mut self, _stem: &Stem) -> bool {
        true
    }

    fn leave_stem(&mut self, _stem: &Stem) -> bool {
        true
    }

    fn visit_leaf(&mut self, _leaf: &Leaf) -> bool {
        true
    }
}

impl Tree {
    /// Walks the whole tree. Returns the result of `leave_tree`, or `true`
    /// when `enter_tree` declined.
    pub fn traverse(&self, visitor: &mut dyn TreeTraversal) -> bool {
        if !visitor.enter_tree(self) {
            return true;
        }
        for trunk in self.trunks() {
            if !trunk.traverse(visitor) {
                break;
            }
        }
        visitor.leave_tree(self)
    }
}

impl Stem {
    /// Walks this stem and everything grown on it.
    ///
    /// ### Returns
    /// `false` when the caller should stop visiting this stem's siblings.
    pub fn traverse(&self, visitor: &mut dyn TreeTraversal) -> bool {
        if !visitor.enter_stem(self) {
            return true;
        }
        for child in &self.children {
            if !child.traverse(visitor) {
                break;
            }
        }
        for leaf in &self.leaves {
            if !visitor.visit_leaf(leaf) {
                break;
            }
        }
        visitor.leave_stem(self)
    }
}

/// Counts stems and leaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    pub stems: usize,
    pub leaves: usize,
}

impl TreeTraversal for Counter {
    fn enter_stem(&mut self, _stem: &Stem) -> bool {
        self.stems += 1;
        true
    }

    fn visit_leaf(&mut self, _leaf: &Leaf) -> bool {
        self.leaves += 1;
        true
    }
}
