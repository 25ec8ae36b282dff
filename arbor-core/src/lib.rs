//! Procedural tree skeleton generation after the Weber/Penn model.
//!
//! A [`Tree`] is grown from [`Params`] and a seed. Consumers walk it with a
//! [`TreeTraversal`] and read each stem's cross-section rings through
//! [`Stem::sections`].
//!
//! Main components:
//! - [`config`]: raw tree and per-level parameters, validation.
//! - [`level`]: per-level growth policy resolved once per build.
//! - [`random`]: seeded random streams.
//! - [`frame`]: rotation + translation frames.
//! - [`segment`]: segments and their sampled subsegments.
//! - [`stem`]: stems, radius profile, section iteration.
//! - [`growth`]: the stem growth engine.
//! - [`section`]: cross-section rings.
//! - [`leaf`]: leaves and the bend toward light.
//! - [`tree`]: the tree aggregate and build entry point.
//! - [`traversal`]: the visitor protocol.
//! - [`progress`]: progress sinks and cancellation.
//! - [`error`]: error types.
//! - [`types`]: shared aliases and bounding boxes.

pub mod config;
pub mod error;
pub mod frame;
pub mod growth;
pub mod leaf;
pub mod level;
pub mod progress;
pub mod random;
pub mod section;
pub mod segment;
pub mod stem;
pub mod traversal;
pub mod tree;
pub mod types;

pub use config::{LevelSettings, Params, Shape};
pub use error::{ParamError, TreeError};
pub use frame::Frame;
pub use leaf::Leaf;
pub use level::{LevelParams, SegmentShape};
pub use progress::{CancelToken, NullProgress, Progress, SinkError};
pub use section::StemSection;
pub use segment::{Segment, Subsegment};
pub use stem::{RadiusProfile, Stem};
pub use traversal::TreeTraversal;
pub use tree::Tree;
pub use types::{Bounds, Vector};
