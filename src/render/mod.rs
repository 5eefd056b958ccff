//! Visualization.
//!
//! Four views are produced per frame:
//!
//! - `depth`: inverted unit depth as grayscale
//! - `map`: per-cell mean distance, JET colored
//! - `distance`: per-pixel distance, JET colored
//! - `image`: the camera frame with grid lines, sample dots and their distances
//!
//! Distance labels (`"1.23 m"`) are drawn with a bundled monospace font and
//! also returned as `Label` records.

mod colormap;
mod overlay;
mod sink;

pub use colormap::{gray_unit, jet, jet_minmax, minmax_to_u8};
pub use overlay::{compose_views, FrameViews, Label};
pub use sink::{DisplaySink, NullSink, SnapshotSink, View};
