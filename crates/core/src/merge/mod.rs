//! Header propagation from the reference solution to each frame.
//!
//! Only keywords the reference has and the frame lacks are copied; values
//! already present in a frame are never overwritten.

mod propagate;

pub use propagate::{is_structural, CopiedKeyword, HeaderMerger, KeywordDiff};
