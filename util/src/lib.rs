//! Unopinionated standalone utilities.

mod chunked;
pub use chunked::{partition_spans, process_spans, worker_count, Span};

mod geom;
pub use geom::{Dir8, DirMask, VecExt, DIR_4, DIR_8};

/// Map with an efficient hash function.
pub use rustc_hash::FxHashMap as HashMap;

/// Set with an efficient hash function.
pub use rustc_hash::FxHashSet as HashSet;
