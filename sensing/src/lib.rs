//! Incremental perceptual field engine for tile-based worlds.
//!
//! Point sources radiate senses (light, sound, smell and friends)
//! across per-level resistance maps; a multi-resolution dirty cache
//! keeps recomputation proportional to what actually changed, and the
//! composed per-level maps plus traversal directionality grids are
//! served to receptor and movement consumers.

pub use field::{
    AdjacencyRule, DistanceMeasurement, SensePhysics, SenseSourceData,
};

mod blit;
pub use blit::SenseMap;

mod channel;
pub use channel::{DecayModel, SenseChannel};

mod collect;

mod directionality;
pub use directionality::{
    directionality_mask, DirectionalityMap, DirectionalityView,
};

mod dirty;
pub use dirty::{DirtyCache, DirtyChannel};

mod ecs;
pub use ecs::{Position, SenseSourceDefinition, SenseSourceState, SourcePhase};

mod resistance;
pub use resistance::{
    MapResistance, ResistanceField, ResistanceLevel, ResistanceProvider,
};

mod runtime;
pub use runtime::{Runtime, SenseConfig};

/// Wiring-time configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum SenseError {
    #[error("no decay model bound for sense channel {0:?}")]
    MissingPhysics(SenseChannel),
}
