//! Components attached to sense-emitting entities.

use std::sync::Arc;

use field::{AdjacencyRule, DistanceMeasurement, SenseSourceData};
use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::SenseChannel;

/// World cell an entity occupies; z is the map level.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize,
)]
pub struct Position(pub IVec3);

/// Static sense emission config for one entity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default = "SenseSourceDefinition::default_light")]
pub struct SenseSourceDefinition {
    pub channel: SenseChannel,
    pub measurement: DistanceMeasurement,
    pub adjacency: AdjacencyRule,
    pub intensity: f32,
    pub enabled: bool,
}

impl SenseSourceDefinition {
    pub fn new(channel: SenseChannel, intensity: f32) -> Self {
        SenseSourceDefinition {
            channel,
            measurement: Default::default(),
            adjacency: Default::default(),
            intensity,
            enabled: true,
        }
    }

    fn default_light() -> Self {
        SenseSourceDefinition::new(SenseChannel::Light, 0.0)
    }

    /// Emitting anything at all right now.
    pub fn is_active(&self) -> bool {
        self.enabled && self.intensity > 0.0
    }
}

/// Lifecycle phase of a source, advanced once per tick by collection.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SourcePhase {
    /// Never seen by collection yet.
    #[default]
    Unregistered,
    /// Disabled, zero intensity, or missing resistance data.
    Inactive,
    /// Emitting, but no receptor listens on the channel, so propagation
    /// is skipped.
    ActiveUnobserved,
    /// Field data is current.
    ActiveClean,
    /// Needs recomputation this tick.
    ActiveDirty,
}

/// Mutable per-entity sensing state.
///
/// `data` swaps atomically between sealed buffers; readers holding the
/// old `Arc` are never invalidated mid-read.
#[derive(Clone, Debug, Default)]
pub struct SenseSourceState {
    pub(crate) data: Option<Arc<SenseSourceData>>,
    pub(crate) phase: SourcePhase,
    pub(crate) last_position: Option<IVec3>,
    pub(crate) last_definition: Option<SenseSourceDefinition>,
}

impl SenseSourceState {
    pub fn phase(&self) -> SourcePhase {
        self.phase
    }

    pub fn data(&self) -> Option<&Arc<SenseSourceData>> {
        self.data.as_ref()
    }
}
