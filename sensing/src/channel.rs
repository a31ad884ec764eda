use std::sync::Arc;

use field::{ExponentialDecay, FullStrength, LinearDecay, SensePhysics};
use serde::{Deserialize, Serialize};

/// Named perceptual channel.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SenseChannel {
    Light,
    Vision,
    Touch,
    Heat,
    Sound,
    Smell,
}

use SenseChannel::*;

impl SenseChannel {
    pub const ALL: [SenseChannel; 6] =
        [Light, Vision, Touch, Heat, Sound, Smell];

    /// Line-of-sight channels propagate by shadowcasting, the rest
    /// flood around corners.
    pub fn is_line_of_sight(self) -> bool {
        !matches!(self, Sound | Smell)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Decay model selection for one channel.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DecayModel {
    #[default]
    Linear,
    Exponential,
    /// Linear radius, binary reachability gradient.
    FullStrength,
}

impl DecayModel {
    pub(crate) fn physics(self) -> Arc<dyn SensePhysics> {
        match self {
            DecayModel::Linear => Arc::new(LinearDecay),
            DecayModel::Exponential => Arc::new(ExponentialDecay),
            DecayModel::FullStrength => Arc::new(FullStrength(LinearDecay)),
        }
    }
}
