use glam::IVec2;
use serde::{Deserialize, Serialize};
use util::VecExt;

/// Metric used for the per-cell distance fed to a decay function.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMeasurement {
    /// King move distance, square fields.
    #[default]
    Chebyshev,
    /// Taxicab distance, diamond fields.
    Manhattan,
    /// Straight line distance, round fields.
    Euclidean,
}

impl DistanceMeasurement {
    pub fn measure(self, v: IVec2) -> f32 {
        match self {
            DistanceMeasurement::Chebyshev => v.cheb_len() as f32,
            DistanceMeasurement::Manhattan => v.taxi_len() as f32,
            DistanceMeasurement::Euclidean => v.as_vec2().length(),
        }
    }

    /// Cost of a single step in the given direction under this metric.
    pub fn step_cost(self, dir: util::Dir8) -> f32 {
        if !dir.is_diagonal() {
            return 1.0;
        }
        match self {
            DistanceMeasurement::Chebyshev => 1.0,
            DistanceMeasurement::Manhattan => 2.0,
            DistanceMeasurement::Euclidean => std::f32::consts::SQRT_2,
        }
    }
}

/// Which neighbors count as adjacent during propagation.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AdjacencyRule {
    /// Cardinal neighbors only.
    Cardinal,
    /// Cardinals plus diagonals.
    #[default]
    Octile,
}

impl AdjacencyRule {
    pub fn dirs(self) -> &'static [util::Dir8] {
        match self {
            AdjacencyRule::Cardinal => &util::Dir8::CARDINALS,
            AdjacencyRule::Octile => &util::Dir8::ALL,
        }
    }
}

/// Decay strategy converting source intensity and travel distance into
/// local signal strength.
///
/// Implementations are stateless and shared between many sources; the
/// two methods run once per (source, cell) pair during propagation and
/// must stay branch-light and allocation-free.
pub trait SensePhysics: Send + Sync {
    /// Greatest distance a source of the given intensity reaches.
    fn signal_radius(&self, intensity: f32) -> f32;

    /// Strength multiplier at the given travel distance, 0 outside the
    /// radius.
    fn signal_strength(&self, distance: f32, max_radius: f32) -> f32;
}

/// Straight linear falloff, radius equals intensity.
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearDecay;

impl SensePhysics for LinearDecay {
    fn signal_radius(&self, intensity: f32) -> f32 {
        intensity.abs()
    }

    fn signal_strength(&self, distance: f32, max_radius: f32) -> f32 {
        if max_radius <= 0.0 {
            return 0.0;
        }
        ((max_radius - distance) / max_radius).clamp(0.0, 1.0)
    }
}

/// Parabolic falloff with a wide nearly uniform core, for comic-style
/// light pools.
#[derive(Copy, Clone, Debug, Default)]
pub struct ExponentialDecay;

impl SensePhysics for ExponentialDecay {
    fn signal_radius(&self, intensity: f32) -> f32 {
        intensity.max(0.0).sqrt()
    }

    fn signal_strength(&self, distance: f32, max_radius: f32) -> f32 {
        if max_radius <= 0.0 {
            return 0.0;
        }
        let t = distance / max_radius;
        ((1.0 - t * t) * max_radius).max(0.0)
    }
}

/// Wrapper that keeps the inner radius but flattens the gradient into a
/// binary in-range test, for receptors that only care about
/// reachability.
#[derive(Copy, Clone, Debug, Default)]
pub struct FullStrength<P>(pub P);

impl<P: SensePhysics> SensePhysics for FullStrength<P> {
    fn signal_radius(&self, intensity: f32) -> f32 {
        self.0.signal_radius(intensity)
    }

    fn signal_strength(&self, distance: f32, max_radius: f32) -> f32 {
        if distance <= max_radius {
            1.0
        } else {
            0.0
        }
    }
}
