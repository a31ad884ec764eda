use std::sync::Arc;

use field::{AdjacencyRule, DistanceMeasurement, SensePhysics, SenseSourceData};
use glam::{IVec2, IVec3};
use hecs::Entity;
use util::HashMap;

use crate::{
    blit::SenseMap, collect, DecayModel, DirectionalityMap,
    DirectionalityView, DirtyCache, DirtyChannel, Position,
    ResistanceProvider, SenseChannel, SenseError, SenseSourceDefinition,
    SenseSourceState, SourcePhase,
};

/// Engine configuration.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SenseConfig {
    /// World cells per dirty-cache cell along one axis.
    pub cache_resolution: i32,
    /// Dirty-cache cells per cache tile along one axis.
    pub cache_tile: i32,
    pub cache_offset: IVec2,
    /// Per-channel overrides of `cache_resolution`.
    #[serde(skip)]
    pub cache_overrides: HashMap<DirtyChannel, i32>,
    /// World cells per directionality tile along one axis.
    pub directionality_tile: i32,
    /// Defaults applied by [`SenseConfig::definition`].
    pub default_measurement: DistanceMeasurement,
    pub default_adjacency: AdjacencyRule,
    /// Decay model per channel. Every channel must be bound.
    pub decay: std::collections::BTreeMap<SenseChannel, DecayModel>,
    /// Worker count for the fork-join directionality pass, `None` for
    /// available hardware parallelism.
    pub workers: Option<usize>,
}

impl Default for SenseConfig {
    fn default() -> Self {
        SenseConfig {
            cache_resolution: 4,
            cache_tile: 8,
            cache_offset: IVec2::ZERO,
            cache_overrides: Default::default(),
            directionality_tile: 16,
            default_measurement: Default::default(),
            default_adjacency: Default::default(),
            decay: SenseChannel::ALL
                .into_iter()
                .map(|c| (c, DecayModel::Linear))
                .collect(),
            workers: None,
        }
    }
}

impl SenseConfig {
    /// Source definition with this config's default metric and
    /// adjacency.
    pub fn definition(
        &self,
        channel: SenseChannel,
        intensity: f32,
    ) -> SenseSourceDefinition {
        SenseSourceDefinition {
            measurement: self.default_measurement,
            adjacency: self.default_adjacency,
            ..SenseSourceDefinition::new(channel, intensity)
        }
    }
}

/// Main sensing engine container.
///
/// Owns the source entities, the invalidation cache, the derived
/// directionality grid and the composed per-level sense maps. One
/// [`tick`] advances everything in a fixed order: directionality
/// rebuild, source collection, re-blit, cache clean.
///
/// [`tick`]: Runtime::tick
pub struct Runtime<P> {
    pub(crate) config: SenseConfig,
    pub(crate) provider: P,
    pub(crate) physics: HashMap<SenseChannel, Arc<dyn SensePhysics>>,
    pub(crate) ecs: hecs::World,
    pub(crate) dirty: DirtyCache,
    pub(crate) directionality: DirectionalityMap,
    pub(crate) maps: HashMap<(i32, SenseChannel), SenseMap>,
    observers: HashMap<SenseChannel, usize>,
    /// Map regions orphaned outside collection, e.g. by despawns.
    pending_stale: Vec<(i32, SenseChannel)>,
}

impl<P: ResistanceProvider> Runtime<P> {
    /// Wire up the engine. Fails with a descriptive error when a sense
    /// channel has no decay model bound.
    pub fn new(provider: P, config: SenseConfig) -> Result<Self, SenseError> {
        let mut physics = HashMap::default();
        for channel in SenseChannel::ALL {
            let model = config
                .decay
                .get(&channel)
                .copied()
                .ok_or(SenseError::MissingPhysics(channel))?;
            physics.insert(channel, model.physics());
        }

        let dirty = DirtyCache::new(
            config.cache_resolution,
            config.cache_tile,
            config.cache_offset,
            &config.cache_overrides,
        );
        let directionality = DirectionalityMap::new(config.directionality_tile);

        Ok(Runtime {
            config,
            provider,
            physics,
            ecs: hecs::World::new(),
            dirty,
            directionality,
            maps: Default::default(),
            observers: Default::default(),
            pending_stale: Default::default(),
        })
    }

    pub fn config(&self) -> &SenseConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable terrain access. Pair edits with [`note_obstruction_change`]
    /// or [`note_channel_change`] so the caches find out.
    ///
    /// [`note_obstruction_change`]: Runtime::note_obstruction_change
    /// [`note_channel_change`]: Runtime::note_channel_change
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    // Source management ////////////////////////////////////

    pub fn spawn_source(
        &mut self,
        pos: IVec3,
        def: SenseSourceDefinition,
    ) -> Entity {
        self.ecs
            .spawn((Position(pos), def, SenseSourceState::default()))
    }

    /// Remove an entity, scheduling a re-blit of any region its field
    /// still covers.
    pub fn despawn(&mut self, e: Entity) {
        if let Ok(st) = self.ecs.get::<&SenseSourceState>(e) {
            if let (Some(last), Some(def), true) =
                (st.last_position, st.last_definition, st.data.is_some())
            {
                self.pending_stale.push((last.z, def.channel));
            }
        }
        let _ = self.ecs.despawn(e);
    }

    pub fn move_source(&mut self, e: Entity, pos: IVec3) -> bool {
        match self.ecs.get::<&mut Position>(e) {
            Ok(mut p) => {
                p.0 = pos;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_definition(
        &mut self,
        e: Entity,
        def: SenseSourceDefinition,
    ) -> bool {
        match self.ecs.get::<&mut SenseSourceDefinition>(e) {
            Ok(mut d) => {
                *d = def;
                true
            }
            Err(_) => false,
        }
    }

    pub fn definition(&self, e: Entity) -> Option<SenseSourceDefinition> {
        self.ecs.get::<&SenseSourceDefinition>(e).ok().map(|d| *d)
    }

    pub fn source_phase(&self, e: Entity) -> Option<SourcePhase> {
        self.ecs.get::<&SenseSourceState>(e).ok().map(|s| s.phase)
    }

    /// Force a source to recompute on the next tick regardless of the
    /// cache.
    pub fn invalidate_source(&mut self, e: Entity) {
        if let Ok(mut st) = self.ecs.get::<&mut SenseSourceState>(e) {
            if st.phase != SourcePhase::Inactive {
                st.phase = SourcePhase::ActiveDirty;
            }
        }
    }

    // Receptor registration ////////////////////////////////

    /// Declare that something is listening on a channel. Unobserved
    /// channels skip propagation entirely.
    pub fn observe(&mut self, channel: SenseChannel) {
        *self.observers.entry(channel).or_insert(0) += 1;
    }

    pub fn unobserve(&mut self, channel: SenseChannel) {
        if let Some(n) = self.observers.get_mut(&channel) {
            *n = n.saturating_sub(1);
        }
    }

    pub(crate) fn is_observed(&self, channel: SenseChannel) -> bool {
        self.observers.get(&channel).copied().unwrap_or(0) > 0
    }

    // Invalidation /////////////////////////////////////////

    /// Note a terrain edit that affects movement and every sense.
    pub fn note_obstruction_change(&mut self, z: i32, pos: IVec2) {
        self.dirty.mark_dirty(z, DirtyChannel::Global, pos);
        self.dirty.mark_dirty(z, DirtyChannel::Movement, pos);
        self.directionality.note_change(z, pos);
    }

    /// Note an edit on a single sense channel's resistance.
    pub fn note_channel_change(
        &mut self,
        z: i32,
        channel: SenseChannel,
        pos: IVec2,
    ) {
        self.dirty.mark_dirty(z, DirtyChannel::Sense(channel), pos);
    }

    /// Invalidate the whole world, e.g. after loading a map.
    pub fn mark_globally_dirty(&mut self) {
        self.dirty.mark_globally_dirty();
    }

    pub fn dirty_cache(&self) -> &DirtyCache {
        &self.dirty
    }

    // Tick /////////////////////////////////////////////////

    /// Advance one game-loop step.
    pub fn tick(&mut self) {
        let workers = util::worker_count(self.config.workers);

        // Fork-join phase: refresh directionality where obstructions
        // changed. The rest of the tick is single threaded.
        for z in self.directionality.stale_levels() {
            if let Some(level) = self.provider.try_get(z) {
                self.directionality.rebuild(z, level.movement(), workers);
            }
        }

        let mut stale = collect::run(self);
        stale.extend(self.pending_stale.drain(..));

        // Max-composition cannot be decremented, so a level's map is
        // rebuilt from scratch whenever any contributor changed.
        let mut stale: Vec<(i32, SenseChannel)> = stale.into_iter().collect();
        stale.sort_unstable_by_key(|&(z, c)| (z, c as usize));
        for (z, channel) in stale {
            self.reblit(z, channel);
        }

        self.dirty.mark_clean();
    }

    fn reblit(&mut self, z: i32, channel: SenseChannel) {
        log::debug!("re-blitting sense map z{z} {channel:?}");
        let map = self.maps.entry((z, channel)).or_default();
        map.clear();
        for (_, (pos, def, state)) in self
            .ecs
            .query::<(&Position, &SenseSourceDefinition, &SenseSourceState)>()
            .iter()
        {
            if def.channel != channel || pos.0.z != z {
                continue;
            }
            if !matches!(
                state.phase,
                SourcePhase::ActiveClean | SourcePhase::ActiveUnobserved
            ) {
                continue;
            }
            if let Some(data) = &state.data {
                map.blit(data);
            }
        }
    }

    // Queries //////////////////////////////////////////////

    pub fn try_get_global_sense_map(
        &self,
        z: i32,
        channel: SenseChannel,
    ) -> Option<&SenseMap> {
        self.maps.get(&(z, channel))
    }

    pub fn try_get_sense_source_data(
        &self,
        e: Entity,
    ) -> Option<Arc<SenseSourceData>> {
        self.ecs
            .get::<&SenseSourceState>(e)
            .ok()
            .and_then(|s| s.data.clone())
    }

    pub fn try_get_directionality(
        &self,
        z: i32,
    ) -> Option<DirectionalityView<'_>> {
        self.directionality.try_view(z)
    }

    /// Per-receptor perception view: trail-follow every source field of
    /// the channel on the receptor's level from its position.
    pub fn perceived_view(&self, pos: IVec3, channel: SenseChannel) -> SenseMap {
        let mut view = SenseMap::default();
        for (_, (p, def, state)) in self
            .ecs
            .query::<(&Position, &SenseSourceDefinition, &SenseSourceState)>()
            .iter()
        {
            if def.channel != channel || p.0.z != pos.z {
                continue;
            }
            if let Some(data) = &state.data {
                view.follow_trail(data, pos.truncate());
            }
        }
        view
    }
}
