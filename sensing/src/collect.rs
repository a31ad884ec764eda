//! Per-tick sense source collection.

use std::sync::Arc;

use field::{flood_fill, shadow_cast, SenseSourceData};
use glam::IVec3;
use hecs::Entity;
use util::HashSet;

use crate::{
    DirtyChannel, Position, ResistanceProvider, Runtime, SenseChannel,
    SenseSourceDefinition, SenseSourceState, SourcePhase,
};

/// Advance every source's state machine and recompute the dirty ones.
///
/// Returns the `(z, channel)` pairs whose composed map went stale.
/// Entities are visited in id order so a tick is deterministic.
pub(crate) fn run<P: ResistanceProvider>(
    rt: &mut Runtime<P>,
) -> HashSet<(i32, SenseChannel)> {
    let mut stale = HashSet::default();

    let mut entities: Vec<Entity> = rt
        .ecs
        .query::<(&Position, &SenseSourceDefinition, &SenseSourceState)>()
        .iter()
        .map(|(e, _)| e)
        .collect();
    entities.sort_unstable();

    for e in entities {
        step(rt, e, &mut stale);
    }

    stale
}

/// Footprint a source previously contributed to, for invalidation.
fn old_footprint(state: &SenseSourceState) -> Option<(i32, SenseChannel)> {
    let pos = state.last_position?;
    let def = state.last_definition?;
    state.data.is_some().then_some((pos.z, def.channel))
}

fn step<P: ResistanceProvider>(
    rt: &mut Runtime<P>,
    e: Entity,
    stale: &mut HashSet<(i32, SenseChannel)>,
) {
    let pos: IVec3 = rt.ecs.get::<&Position>(e).map(|p| p.0).unwrap_or_default();
    let def: SenseSourceDefinition =
        match rt.ecs.get::<&SenseSourceDefinition>(e) {
            Ok(d) => *d,
            Err(_) => return,
        };
    let state: SenseSourceState =
        match rt.ecs.get::<&SenseSourceState>(e) {
            Ok(s) => (*s).clone(),
            Err(_) => return,
        };

    let level_known = rt.provider.try_get(pos.z).is_some();
    if def.is_active() && !level_known {
        log::debug!(
            "sense source {e:?} at z{} has no resistance data, forcing inactive",
            pos.z
        );
    }

    // Inactive: disabled, emitting nothing, or no resistance data for
    // the level this tick.
    if !def.is_active() || !level_known {
        if let Some(footprint) = old_footprint(&state) {
            stale.insert(footprint);
        }
        write_state(
            rt,
            e,
            SenseSourceState {
                data: None,
                phase: SourcePhase::Inactive,
                last_position: Some(pos),
                last_definition: Some(def),
            },
        );
        return;
    }

    // Nobody listens on the channel: skip propagation entirely. Cached
    // data keeps contributing to the composed map, but invalidation
    // still has to land this tick before the cache flags are wiped, so
    // a field hit by a move, config edit or dirty region is dropped
    // rather than served stale after re-observation.
    if !rt.is_observed(def.channel) {
        let mut next = state;
        let invalidated = next.data.is_some()
            && (next.phase == SourcePhase::ActiveDirty
                || next.last_position != Some(pos)
                || next.last_definition != Some(def)
                || old_bounds_dirty(rt, &next, def.channel));
        if invalidated {
            if let Some(footprint) = old_footprint(&next) {
                stale.insert(footprint);
            }
            next.data = None;
        }
        next.phase = SourcePhase::ActiveUnobserved;
        next.last_position = Some(pos);
        next.last_definition = Some(def);
        write_state(rt, e, next);
        return;
    }

    let dirty = state.data.is_none()
        || state.phase == SourcePhase::ActiveDirty
        || state.last_position != Some(pos)
        || state.last_definition != Some(def)
        || old_bounds_dirty(rt, &state, def.channel);

    if !dirty {
        let mut next = state;
        next.phase = SourcePhase::ActiveClean;
        write_state(rt, e, next);
        return;
    }

    if let Some(footprint) = old_footprint(&state) {
        stale.insert(footprint);
    }

    let data = propagate(rt, pos, &def);
    stale.insert((pos.z, def.channel));
    write_state(
        rt,
        e,
        SenseSourceState {
            data: Some(Arc::new(data)),
            phase: SourcePhase::ActiveClean,
            last_position: Some(pos),
            last_definition: Some(def),
        },
    );
}

/// Whether the region the source last painted has been invalidated, so
/// a moved or removed obstruction re-fires even a stationary source.
fn old_bounds_dirty<P: ResistanceProvider>(
    rt: &Runtime<P>,
    state: &SenseSourceState,
    channel: SenseChannel,
) -> bool {
    let (Some(data), Some(last)) = (&state.data, state.last_position) else {
        return false;
    };
    let (min, max) = data.bounds();
    rt.dirty
        .is_dirty_rect(last.z, DirtyChannel::Sense(channel), min, max)
}

fn propagate<P: ResistanceProvider>(
    rt: &Runtime<P>,
    pos: IVec3,
    def: &SenseSourceDefinition,
) -> SenseSourceData {
    // Collection already verified the level exists this tick.
    let level = rt
        .provider
        .try_get(pos.z)
        .expect("collect: resistance level vanished mid-tick");
    let physics = rt.physics[&def.channel].as_ref();
    let reader = level.sense(def.channel);
    let origin = pos.truncate();

    if def.channel.is_line_of_sight() {
        shadow_cast(origin, def.intensity, physics, def.measurement, reader)
    } else {
        flood_fill(
            origin,
            def.intensity,
            physics,
            def.measurement,
            def.adjacency,
            reader,
        )
    }
}

fn write_state<P: ResistanceProvider>(
    rt: &mut Runtime<P>,
    e: Entity,
    next: SenseSourceState,
) {
    if let Ok(mut st) = rt.ecs.get::<&mut SenseSourceState>(e) {
        *st = next;
    }
}
