//! End-to-end engine scenarios over an in-memory resistance map.

use std::sync::Arc;

use glam::{ivec2, ivec3, IVec2};
use pretty_assertions::assert_eq;
use sensing::{
    MapResistance, Runtime, SenseChannel, SenseConfig, SenseError,
    SenseSourceDefinition, SourcePhase,
};
use util::{Dir8, DirMask};

fn engine() -> Runtime<MapResistance> {
    let mut rt = Runtime::new(MapResistance::new(8), SenseConfig::default())
        .expect("default config must bind every channel");
    rt.provider_mut().level_mut(0);
    rt
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn lit_room_falls_off_linearly() {
    let mut rt = engine();
    // Square room, wall ring at Chebyshev distance 5.
    for x in -5..=5 {
        for y in -5..=5 {
            if x.max(y).max(-x).max(-y) == 5 {
                rt.provider_mut().level_mut(0).set_all(ivec2(x, y), 1.0);
            }
        }
    }
    rt.observe(SenseChannel::Light);
    let lamp = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.tick();

    assert_eq!(rt.source_phase(lamp), Some(SourcePhase::ActiveClean));
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    for x in -4i32..=4 {
        for y in -4i32..=4 {
            let d = x.abs().max(y.abs());
            assert_close(map.intensity_at(ivec2(x, y)), (10 - d) as f32);
        }
    }
    // Walls are lit, the outside is not.
    assert_close(map.intensity_at(ivec2(5, 0)), 5.0);
    assert_eq!(map.intensity_at(ivec2(6, 0)), 0.0);
    assert_eq!(map.intensity_at(ivec2(7, 7)), 0.0);
}

#[test]
fn overlapping_sources_compose_by_max() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 5.0),
    );
    rt.spawn_source(
        ivec3(4, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 8.0),
    );
    rt.tick();

    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    // Never 5 + 4 = 9 at the weak lamp, never 3 + 6 anywhere between.
    assert_close(map.intensity_at(ivec2(0, 0)), 5.0);
    assert_close(map.intensity_at(ivec2(2, 0)), 6.0);
    assert_close(map.intensity_at(ivec2(4, 0)), 8.0);
}

#[test]
fn sound_rounds_a_corner_light_does_not() {
    let mut rt = engine();
    // Wall segment across the straight line between source and probe.
    for y in -2..=2 {
        rt.provider_mut().level_mut(0).set_all(ivec2(2, y), 1.0);
    }
    rt.observe(SenseChannel::Light);
    rt.observe(SenseChannel::Sound);
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Sound, 10.0),
    );
    rt.tick();

    let light = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    let sound = rt.try_get_global_sense_map(0, SenseChannel::Sound).unwrap();
    assert_close(light.intensity_at(ivec2(1, 0)), 9.0);
    assert_eq!(light.intensity_at(ivec2(4, 0)), 0.0);
    // Shortest detour past the wall end is six diagonal-capable steps.
    assert_close(sound.intensity_at(ivec2(4, 0)), 4.0);
}

#[test]
fn obstruction_change_refires_a_stationary_source() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.tick();
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(3, 0)), 7.0);

    // Drop a wall without touching the source.
    rt.provider_mut().level_mut(0).set_all(ivec2(2, 0), 1.0);
    rt.note_obstruction_change(0, ivec2(2, 0));
    rt.tick();

    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(1, 0)), 9.0);
    assert_close(map.intensity_at(ivec2(2, 0)), 8.0);
    assert_eq!(map.intensity_at(ivec2(3, 0)), 0.0);
}

#[test]
fn channel_change_leaves_other_channels_cached() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    rt.observe(SenseChannel::Sound);
    let lamp = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    let bell = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Sound, 10.0),
    );
    rt.tick();
    let lamp_data = rt.try_get_sense_source_data(lamp).unwrap();
    let bell_data = rt.try_get_sense_source_data(bell).unwrap();

    rt.provider_mut()
        .level_mut(0)
        .sense_mut(SenseChannel::Sound)
        .set(ivec2(1, 0), 1.0);
    rt.note_channel_change(0, SenseChannel::Sound, ivec2(1, 0));
    rt.tick();

    assert!(Arc::ptr_eq(
        &lamp_data,
        &rt.try_get_sense_source_data(lamp).unwrap()
    ));
    assert!(!Arc::ptr_eq(
        &bell_data,
        &rt.try_get_sense_source_data(bell).unwrap()
    ));
    let sound = rt.try_get_global_sense_map(0, SenseChannel::Sound).unwrap();
    // Opaque cells are never entered, sound flows around instead.
    assert_eq!(sound.intensity_at(ivec2(1, 0)), 0.0);
    assert_close(sound.intensity_at(ivec2(2, 0)), 8.0);
}

#[test]
fn unobserved_channel_skips_propagation() {
    let mut rt = engine();
    let vent = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Smell, 6.0),
    );
    rt.tick();
    assert_eq!(rt.source_phase(vent), Some(SourcePhase::ActiveUnobserved));
    assert!(rt.try_get_sense_source_data(vent).is_none());
    assert!(rt.try_get_global_sense_map(0, SenseChannel::Smell).is_none());

    rt.observe(SenseChannel::Smell);
    rt.tick();
    assert_eq!(rt.source_phase(vent), Some(SourcePhase::ActiveClean));
    let map = rt.try_get_global_sense_map(0, SenseChannel::Smell).unwrap();
    assert_close(map.intensity_at(ivec2(1, 0)), 5.0);
}

#[test]
fn obstruction_change_while_unobserved_is_not_lost() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    let lamp = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.tick();
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(3, 0)), 7.0);

    // The wall goes up while nobody is looking.
    rt.unobserve(SenseChannel::Light);
    rt.tick();
    assert_eq!(rt.source_phase(lamp), Some(SourcePhase::ActiveUnobserved));
    rt.provider_mut().level_mut(0).set_all(ivec2(2, 0), 1.0);
    rt.note_obstruction_change(0, ivec2(2, 0));
    rt.tick();
    // The invalidated field stops being served.
    assert!(rt.try_get_sense_source_data(lamp).is_none());

    rt.observe(SenseChannel::Light);
    rt.tick();
    assert_eq!(rt.source_phase(lamp), Some(SourcePhase::ActiveClean));
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(2, 0)), 8.0);
    assert_eq!(map.intensity_at(ivec2(3, 0)), 0.0);
}

#[test]
fn disabling_a_source_clears_its_map() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    let lamp = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.tick();
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(0, 0)), 10.0);

    let mut def = rt.definition(lamp).unwrap();
    def.enabled = false;
    rt.set_definition(lamp, def);
    rt.tick();

    assert_eq!(rt.source_phase(lamp), Some(SourcePhase::Inactive));
    assert!(rt.try_get_sense_source_data(lamp).is_none());
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_eq!(map.intensity_at(ivec2(0, 0)), 0.0);
}

#[test]
fn despawn_erases_the_contribution() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 5.0),
    );
    let bright = rt.spawn_source(
        ivec3(4, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 8.0),
    );
    rt.tick();
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(4, 0)), 8.0);

    rt.despawn(bright);
    rt.tick();
    // Only the weak lamp's tail remains.
    let map = rt.try_get_global_sense_map(0, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(4, 0)), 1.0);
}

#[test]
fn missing_level_forces_inactive_until_data_arrives() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    let lamp = rt.spawn_source(
        ivec3(0, 0, 3),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.tick();
    assert_eq!(rt.source_phase(lamp), Some(SourcePhase::Inactive));

    rt.provider_mut().level_mut(3);
    rt.tick();
    assert_eq!(rt.source_phase(lamp), Some(SourcePhase::ActiveClean));
    let map = rt.try_get_global_sense_map(3, SenseChannel::Light).unwrap();
    assert_close(map.intensity_at(ivec2(0, 0)), 10.0);
}

#[test]
fn unbound_channel_is_a_wiring_error() {
    let mut config = SenseConfig::default();
    config.decay.remove(&SenseChannel::Heat);
    let Err(err) = Runtime::new(MapResistance::new(8), config) else {
        panic!("wiring must fail with an unbound channel");
    };
    assert!(matches!(err, SenseError::MissingPhysics(SenseChannel::Heat)));
}

#[test]
fn directionality_tracks_wall_edits() {
    let mut rt = engine();
    rt.provider_mut().level_mut(0).set_all(ivec2(1, 0), 1.0);
    rt.note_obstruction_change(0, ivec2(1, 0));
    rt.tick();

    let view = rt.try_get_directionality(0).unwrap();
    let at_origin = view.mask_at(ivec2(0, 0));
    assert!(!at_origin.has(Dir8::East));
    // Diagonals past the wall still have an open flanking cardinal.
    assert!(at_origin.has(Dir8::Northeast));
    assert!(at_origin.has(Dir8::Southeast));
    assert_eq!(
        view.mask_at(ivec2(2, 0)),
        DirMask::all().difference(DirMask::WEST)
    );
}

#[test]
fn perceived_trail_leads_back_to_the_source() {
    let mut rt = engine();
    rt.observe(SenseChannel::Sound);
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Sound, 10.0),
    );
    rt.tick();

    let view = rt.perceived_view(ivec3(4, 0, 0), SenseChannel::Sound);
    let probe: Vec<IVec2> =
        (0..=4).rev().map(|x| ivec2(x, 0)).collect();
    for (i, &pos) in probe.iter().enumerate() {
        assert_close(view.intensity_at(pos), 6.0 + i as f32);
    }
    // Off-trail cells stay unwritten.
    assert_eq!(view.intensity_at(ivec2(0, 4)), 0.0);
}

#[test]
fn invalidation_forces_a_recompute() {
    let mut rt = engine();
    rt.observe(SenseChannel::Light);
    let lamp = rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, 10.0),
    );
    rt.tick();
    let first = rt.try_get_sense_source_data(lamp).unwrap();

    rt.tick();
    assert!(Arc::ptr_eq(
        &first,
        &rt.try_get_sense_source_data(lamp).unwrap()
    ));

    rt.invalidate_source(lamp);
    rt.tick();
    assert!(!Arc::ptr_eq(
        &first,
        &rt.try_get_sense_source_data(lamp).unwrap()
    ));
}
