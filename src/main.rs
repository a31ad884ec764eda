use anyhow::Result;
use clap::Parser;
use glam::{ivec2, ivec3, IVec2};
use sensing::{
    MapResistance, ResistanceProvider, Runtime, SenseChannel, SenseConfig,
    SenseSourceDefinition,
};

#[derive(Parser, Debug)]
struct Args {
    /// Room half-width in cells
    #[arg(long, default_value_t = 8)]
    size: i32,

    /// Source intensity
    #[arg(long, default_value_t = 10.0)]
    intensity: f32,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let r = args.size.max(2);

    let mut terrain = MapResistance::new(16);
    let level = terrain.level_mut(0);
    // Walled room with a pillar off-center so both propagation modes
    // have something to work around.
    for x in -r..=r {
        for y in -r..=r {
            if x.abs() == r || y.abs() == r {
                level.set_all(ivec2(x, y), 1.0);
            }
        }
    }
    for y in -2..=2 {
        level.set_all(ivec2(3, y), 1.0);
    }

    let mut rt = Runtime::new(terrain, SenseConfig::default())?;
    rt.observe(SenseChannel::Light);
    rt.observe(SenseChannel::Sound);
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Light, args.intensity),
    );
    rt.spawn_source(
        ivec3(0, 0, 0),
        SenseSourceDefinition::new(SenseChannel::Sound, args.intensity),
    );
    rt.tick();
    log::info!("computed sense maps for a {0}x{0} room", 2 * r + 1);

    for channel in [SenseChannel::Light, SenseChannel::Sound] {
        println!("{channel:?}:");
        print_map(&rt, channel, r);
        println!();
    }

    Ok(())
}

fn print_map(rt: &Runtime<MapResistance>, channel: SenseChannel, r: i32) {
    let Some(map) = rt.try_get_global_sense_map(0, channel) else {
        println!("  (empty)");
        return;
    };
    for y in -r..=r {
        let row: String = (-r..=r)
            .map(|x| glyph(rt, map.intensity_at(ivec2(x, y)), ivec2(x, y)))
            .collect();
        println!("  {row}");
    }
}

fn glyph(rt: &Runtime<MapResistance>, intensity: f32, pos: IVec2) -> char {
    let solid = rt
        .provider()
        .try_get(0)
        .map_or(false, |level| level.movement().get(pos) >= 1.0);
    if solid {
        '#'
    } else if intensity <= 0.0 {
        '.'
    } else {
        let n = (intensity.round() as u32).min(9);
        char::from_digit(n, 10).unwrap_or('9')
    }
}
