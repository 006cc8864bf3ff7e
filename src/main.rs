use log::{info, warn};

use planetfield::gpu::structures::STATUS_ARRIVED;
use planetfield::gpu::GpuDevice;
use planetfield::sim::{AgentSimulation, SimConfig};
use planetfield::terrain::{generate_pois, PlanetParams, TerrainBaker};
use planetfield::SimError;

const FRAME_DELTA: f32 = 1.0 / 60.0;
const FRAMES: u64 = 600;
const LOG_INTERVAL: u64 = 60;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
    }
}

fn run() -> Result<(), SimError> {
    let gpu = GpuDevice::new()?;

    let mut params = PlanetParams::default();
    params.texture_resolution = 512;

    let terrain = TerrainBaker::bake(&gpu, &params)?;
    info!(
        "terrain baked at {}^2 per face, height range [{:.2}, {:.2}]",
        terrain.resolution, terrain.min_height, terrain.max_height
    );

    let pois = generate_pois(&params, 8);

    let config = SimConfig {
        capacity: 2048,
        tex_width: 256,
        density_kill_threshold: 0,
    };
    let mut sim = AgentSimulation::new(params, config);
    sim.initialize(&gpu, &terrain, &pois)?;

    let spawned = sim.spawn_teams(&gpu, 512, 8.0, 0.999);
    info!("spawned {spawned} agents in two teams");

    for _ in 0..FRAMES {
        sim.step(&gpu, FRAME_DELTA);

        let frame = sim.frame_index();
        if frame % LOG_INTERVAL != 0 {
            continue;
        }
        info!("frame {frame}: {} agents live", sim.live_count());

        let Some(output) = sim.output() else { continue };
        match output.maybe_read_positions(&gpu, frame) {
            Some(Ok(_positions)) => match output.read_colors(&gpu) {
                Ok(colors) => {
                    let arrived = colors.iter().filter(|c| c[3] == STATUS_ARRIVED).count();
                    info!("frame {frame}: {arrived} agents arrived");
                }
                Err(e) => warn!("color readback failed: {e}"),
            },
            Some(Err(e)) => warn!("position readback failed: {e}"),
            None => {}
        }
    }

    sim.shutdown();
    Ok(())
}
