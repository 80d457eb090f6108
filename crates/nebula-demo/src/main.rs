//! Headless geosphere flight.
//!
//! Loads `config.ron` (CLI flags override it), registers one body and flies
//! a camera from orbit down to the surface, logging LOD statistics as the
//! patch tree refines. Nothing is drawn; a counting renderer stands in for
//! the GPU.
//!
//! Run with `cargo run -p nebula-demo -- --detail 2 --ticks 300`.

mod flight;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nebula_config::{CliArgs, Config};
use nebula_cubesphere::{BodyDef, BodyId};
use nebula_geosphere::GeoSphereRegistry;
use nebula_terrain::{AsyncJobQueue, FbmTerrain, Terrain, default_worker_count};
use tracing::{info, warn};

use crate::flight::{CountingRenderer, altitude_at, camera_at, settings_from_config};

const BODY: BodyId = BodyId(1);

/// Wall-clock time of one simulated frame.
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Frames to keep updating after the flight ends so outstanding splits land.
const SETTLE_FRAMES: u32 = 240;

/// Log statistics every this many frames.
const STATS_INTERVAL: u32 = 30;

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("nebula-geosphere")
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = (!config.debug.log_dir.is_empty()).then(|| config_dir.join(&config.debug.log_dir));
    nebula_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    run_flight(&config);
}

fn run_flight(config: &Config) {
    let threads = match config.jobs.worker_threads {
        0 => default_worker_count(),
        n => n,
    };
    let jobs = AsyncJobQueue::new(threads, config.jobs.max_queued, config.jobs.result_capacity);
    let mut registry = GeoSphereRegistry::new(settings_from_config(config), jobs);
    info!("Started {threads} patch workers");

    let body = BodyDef::new(BODY, config.body.name.clone(), config.body.radius_m, config.body.seed);
    let radius = body.radius;
    let terrain: Arc<dyn Terrain> = Arc::new(FbmTerrain::new(
        config.body.seed,
        config.body.max_feature_height_m,
        radius,
    ));
    if let Err(e) = registry.add(body, terrain) {
        warn!("Could not register body: {e}");
        return;
    }

    let mut renderer = CountingRenderer::default();
    let flight = &config.flight;
    let total = flight.ticks + SETTLE_FRAMES;

    for tick in 0..total {
        let altitude = altitude_at(flight, tick);
        let (position, frustum) = camera_at(radius, altitude);
        // Registration was checked above; these cannot fail for BODY.
        let _ = registry.set_camera(BODY, position, frustum);

        for e in registry.update() {
            warn!("{e}");
        }

        renderer.begin_frame();
        let _ = registry.render(BODY, &mut renderer);

        if tick % STATS_INTERVAL == 0 || tick + 1 == total {
            if let Some(stats) = registry.stats(BODY) {
                info!(
                    tick,
                    altitude_m = altitude.round(),
                    patches = stats.patches,
                    leaves = stats.leaves,
                    pending = stats.pending,
                    max_depth = stats.max_depth_reached,
                    draws = renderer.draws_this_frame,
                    resident = renderer.resident(),
                    "LOD stats"
                );
            }
        }

        std::thread::sleep(FRAME_TIME);
    }

    info!(
        uploads = renderer.uploads,
        releases = renderer.releases,
        uploaded_mib = renderer.uploaded_bytes as f64 / (1024.0 * 1024.0),
        "Flight complete"
    );

    let _ = registry.remove(BODY);
}
