//! Adventure engine headless runner.
//!
//! Loads a world description, brings up its initial scene, optionally runs a
//! Lua script that drives it, and simulates a fixed number of frames:
//! - **bevy_ecs** for the entity-component-system architecture
//! - **mlua + LuaJIT** for game logic scripting (feature `lua`)
//! - **configparser** for the INI configuration
//!
//! # Main Loop
//!
//! 1. Read the configuration, then apply command-line overrides
//! 2. Create the ECS world, the asset loader and the audio thread
//! 3. Spawn the world and make its initial scene current
//! 4. Optionally restore a save game and load `main.lua`
//! 5. Step the simulation, then optionally write a save game
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --world assets/world.json --frames 600
//! ```

use std::path::PathBuf;

use advengine::game::{build_schedule, setup_world, step};
use advengine::resources::audio::{setup_audio, shutdown_audio};
use advengine::resources::engineconfig::EngineConfig;
use advengine::resources::fileloader::FileAssetLoader;
#[cfg(feature = "lua")]
use advengine::resources::lua_runtime::LuaRuntime;
use advengine::resources::worlddata::{WorldModel, WorldState};
use advengine::systems::renderer::scene_visuals;
use advengine::systems::savegame::{restore_world, save_world, spawn_world};
use bevy_ecs::prelude::*;
use clap::Parser;

/// Headless adventure engine runner
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// INI configuration file.
    #[arg(long, value_name = "PATH", default_value = "./advengine.ini")]
    config: PathBuf,

    /// World description (JSON).
    #[arg(long, value_name = "PATH", default_value = "assets/world.json")]
    world: PathBuf,

    /// Frames to simulate, overriding the configuration.
    #[arg(long)]
    frames: Option<u64>,

    /// Lua script driving the world.
    #[cfg(feature = "lua")]
    #[arg(long, value_name = "PATH", default_value = "assets/scripts/main.lua")]
    script: PathBuf,

    /// Save game to restore before the first frame.
    #[arg(long, value_name = "PATH")]
    restore: Option<PathBuf>,

    /// Write a save game here after the last frame.
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Write the configuration with default values and exit.
    #[arg(long)]
    write_default_config: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Early-exit: write a default configuration file
    if cli.write_default_config {
        let config = EngineConfig::with_path(&cli.config);
        if let Err(e) = config.save_to_file() {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        println!("Configuration written to {}", cli.config.display());
        return;
    }

    let mut config = EngineConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        log::warn!("{}, using defaults", e);
    }
    if let Some(frames) = cli.frames {
        config.frames = frames;
    }

    let model = match WorldModel::from_file(&cli.world) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error loading world {}: {e}", cli.world.display());
            std::process::exit(1);
        }
    };

    // --------------- ECS world + resources ---------------
    let frames = config.frames;
    let delta = config.frame_delta();
    let asset_scale = config.asset_scale;
    let loader = FileAssetLoader::new(config.asset_root.clone(), asset_scale);

    let mut world = World::new();
    setup_world(&mut world, config, loader);
    setup_audio(&mut world);

    if let Err(e) = spawn_world(&mut world, &model) {
        log::error!("Failed to bring up the world: {}", e);
    }

    if let Some(path) = &cli.restore {
        match WorldState::from_file(path) {
            Ok(state) => {
                if let Err(e) = restore_world(&mut world, &state) {
                    log::error!("Save game {} restored with errors: {}", path.display(), e);
                }
            }
            Err(e) => log::error!("Failed to read save game {}: {}", path.display(), e),
        }
    }

    // Initialize Lua runtime and load main script
    #[cfg(feature = "lua")]
    match LuaRuntime::new() {
        Ok(lua_runtime) => {
            if let Err(e) = lua_runtime.run_script(&cli.script.to_string_lossy()) {
                log::error!("Failed to load {}: {}", cli.script.display(), e);
            }
            world.insert_non_send_resource(lua_runtime);
        }
        Err(e) => log::error!("Failed to create Lua runtime: {}", e),
    }

    // --------------- Main loop ---------------
    let mut update = build_schedule();
    log::info!("Simulating {} frames of {:.4}s", frames, delta);
    for _ in 0..frames {
        step(&mut world, &mut update, delta);
    }

    for (actor, visual) in scene_visuals(&mut world, asset_scale) {
        log::debug!("{}: {:?}", actor, visual);
    }

    if let Some(path) = &cli.save {
        match save_world(&world).and_then(|state| state.to_file(path)) {
            Ok(()) => log::info!("Saved game to {}", path.display()),
            Err(e) => log::error!("Failed to save game {}: {}", path.display(), e),
        }
    }

    shutdown_audio(&mut world);
}
