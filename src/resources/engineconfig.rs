//! Engine configuration resource.
//!
//! Manages engine settings loaded from an INI configuration file. Provides
//! defaults for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [assets]
//! root = ./assets
//! scale = 1.0
//!
//! [simulation]
//! fps = 60
//! frames = 600
//! time_scale = 1.0
//! ```

use std::path::PathBuf;

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;

/// Default safe values for startup
const DEFAULT_ASSET_ROOT: &str = "./assets";
const DEFAULT_ASSET_SCALE: f32 = 1.0;
const DEFAULT_FPS: u32 = 60;
const DEFAULT_FRAMES: u64 = 600;
const DEFAULT_TIME_SCALE: f32 = 1.0;
const DEFAULT_CONFIG_PATH: &str = "./advengine.ini";

/// Engine configuration resource.
///
/// Stores where assets live, how skeleton coordinates are scaled and how the
/// headless runner steps the simulation.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory holding atlases, skeleton files and sounds.
    pub asset_root: PathBuf,
    /// Global scale applied to skeleton coordinates.
    pub asset_scale: f32,
    /// Fixed simulation steps per second.
    pub fps: u32,
    /// Number of frames the runner simulates.
    pub frames: u64,
    /// Multiplier applied to every frame delta.
    pub time_scale: f32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            asset_root: PathBuf::from(DEFAULT_ASSET_ROOT),
            asset_scale: DEFAULT_ASSET_SCALE,
            fps: DEFAULT_FPS,
            frames: DEFAULT_FRAMES,
            time_scale: DEFAULT_TIME_SCALE,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Seconds of one simulation step.
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [assets] section
        if let Some(root) = config.get("assets", "root") {
            self.asset_root = PathBuf::from(root);
        }
        if let Some(scale) = config.getfloat("assets", "scale").ok().flatten() {
            self.asset_scale = scale as f32;
        }

        // [simulation] section
        if let Some(fps) = config.getuint("simulation", "fps").ok().flatten() {
            self.fps = fps as u32;
        }
        if let Some(frames) = config.getuint("simulation", "frames").ok().flatten() {
            self.frames = frames;
        }
        if let Some(time_scale) = config.getfloat("simulation", "time_scale").ok().flatten() {
            self.time_scale = time_scale as f32;
        }

        info!(
            "Loaded config: assets {:?} (scale {}), {} fps, {} frames, time scale {}",
            self.asset_root, self.asset_scale, self.fps, self.frames, self.time_scale
        );
    }

    fn to_ini(&self) -> Ini {
        let mut config = Ini::new();

        // [assets] section
        config.set(
            "assets",
            "root",
            Some(self.asset_root.to_string_lossy().into_owned()),
        );
        config.set("assets", "scale", Some(self.asset_scale.to_string()));

        // [simulation] section
        config.set("simulation", "fps", Some(self.fps.to_string()));
        config.set("simulation", "frames", Some(self.frames.to_string()));
        config.set("simulation", "time_scale", Some(self.time_scale.to_string()));
        config
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        self.to_ini()
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Configuration rendered as INI text.
    pub fn to_ini_string(&self) -> String {
        self.to_ini().writes()
    }
}
