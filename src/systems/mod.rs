//! Engine systems.
//!
//! This module groups the ECS systems that advance the simulation, and the
//! exclusive helpers that move assets in and out of it.
//!
//! Submodules overview
//! - [`actorassets`] – load / finish / retrieve / dispose actor assets, switch scenes
//! - [`audio`] – bridge with the audio thread (poll/update message queues)
//! - [`renderer`] – advance the renderers of the current scene
//! - [`savegame`] – spawn the world from its model, save and restore it
//! - [`script`] – hand callbacks and verbs to scripts, run their actions
//! - [`time`] – update simulation time and delta
//! - [`tween`] – position tweens and the music fade

pub mod actorassets;
pub mod audio;
pub mod renderer;
pub mod savegame;
pub mod script;
pub mod time;
pub mod tween;
