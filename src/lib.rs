//! Adventure engine library.
//!
//! This module exposes the engine's animation core, scenes, actions and ECS
//! systems for use by runners, integration tests and as a reusable library.

pub mod actions;
pub mod components;
pub mod error;
pub mod events;
pub mod game;
pub mod resources;
pub mod skeleton;
pub mod systems;
