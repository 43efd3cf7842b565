//! ECS components for actors.
//!
//! This module groups the component types attached to actor entities and the
//! animation machinery they carry.
//!
//! Submodules overview:
//! - [`actor`] – actor id, position and sound effects
//! - [`animation`] – authored animation descriptors and directional naming
//! - [`atlasrenderer`] – frame animations from texture atlas regions
//! - [`renderer`] – the [`ActorRenderer`](renderer::ActorRenderer) component shared by both renderers
//! - [`skeletalrenderer`] – bone animations from cached skeleton sources
//! - [`tween`] – the tween family: repeat policies, easing, frame and property tweens

pub mod actor;
pub mod animation;
pub mod atlasrenderer;
pub mod renderer;
pub mod skeletalrenderer;
pub mod tween;
