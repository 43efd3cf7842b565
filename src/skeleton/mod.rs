//! Skeletal animation runtime.
//!
//! Submodules overview:
//! - [`data`] – skeleton file format and the validated, shared [`SkeletonData`]
//! - [`pose`] – a posed [`Skeleton`] instance with bone world transforms
//! - [`state`] – single-track [`AnimationState`] reporting fired events and completions

pub mod data;
pub mod pose;
pub mod state;

pub use data::SkeletonData;
pub use pose::{RegionQuad, Skeleton};
pub use state::AnimationState;
