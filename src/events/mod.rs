//! Event types and observers used by the engine.
//!
//! Submodules:
//! - [`audio`] – commands and messages for the background audio thread
//! - [`skeleton`] – events authored in skeleton clips and their observer
//! - [`verb`] – verb requests handed to the scripting layer
//!
//! See each submodule for concrete event data, semantics, and example usage.
pub mod audio;
pub mod skeleton;
pub mod verb;
