//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world and
//! accessed by systems during execution. Each submodule documents the
//! semantics and intended usage of its resource(s).
//!
//! Overview
//! - `assets` – the asset loader seam and its in-memory implementation
//! - `audio` – bridge and channels for the background audio thread
//! - `callbackqueue` – completed action callbacks awaiting the scripts
//! - `engineconfig` – INI configuration
//! - `fileloader` – filesystem asset loader
//! - `lua_runtime` – Lua interpreter and the `engine` table (feature `lua`)
//! - `music` – background music and its volume fade
//! - `scene` – scenes and the registry of the current one
//! - `sourcecache` – reference-counted cache of animation sources
//! - `worlddata` – world description and save-game documents
//! - `worldtime` – simulation time and delta
pub mod assets;
pub mod audio;
pub mod callbackqueue;
pub mod engineconfig;
pub mod fileloader;
#[cfg(feature = "lua")]
pub mod lua_runtime;
pub mod music;
pub mod scene;
pub mod sourcecache;
pub mod worlddata;
pub mod worldtime;
