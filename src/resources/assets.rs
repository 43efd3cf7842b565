//! Asset loading seam.
//!
//! The animation core never touches files or GPU memory directly. It talks to
//! an [`AssetLoader`] held by the [`AssetManager`] resource:
//! - `load_atlas` only enqueues, `finish_loading` blocks until every
//!   enqueued atlas is available
//! - `texture_atlas` / `skeleton_file` hand out loaded data
//! - `dispose_atlas` releases it
//!
//! Loaders are idempotent and know nothing about reference counts; the
//! [`SourceCache`](crate::resources::sourcecache::SourceCache) owns those.
//!
//! [`MemoryAssetLoader`] keeps everything in memory and records how often
//! each atlas was loaded and disposed. The filesystem implementation lives in
//! [`crate::resources::fileloader`].

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use log::error;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::skeleton::data::SkeletonFile;

/// One named rectangle of an atlas page.
///
/// Several regions may share a name; `index` orders them as animation frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasRegion {
    pub name: String,
    #[serde(default = "default_index")]
    pub index: i32,
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn default_index() -> i32 {
    -1
}

impl AtlasRegion {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        AtlasRegion {
            name: name.into(),
            index: -1,
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }
}

/// Texture atlas description: page image plus named regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureAtlas {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub regions: Vec<AtlasRegion>,
}

impl TextureAtlas {
    pub fn new(regions: Vec<AtlasRegion>) -> Self {
        TextureAtlas {
            image: None,
            regions,
        }
    }

    /// First region with this name.
    pub fn region(&self, name: &str) -> Option<&AtlasRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Every region with this name, ordered by frame index.
    pub fn frames(&self, name: &str) -> Vec<&AtlasRegion> {
        let mut frames: Vec<&AtlasRegion> =
            self.regions.iter().filter(|r| r.name == name).collect();
        frames.sort_by_key(|r| r.index);
        frames
    }
}

/// Asset backend consumed by renderers, sounds and the transfer protocol.
pub trait AssetLoader: Send + Sync {
    /// Enqueue an atlas load. Never blocks.
    fn load_atlas(&mut self, key: &str);
    /// Block until every enqueued load has finished (or failed).
    fn finish_loading(&mut self);
    fn is_loaded(&self, key: &str) -> bool;
    fn texture_atlas(&self, key: &str) -> Result<Arc<TextureAtlas>>;
    /// Raw skeleton description of a source.
    fn skeleton_file(&self, source: &str) -> Result<Arc<SkeletonFile>>;
    fn dispose_atlas(&mut self, key: &str);

    fn load_sound(&mut self, file: &str);
    fn is_sound_loaded(&self, file: &str) -> bool;
    fn dispose_sound(&mut self, file: &str);
    /// Path handed to the audio backend for a sound file.
    fn sound_path(&self, file: &str) -> String {
        file.to_string()
    }

    /// Global scale applied to skeleton coordinates.
    fn scale(&self) -> f32;
}

/// World resource owning the active asset loader.
#[derive(Resource)]
pub struct AssetManager {
    loader: Box<dyn AssetLoader>,
}

impl AssetManager {
    pub fn new(loader: impl AssetLoader + 'static) -> Self {
        AssetManager {
            loader: Box::new(loader),
        }
    }

    pub fn loader(&self) -> &dyn AssetLoader {
        self.loader.as_ref()
    }

    pub fn loader_mut(&mut self) -> &mut dyn AssetLoader {
        self.loader.as_mut()
    }
}

/// In-memory asset backend.
///
/// Atlases and skeleton files are registered up front; `load_atlas` marks an
/// atlas pending and `finish_loading` makes it available. Load and dispose
/// calls are counted per key.
#[derive(Debug)]
pub struct MemoryAssetLoader {
    atlases: FxHashMap<String, Arc<TextureAtlas>>,
    skeletons: FxHashMap<String, Arc<SkeletonFile>>,
    sounds: FxHashSet<String>,
    pending: Vec<String>,
    loaded: FxHashSet<String>,
    loaded_sounds: FxHashSet<String>,
    load_calls: FxHashMap<String, usize>,
    dispose_calls: FxHashMap<String, usize>,
    scale: f32,
}

impl Default for MemoryAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAssetLoader {
    pub fn new() -> Self {
        MemoryAssetLoader {
            atlases: FxHashMap::default(),
            skeletons: FxHashMap::default(),
            sounds: FxHashSet::default(),
            pending: Vec::new(),
            loaded: FxHashSet::default(),
            loaded_sounds: FxHashSet::default(),
            load_calls: FxHashMap::default(),
            dispose_calls: FxHashMap::default(),
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn add_atlas(&mut self, key: impl Into<String>, atlas: TextureAtlas) {
        self.atlases.insert(key.into(), Arc::new(atlas));
    }

    pub fn add_skeleton(&mut self, source: impl Into<String>, file: SkeletonFile) {
        self.skeletons.insert(source.into(), Arc::new(file));
    }

    pub fn add_sound(&mut self, file: impl Into<String>) {
        self.sounds.insert(file.into());
    }

    /// Times `load_atlas` was called for `key`.
    pub fn load_count(&self, key: &str) -> usize {
        self.load_calls.get(key).copied().unwrap_or(0)
    }

    /// Times `dispose_atlas` was called for `key`.
    pub fn dispose_count(&self, key: &str) -> usize {
        self.dispose_calls.get(key).copied().unwrap_or(0)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.iter().any(|k| k == key)
    }
}

impl AssetLoader for MemoryAssetLoader {
    fn load_atlas(&mut self, key: &str) {
        *self.load_calls.entry(key.to_string()).or_insert(0) += 1;
        if !self.loaded.contains(key) && !self.is_pending(key) {
            self.pending.push(key.to_string());
        }
    }

    fn finish_loading(&mut self) {
        for key in self.pending.drain(..) {
            if self.atlases.contains_key(&key) {
                self.loaded.insert(key);
            } else {
                error!("Atlas not found: {}", key);
            }
        }
    }

    fn is_loaded(&self, key: &str) -> bool {
        self.loaded.contains(key)
    }

    fn texture_atlas(&self, key: &str) -> Result<Arc<TextureAtlas>> {
        if !self.loaded.contains(key) {
            return Err(EngineError::AssetUnavailable {
                key: key.to_string(),
                reason: "atlas not loaded".to_string(),
            });
        }
        self.atlases
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::AssetUnavailable {
                key: key.to_string(),
                reason: "atlas not registered".to_string(),
            })
    }

    fn skeleton_file(&self, source: &str) -> Result<Arc<SkeletonFile>> {
        self.skeletons
            .get(source)
            .cloned()
            .ok_or_else(|| EngineError::AssetUnavailable {
                key: source.to_string(),
                reason: "skeleton not registered".to_string(),
            })
    }

    fn dispose_atlas(&mut self, key: &str) {
        *self.dispose_calls.entry(key.to_string()).or_insert(0) += 1;
        self.pending.retain(|k| k != key);
        self.loaded.remove(key);
    }

    fn load_sound(&mut self, file: &str) {
        if self.sounds.contains(file) {
            self.loaded_sounds.insert(file.to_string());
        } else {
            error!("Sound not found: {}", file);
        }
    }

    fn is_sound_loaded(&self, file: &str) -> bool {
        self.loaded_sounds.contains(file)
    }

    fn dispose_sound(&mut self, file: &str) {
        self.loaded_sounds.remove(file);
    }

    fn scale(&self) -> f32 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_with_hero() -> MemoryAssetLoader {
        let mut loader = MemoryAssetLoader::new();
        loader.add_atlas(
            "hero",
            TextureAtlas::new(vec![
                AtlasRegion::new("walk", 32, 64).with_index(1),
                AtlasRegion::new("walk", 32, 64).with_index(0),
                AtlasRegion::new("idle", 32, 64),
            ]),
        );
        loader
    }

    #[test]
    fn test_load_is_deferred_until_finish() {
        let mut loader = loader_with_hero();
        loader.load_atlas("hero");
        assert!(!loader.is_loaded("hero"));
        assert!(loader.texture_atlas("hero").is_err());
        loader.finish_loading();
        assert!(loader.is_loaded("hero"));
        assert!(loader.texture_atlas("hero").is_ok());
    }

    #[test]
    fn test_load_is_idempotent() {
        let mut loader = loader_with_hero();
        loader.load_atlas("hero");
        loader.load_atlas("hero");
        loader.finish_loading();
        loader.load_atlas("hero");
        assert_eq!(loader.load_count("hero"), 3);
        assert!(!loader.is_pending("hero"));
    }

    #[test]
    fn test_unknown_atlas_fails_to_load() {
        let mut loader = loader_with_hero();
        loader.load_atlas("ghost");
        loader.finish_loading();
        assert!(!loader.is_loaded("ghost"));
    }

    #[test]
    fn test_dispose_unloads() {
        let mut loader = loader_with_hero();
        loader.load_atlas("hero");
        loader.finish_loading();
        loader.dispose_atlas("hero");
        assert!(!loader.is_loaded("hero"));
        assert_eq!(loader.dispose_count("hero"), 1);
    }

    #[test]
    fn test_frames_are_ordered_by_index() {
        let loader = loader_with_hero();
        let atlas = loader.atlases.get("hero").unwrap();
        let frames = atlas.frames("walk");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[1].index, 1);
        assert!(atlas.frames("run").is_empty());
    }

    #[test]
    fn test_sounds() {
        let mut loader = MemoryAssetLoader::new();
        loader.add_sound("door.ogg");
        loader.load_sound("door.ogg");
        loader.load_sound("missing.ogg");
        assert!(loader.is_sound_loaded("door.ogg"));
        assert!(!loader.is_sound_loaded("missing.ogg"));
        loader.dispose_sound("door.ogg");
        assert!(!loader.is_sound_loaded("door.ogg"));
    }
}
