//! Reference-counted cache of shared animation sources.
//!
//! Several animations, and several copies of the same actor, can play from
//! the same source. Every renderer owns a [`SourceCache`] keyed by source
//! name; the entry counts how many times the source was loaded and holds the
//! materialized runtime objects while the count is above zero.
//!
//! The three mutators keep the discipline:
//! - [`SourceCache::load_source`] registers and counts, enqueueing the atlas
//!   on the 0 -> 1 transition
//! - [`SourceCache::retrieve_source`] blocks until the runtime exists
//! - [`SourceCache::dispose_source`] uncounts, releasing the atlas and the
//!   runtime on the 1 -> 0 transition
//!
//! Releasing an entry that is already at zero is reported as
//! [`EngineError::SourceOverRelease`] and leaves the count untouched.

use log::{debug, error};
use rustc_hash::FxHashMap;

use crate::error::{EngineError, Result};
use crate::resources::assets::AssetLoader;

/// Runtime objects built from a loaded source.
pub trait CachedRuntime: Sized {
    /// Build the runtime once the atlas `atlas` is available.
    fn materialize(loader: &dyn AssetLoader, source: &str, atlas: &str) -> Result<Self>;
}

#[derive(Debug)]
struct CacheEntry<R> {
    ref_counter: u32,
    runtime: Option<R>,
    atlas: String,
}

#[derive(Debug)]
pub struct SourceCache<R> {
    entries: FxHashMap<String, CacheEntry<R>>,
}

impl<R> Default for SourceCache<R> {
    fn default() -> Self {
        SourceCache {
            entries: FxHashMap::default(),
        }
    }
}

impl<R: CachedRuntime> SourceCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more reference to `source`. Never blocks.
    pub fn load_source(&mut self, loader: &mut dyn AssetLoader, source: &str, atlas: Option<&str>) {
        let entry = self
            .entries
            .entry(source.to_string())
            .or_insert_with(|| CacheEntry {
                ref_counter: 0,
                runtime: None,
                atlas: atlas.unwrap_or(source).to_string(),
            });

        if entry.ref_counter == 0 {
            debug!("Loading source '{}' (atlas '{}')", source, entry.atlas);
            loader.load_atlas(&entry.atlas);
        }
        entry.ref_counter += 1;
    }

    /// Make sure the runtime of `source` exists and return it.
    ///
    /// An unreferenced source is loaded first and the loader is drained, so
    /// this may block.
    pub fn retrieve_source(
        &mut self,
        loader: &mut dyn AssetLoader,
        source: &str,
        atlas: Option<&str>,
    ) -> Result<&mut R> {
        let needs_load = self.entries.get(source).is_none_or(|e| e.ref_counter < 1);
        if needs_load {
            self.load_source(loader, source, atlas);
            loader.finish_loading();
        }

        let entry = self
            .entries
            .get_mut(source)
            .ok_or_else(|| EngineError::UnknownSource(source.to_string()))?;

        if entry.runtime.is_none() {
            if !loader.is_loaded(&entry.atlas) {
                loader.finish_loading();
            }
            entry.runtime = Some(R::materialize(&*loader, source, &entry.atlas)?);
        }

        entry
            .runtime
            .as_mut()
            .ok_or_else(|| EngineError::UnknownSource(source.to_string()))
    }

    /// Drop one reference to `source`.
    pub fn dispose_source(&mut self, loader: &mut dyn AssetLoader, source: &str) -> Result<()> {
        let entry = self
            .entries
            .get_mut(source)
            .ok_or_else(|| EngineError::UnknownSource(source.to_string()))?;

        match entry.ref_counter {
            0 => {
                error!("Source '{}' disposed more times than loaded", source);
                Err(EngineError::SourceOverRelease(source.to_string()))
            }
            1 => {
                debug!("Releasing source '{}' (atlas '{}')", source, entry.atlas);
                loader.dispose_atlas(&entry.atlas);
                entry.runtime = None;
                entry.ref_counter = 0;
                Ok(())
            }
            _ => {
                entry.ref_counter -= 1;
                Ok(())
            }
        }
    }

    /// Release every live entry and forget all of them.
    pub fn dispose_all(&mut self, loader: &mut dyn AssetLoader) {
        for entry in self.entries.values() {
            if entry.ref_counter > 0 {
                loader.dispose_atlas(&entry.atlas);
            }
        }
        self.entries.clear();
    }

    /// Materialize every referenced entry that has no runtime yet.
    ///
    /// A failing entry does not stop the others; the first error is returned.
    pub fn retrieve_all(&mut self, loader: &mut dyn AssetLoader) -> Result<()> {
        let live: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.ref_counter > 0 && e.runtime.is_none())
            .map(|(k, e)| (k.clone(), e.atlas.clone()))
            .collect();

        let mut result = Ok(());
        for (source, atlas) in live {
            if let Err(e) = self.retrieve_source(loader, &source, Some(atlas.as_str())) {
                error!("Could not retrieve source '{}': {}", source, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

impl<R> SourceCache<R> {
    pub fn ref_count(&self, source: &str) -> u32 {
        self.entries.get(source).map_or(0, |e| e.ref_counter)
    }

    pub fn is_referenced(&self, source: &str) -> bool {
        self.ref_count(source) > 0
    }

    pub fn get(&self, source: &str) -> Option<&R> {
        self.entries.get(source).and_then(|e| e.runtime.as_ref())
    }

    pub fn get_mut(&mut self, source: &str) -> Option<&mut R> {
        self.entries.get_mut(source).and_then(|e| e.runtime.as_mut())
    }

    pub fn atlas(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(|e| e.atlas.as_str())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
