//! Filesystem asset loader backed by a background thread.
//!
//! Atlas files are read and parsed on a dedicated loader thread so that
//! [`load_atlas`](AssetLoader::load_atlas) never blocks the frame loop.
//! [`finish_loading`](AssetLoader::finish_loading) waits on the reply channel
//! until every enqueued atlas has come back.
//!
//! Layout below the asset root:
//! - `atlases/<key>.atlas.json` – [`TextureAtlas`] descriptions
//! - `spine/<source>.skel.json` – [`SkeletonFile`]s
//! - `sounds/<file>` – sound effects, handed to the audio backend by path

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, Result};
use crate::resources::assets::{AssetLoader, TextureAtlas};
use crate::skeleton::data::SkeletonFile;

/// Commands sent *to* the loader thread.
#[derive(Debug)]
enum LoaderCmd {
    LoadAtlas { key: String, path: PathBuf },
    Shutdown,
}

/// Replies sent *back* from the loader thread.
#[derive(Debug)]
enum LoaderReply {
    AtlasLoaded { key: String, atlas: TextureAtlas },
    AtlasFailed { key: String, error: String },
}

fn read_atlas(path: &Path) -> std::result::Result<TextureAtlas, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Entry point of the loader thread.
fn loader_thread(rx_cmd: Receiver<LoaderCmd>, tx_reply: Sender<LoaderReply>) {
    for cmd in rx_cmd.iter() {
        match cmd {
            LoaderCmd::LoadAtlas { key, path } => {
                let reply = match read_atlas(&path) {
                    Ok(atlas) => LoaderReply::AtlasLoaded { key, atlas },
                    Err(error) => LoaderReply::AtlasFailed { key, error },
                };
                if tx_reply.send(reply).is_err() {
                    break;
                }
            }
            LoaderCmd::Shutdown => break,
        }
    }
    debug!("Asset loader thread finished");
}

pub struct FileAssetLoader {
    root: PathBuf,
    scale: f32,
    tx_cmd: Sender<LoaderCmd>,
    rx_reply: Receiver<LoaderReply>,
    handle: Option<JoinHandle<()>>,
    pending: FxHashSet<String>,
    atlases: FxHashMap<String, Arc<TextureAtlas>>,
    sounds: FxHashSet<String>,
}

impl FileAssetLoader {
    /// Spawn the loader thread for assets below `root`.
    pub fn new(root: impl Into<PathBuf>, scale: f32) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<LoaderCmd>();
        let (tx_reply, rx_reply) = unbounded::<LoaderReply>();

        let handle = std::thread::spawn(move || loader_thread(rx_cmd, tx_reply));

        let root = root.into();
        info!("Asset root: {:?} (scale {})", root, scale);

        FileAssetLoader {
            root,
            scale,
            tx_cmd,
            rx_reply,
            handle: Some(handle),
            pending: FxHashSet::default(),
            atlases: FxHashMap::default(),
            sounds: FxHashSet::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn atlas_path(&self, key: &str) -> PathBuf {
        self.root.join("atlases").join(format!("{key}.atlas.json"))
    }

    fn skeleton_path(&self, source: &str) -> PathBuf {
        self.root.join("spine").join(format!("{source}.skel.json"))
    }

    fn handle_reply(&mut self, reply: LoaderReply) {
        match reply {
            LoaderReply::AtlasLoaded { key, atlas } => {
                // a dispose may have raced the load
                if self.pending.remove(&key) {
                    debug!("Atlas loaded: {}", key);
                    self.atlases.insert(key, Arc::new(atlas));
                }
            }
            LoaderReply::AtlasFailed { key, error } => {
                self.pending.remove(&key);
                error!("Failed to load atlas '{}': {}", key, error);
            }
        }
    }
}

impl AssetLoader for FileAssetLoader {
    fn load_atlas(&mut self, key: &str) {
        if self.atlases.contains_key(key) || self.pending.contains(key) {
            return;
        }
        let cmd = LoaderCmd::LoadAtlas {
            key: key.to_string(),
            path: self.atlas_path(key),
        };
        if self.tx_cmd.send(cmd).is_err() {
            error!("Asset loader thread is gone, cannot load '{}'", key);
            return;
        }
        self.pending.insert(key.to_string());
    }

    fn finish_loading(&mut self) {
        let ready: Vec<LoaderReply> = self.rx_reply.try_iter().collect();
        for reply in ready {
            self.handle_reply(reply);
        }
        while !self.pending.is_empty() {
            match self.rx_reply.recv() {
                Ok(reply) => self.handle_reply(reply),
                Err(_) => {
                    error!("Asset loader thread is gone, dropping {} pending loads", self.pending.len());
                    self.pending.clear();
                }
            }
        }
    }

    fn is_loaded(&self, key: &str) -> bool {
        self.atlases.contains_key(key)
    }

    fn texture_atlas(&self, key: &str) -> Result<Arc<TextureAtlas>> {
        self.atlases
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::AssetUnavailable {
                key: key.to_string(),
                reason: "atlas not loaded".to_string(),
            })
    }

    fn skeleton_file(&self, source: &str) -> Result<Arc<SkeletonFile>> {
        let text = std::fs::read_to_string(self.skeleton_path(source))?;
        Ok(Arc::new(serde_json::from_str(&text)?))
    }

    fn dispose_atlas(&mut self, key: &str) {
        self.pending.remove(key);
        if self.atlases.remove(key).is_some() {
            debug!("Atlas disposed: {}", key);
        }
    }

    fn load_sound(&mut self, file: &str) {
        let path = self.root.join("sounds").join(file);
        if path.is_file() {
            self.sounds.insert(file.to_string());
        } else {
            error!("Sound file not found: {:?}", path);
        }
    }

    fn is_sound_loaded(&self, file: &str) -> bool {
        self.sounds.contains(file)
    }

    fn dispose_sound(&mut self, file: &str) {
        self.sounds.remove(file);
    }

    fn sound_path(&self, file: &str) -> String {
        self.root.join("sounds").join(file).to_string_lossy().into_owned()
    }

    fn scale(&self) -> f32 {
        self.scale
    }
}

impl Drop for FileAssetLoader {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(LoaderCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
