//! World description and save-game documents.
//!
//! [`WorldModel`] is the authored JSON file: scenes, their actors, each
//! actor's renderer model and sounds. [`WorldState`] is a save game: scene
//! membership, the current scene and the live state of every actor.
//! Restoring a state needs the world built from its model first, since only
//! the live half is saved.
//!
//! ```json
//! {
//!   "initScene": "street",
//!   "scenes": [
//!     { "id": "street",
//!       "actors": [
//!         { "id": "hero", "pos": [120.0, 40.0],
//!           "renderer": { "kind": "skeletal", "initAnimation": "idle",
//!                         "fanims": { "idle": { "id": "idle", "source": "hero" } } },
//!           "sounds": { "steps": { "filename": "steps.ogg", "loop": true } } }
//!       ] }
//!   ]
//! }
//! ```

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::actor::ActorSounds;
use crate::components::renderer::{RendererKind, RendererModel};
use crate::components::tween::PositionTween;
use crate::error::Result;
use crate::resources::callbackqueue::ActionCallback;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldModel {
    #[serde(default)]
    pub init_scene: Option<String>,
    #[serde(default)]
    pub scenes: Vec<SceneModel>,
}

impl WorldModel {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneModel {
    pub id: String,
    #[serde(default)]
    pub actors: Vec<ActorModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorModel {
    pub id: String,
    #[serde(default)]
    pub pos: Vec2,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererSpec>,
    #[serde(default)]
    pub sounds: ActorSounds,
}

/// Renderer variant plus its authored model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererSpec {
    pub kind: RendererKind,
    #[serde(flatten)]
    pub model: RendererModel,
}

/// Save game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    #[serde(default)]
    pub current_scene: Option<String>,
    #[serde(default)]
    pub cut_mode: bool,
    #[serde(default)]
    pub scenes: Vec<SceneState>,
    /// Callbacks completed but not yet handed to the scripts.
    #[serde(default)]
    pub pending_callbacks: Vec<ActionCallback>,
}

impl WorldState {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub id: String,
    #[serde(default)]
    pub actors: Vec<ActorState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: String,
    pub pos: Vec2,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tween: Option<PositionTween>,
}
