//! Actor components.
//!
//! An actor entity is made of:
//! - [`Actor`] – scene-unique id and visibility
//! - [`ActorPosition`] – world position of the actor's anchor (bottom center)
//! - [`ActorRenderer`](super::renderer::ActorRenderer) – what is drawn
//! - [`ActorSounds`] – optional sound effects
//! - [`PositionTween`](super::tween::PositionTween) – optional, while walking

use bevy_ecs::prelude::Component;
use glam::Vec2;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use arrayvec::ArrayVec;

use crate::components::tween::PropertyTarget;
use crate::events::audio::AudioCmd;
use crate::resources::assets::AssetLoader;

#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub visible: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            visible: true,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorPosition {
    pub pos: Vec2,
}

impl ActorPosition {
    pub fn new(x: f32, y: f32) -> Self {
        ActorPosition { pos: Vec2::new(x, y) }
    }
}

impl PropertyTarget<Vec2> for ActorPosition {
    fn set_property(&mut self, value: Vec2) {
        self.pos = value;
    }
}

fn default_volume() -> f32 {
    1.0
}

/// A sound effect owned by an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundFx {
    pub filename: String,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub pan: f32,
    #[serde(default)]
    pub preload: bool,
    #[serde(skip)]
    loaded: bool,
}

/// Audio commands produced by one sound operation.
pub type SoundCmds = ArrayVec<AudioCmd, 2>;

impl SoundFx {
    pub fn new(filename: impl Into<String>) -> Self {
        SoundFx {
            filename: filename.into(),
            looping: false,
            volume: 1.0,
            pan: 0.0,
            preload: false,
            loaded: false,
        }
    }

    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Register the file with the loader and the audio backend.
    pub fn load(&mut self, audio_id: &str, loader: &mut dyn AssetLoader) -> AudioCmd {
        loader.load_sound(&self.filename);
        self.loaded = loader.is_sound_loaded(&self.filename);
        AudioCmd::LoadFx {
            id: audio_id.to_string(),
            path: loader.sound_path(&self.filename),
        }
    }

    /// Play the sound, loading it first when it is not a preloaded one.
    ///
    /// A preloaded sound that is not loaded yet stays silent.
    pub fn play(&mut self, audio_id: &str, loader: &mut dyn AssetLoader) -> SoundCmds {
        let mut cmds = SoundCmds::new();
        if !self.loaded {
            if self.preload {
                debug!("Sound '{}' is not loaded yet", audio_id);
                return cmds;
            }
            cmds.push(self.load(audio_id, loader));
            if !self.loaded {
                return cmds;
            }
        }
        cmds.push(AudioCmd::PlayFx {
            id: audio_id.to_string(),
            looped: self.looping,
            vol: self.volume,
            pan: self.pan,
        });
        cmds
    }

    /// Stop and release the sound.
    pub fn dispose(&mut self, audio_id: &str, loader: &mut dyn AssetLoader) -> SoundCmds {
        let mut cmds = SoundCmds::new();
        if self.loaded {
            cmds.push(AudioCmd::StopFx {
                id: audio_id.to_string(),
            });
            cmds.push(AudioCmd::UnloadFx {
                id: audio_id.to_string(),
            });
            loader.dispose_sound(&self.filename);
            self.loaded = false;
        }
        cmds
    }
}

/// Sound effects of an actor keyed by sound id.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorSounds {
    pub sounds: FxHashMap<String, SoundFx>,
}

/// Audio backend id of an actor's sound.
pub fn audio_id(actor: &str, sound: &str) -> String {
    format!("{actor}.{sound}")
}

impl ActorSounds {
    pub fn add(&mut self, id: impl Into<String>, sound: SoundFx) {
        self.sounds.insert(id.into(), sound);
    }

    /// Load the preloaded sounds.
    pub fn load_assets(&mut self, actor: &str, loader: &mut dyn AssetLoader) -> Vec<AudioCmd> {
        self.sounds
            .iter_mut()
            .filter(|(_, s)| s.preload)
            .map(|(id, s)| s.load(&audio_id(actor, id), loader))
            .collect()
    }

    pub fn play(&mut self, actor: &str, id: &str, loader: &mut dyn AssetLoader) -> SoundCmds {
        match self.sounds.get_mut(id) {
            Some(sound) => sound.play(&audio_id(actor, id), loader),
            None => {
                warn!("Sound '{}' not found in actor '{}'", id, actor);
                SoundCmds::new()
            }
        }
    }

    pub fn dispose(&mut self, actor: &str, loader: &mut dyn AssetLoader) -> Vec<AudioCmd> {
        self.sounds
            .iter_mut()
            .flat_map(|(id, s)| s.dispose(&audio_id(actor, id), loader))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::assets::MemoryAssetLoader;

    fn loader() -> MemoryAssetLoader {
        let mut loader = MemoryAssetLoader::new();
        loader.add_sound("door.ogg");
        loader.add_sound("steps.ogg");
        loader
    }

    #[test]
    fn test_lazy_sound_loads_on_play() {
        let mut loader = loader();
        let mut sounds = ActorSounds::default();
        sounds.add("door", SoundFx::new("door.ogg"));

        let cmds = sounds.play("hero", "door", &mut loader);
        assert_eq!(cmds.len(), 2);
        assert!(matches!(&cmds[0], AudioCmd::LoadFx { id, .. } if id == "hero.door"));
        assert!(matches!(&cmds[1], AudioCmd::PlayFx { id, looped: false, .. } if id == "hero.door"));
        assert!(loader.is_sound_loaded("door.ogg"));
    }

    #[test]
    fn test_preloaded_sound_is_silent_until_loaded() {
        let mut loader = loader();
        let mut sounds = ActorSounds::default();
        sounds.add("steps", SoundFx::new("steps.ogg").with_preload(true).with_loop(true));

        assert!(sounds.play("hero", "steps", &mut loader).is_empty());

        let loads = sounds.load_assets("hero", &mut loader);
        assert_eq!(loads.len(), 1);
        let cmds = sounds.play("hero", "steps", &mut loader);
        assert!(matches!(&cmds[0], AudioCmd::PlayFx { looped: true, .. }));
    }

    #[test]
    fn test_dispose_only_loaded_sounds() {
        let mut loader = loader();
        let mut sounds = ActorSounds::default();
        sounds.add("door", SoundFx::new("door.ogg"));
        sounds.add("steps", SoundFx::new("steps.ogg"));
        sounds.play("hero", "door", &mut loader);

        let cmds = sounds.dispose("hero", &mut loader);
        assert_eq!(
            cmds,
            vec![
                AudioCmd::StopFx { id: "hero.door".into() },
                AudioCmd::UnloadFx { id: "hero.door".into() }
            ]
        );
        assert!(!loader.is_sound_loaded("door.ogg"));
    }

    #[test]
    fn test_unknown_sound_plays_nothing() {
        let mut loader = loader();
        let mut sounds = ActorSounds::default();
        assert!(sounds.play("hero", "nope", &mut loader).is_empty());
    }

    #[test]
    fn test_missing_file_does_not_play() {
        let mut loader = MemoryAssetLoader::new();
        let mut fx = SoundFx::new("ghost.ogg");
        let cmds = fx.play("hero.ghost", &mut loader);
        assert_eq!(cmds.len(), 1);
        assert!(!fx.is_loaded());
    }
}
