//! Background music manager.
//!
//! Holds the id of the playing track and its volume. Volume fades are a
//! [`MusicVolumeTween`] targeting the manager itself; every change becomes
//! an [`AudioCmd::VolumeMusic`] for the audio thread.

use bevy_ecs::prelude::Resource;

use crate::components::tween::{Interpolation, MusicVolumeTween, PropertyTarget};
use crate::events::audio::AudioCmd;
use crate::resources::callbackqueue::{ActionCallback, CallbackQueue};

#[derive(Resource, Debug)]
pub struct MusicManager {
    current: Option<String>,
    volume: f32,
    fade: Option<MusicVolumeTween>,
}

impl Default for MusicManager {
    fn default() -> Self {
        MusicManager {
            current: None,
            volume: 1.0,
            fade: None,
        }
    }
}

impl PropertyTarget<f32> for MusicManager {
    fn set_property(&mut self, value: f32) {
        self.volume = value;
    }
}

impl MusicManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Switch to a looping track, stopping the previous one.
    pub fn play(&mut self, id: impl Into<String>, path: impl Into<String>) -> Vec<AudioCmd> {
        let id = id.into();
        let mut cmds = self.stop();
        cmds.push(AudioCmd::LoadMusic {
            id: id.clone(),
            path: path.into(),
        });
        cmds.push(AudioCmd::VolumeMusic {
            id: id.clone(),
            vol: self.volume,
        });
        cmds.push(AudioCmd::PlayMusic {
            id: id.clone(),
            looped: true,
        });
        self.current = Some(id);
        cmds
    }

    pub fn stop(&mut self) -> Vec<AudioCmd> {
        self.fade = None;
        match self.current.take() {
            Some(id) => vec![
                AudioCmd::StopMusic { id: id.clone() },
                AudioCmd::UnloadMusic { id },
            ],
            None => Vec::new(),
        }
    }

    pub fn set_volume(&mut self, volume: f32) -> Option<AudioCmd> {
        self.volume = volume;
        self.volume_cmd()
    }

    fn volume_cmd(&self) -> Option<AudioCmd> {
        self.current.as_ref().map(|id| AudioCmd::VolumeMusic {
            id: id.clone(),
            vol: self.volume,
        })
    }

    /// Fade from the present volume to `target`, replacing a running fade.
    pub fn fade_to(
        &mut self,
        target: f32,
        duration: f32,
        interpolation: Interpolation,
        cb: Option<ActionCallback>,
    ) {
        self.fade = Some(MusicVolumeTween::new(
            self.volume,
            target,
            duration,
            interpolation,
            cb,
        ));
    }

    /// Advance the running fade.
    pub fn update(&mut self, delta: f32, callbacks: &mut CallbackQueue) -> Option<AudioCmd> {
        let mut fade = self.fade.take()?;
        fade.update(self, delta, callbacks);
        if !fade.is_complete() {
            self.fade = Some(fade);
        }
        self.volume_cmd()
    }
}
