//! Messages exchanged with the audio thread.
//!
//! Actors and the music manager never touch an audio device: they write
//! [`AudioCmd`] messages, which [`forward_audio_cmds`](crate::systems::audio::forward_audio_cmds)
//! sends to the thread spawned by [`setup_audio`](crate::resources::audio::setup_audio).
//! The thread answers with [`AudioMessage`]s.

use bevy_ecs::message::Message;

/// Commands sent *to* the audio thread
#[derive(Message, Debug, Clone, PartialEq)]
pub enum AudioCmd {
    LoadMusic { id: String, path: String },
    UnloadMusic { id: String },
    PlayMusic { id: String, looped: bool },
    StopMusic { id: String },
    PauseMusic { id: String },
    ResumeMusic { id: String },
    VolumeMusic { id: String, vol: f32 },
    LoadFx { id: String, path: String },
    PlayFx { id: String, looped: bool, vol: f32, pan: f32 },
    StopFx { id: String },
    UnloadFx { id: String },
    UnloadAllFx,
    Shutdown,
}

/// Events sent *back* from the audio thread
#[derive(Message, Debug, Clone, PartialEq)]
pub enum AudioMessage {
    MusicLoaded { id: String },
    MusicUnloaded { id: String },
    MusicLoadFailed { id: String, error: String },
    MusicPlayStarted { id: String },
    MusicStopped { id: String },
    MusicVolumeChanged { id: String, vol: f32 },
    FxLoaded { id: String },
    FxUnloaded { id: String },
    FxUnloadedAll,
    FxLoadFailed { id: String, error: String },
    FxPlayStarted { id: String },
}
