//! Audio systems and the headless audio thread.
//!
//! This module hosts the background audio thread and the systems that bridge
//! it with the ECS world:
//! - [`audio_thread`] runs on its own OS thread, keeps track of loaded music
//!   and sound effects, and answers [`AudioCmd`] messages with
//!   [`AudioMessage`] replies.
//! - [`forward_audio_cmds`] sends the commands written this frame.
//! - [`poll_audio_messages`] non-blockingly drains the replies into the ECS
//!   message queue.
//!
//! The engine core has no audio device. The thread logs what a device would
//! do, so hosts can replace it without touching the actors that emit
//! commands.
//!
//! See also: [`crate::events::audio`] and [`crate::resources::audio`].

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::resources::audio::AudioBridge;

/// Drain any pending replies from the audio thread into the ECS
/// [`Messages<AudioMessage>`] mailbox.
pub fn poll_audio_messages(bridge: Res<AudioBridge>, mut writer: MessageWriter<AudioMessage>) {
    writer.write_batch(bridge.replies());
}

/// Advance the ECS message queue for [`AudioMessage`].
///
/// Run this after [`poll_audio_messages`] in your schedule.
pub fn update_bevy_audio_messages(mut msgs: ResMut<Messages<AudioMessage>>) {
    msgs.update();
}

/// Forward the frame's [`AudioCmd`]s to the audio thread.
pub fn forward_audio_cmds(bridge: Res<AudioBridge>, mut reader: MessageReader<AudioCmd>) {
    for cmd in reader.read() {
        if !bridge.send(cmd.clone()) {
            debug!("Audio thread gone, dropping {:?}", cmd);
        }
    }
}

/// Advance the ECS message queue for AudioCmd so same-frame readers can observe writes.
pub fn update_bevy_audio_cmds(mut msgs: ResMut<Messages<AudioCmd>>) {
    msgs.update();
}

/// Entry point of the dedicated audio thread.
///
/// The loop non-blockingly drains commands, updates its bookkeeping and
/// sleeps briefly between iterations to avoid busy-waiting. It returns when
/// it receives [`AudioCmd::Shutdown`].
pub fn audio_thread(rx_cmd: Receiver<AudioCmd>, tx_msg: Sender<AudioMessage>) {
    debug!(
        "audio thread starting (id={:?})",
        std::thread::current().id()
    );

    let mut musics: FxHashMap<String, String> = FxHashMap::default();
    let mut volumes: FxHashMap<String, f32> = FxHashMap::default();
    let mut playing: FxHashSet<String> = FxHashSet::default();
    let mut sounds: FxHashMap<String, String> = FxHashMap::default();

    'run: loop {
        for cmd in rx_cmd.try_iter() {
            match cmd {
                AudioCmd::LoadMusic { id, path } => {
                    if path.is_empty() {
                        let _ = tx_msg.send(AudioMessage::MusicLoadFailed {
                            id,
                            error: "empty path".to_string(),
                        });
                    } else {
                        debug!("music loaded id='{}' path='{}'", id, path);
                        musics.insert(id.clone(), path);
                        let _ = tx_msg.send(AudioMessage::MusicLoaded { id });
                    }
                }
                AudioCmd::UnloadMusic { id } => {
                    if musics.remove(&id).is_some() {
                        playing.remove(&id);
                        volumes.remove(&id);
                        let _ = tx_msg.send(AudioMessage::MusicUnloaded { id });
                    }
                }
                AudioCmd::PlayMusic { id, looped } => {
                    if musics.contains_key(&id) {
                        info!("music play id='{}' looped={}", id, looped);
                        playing.insert(id.clone());
                        let _ = tx_msg.send(AudioMessage::MusicPlayStarted { id });
                    } else {
                        warn!("music play failed id='{}': not loaded", id);
                    }
                }
                AudioCmd::StopMusic { id } | AudioCmd::PauseMusic { id } => {
                    if playing.remove(&id) {
                        let _ = tx_msg.send(AudioMessage::MusicStopped { id });
                    }
                }
                AudioCmd::ResumeMusic { id } => {
                    if musics.contains_key(&id) {
                        playing.insert(id.clone());
                        let _ = tx_msg.send(AudioMessage::MusicPlayStarted { id });
                    }
                }
                AudioCmd::VolumeMusic { id, vol } => {
                    if musics.contains_key(&id) {
                        volumes.insert(id.clone(), vol);
                        let _ = tx_msg.send(AudioMessage::MusicVolumeChanged { id, vol });
                    }
                }
                AudioCmd::LoadFx { id, path } => {
                    if path.is_empty() {
                        let _ = tx_msg.send(AudioMessage::FxLoadFailed {
                            id,
                            error: "empty path".to_string(),
                        });
                    } else {
                        debug!("fx loaded id='{}' path='{}'", id, path);
                        sounds.insert(id.clone(), path);
                        let _ = tx_msg.send(AudioMessage::FxLoaded { id });
                    }
                }
                AudioCmd::PlayFx {
                    id,
                    looped,
                    vol,
                    pan,
                } => {
                    if sounds.contains_key(&id) {
                        info!("fx play id='{}' loop={} vol={} pan={}", id, looped, vol, pan);
                        let _ = tx_msg.send(AudioMessage::FxPlayStarted { id });
                    } else {
                        warn!("fx play failed id='{}': not loaded", id);
                    }
                }
                AudioCmd::StopFx { id } => {
                    debug!("fx stop id='{}'", id);
                }
                AudioCmd::UnloadFx { id } => {
                    if sounds.remove(&id).is_some() {
                        let _ = tx_msg.send(AudioMessage::FxUnloaded { id });
                    }
                }
                AudioCmd::UnloadAllFx => {
                    sounds.clear();
                    let _ = tx_msg.send(AudioMessage::FxUnloadedAll);
                }
                AudioCmd::Shutdown => {
                    debug!("audio shutdown requested");
                    break 'run;
                }
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(10));
    } // 'run

    debug!(
        "audio thread exiting (id={:?})",
        std::thread::current().id()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_thread_answers_commands() {
        let (tx_cmd, rx_cmd) = unbounded();
        let (tx_msg, rx_msg) = unbounded();
        let handle = std::thread::spawn(move || audio_thread(rx_cmd, tx_msg));

        tx_cmd
            .send(AudioCmd::PlayFx {
                id: "hero.door".into(),
                looped: false,
                vol: 1.0,
                pan: 0.0,
            })
            .unwrap();
        tx_cmd
            .send(AudioCmd::LoadFx {
                id: "hero.door".into(),
                path: "door.ogg".into(),
            })
            .unwrap();
        tx_cmd
            .send(AudioCmd::PlayFx {
                id: "hero.door".into(),
                looped: false,
                vol: 1.0,
                pan: 0.0,
            })
            .unwrap();
        tx_cmd.send(AudioCmd::Shutdown).unwrap();
        handle.join().unwrap();

        let replies: Vec<AudioMessage> = rx_msg.try_iter().collect();
        assert_eq!(
            replies,
            vec![
                AudioMessage::FxLoaded { id: "hero.door".into() },
                AudioMessage::FxPlayStarted { id: "hero.door".into() },
            ]
        );
    }
}
