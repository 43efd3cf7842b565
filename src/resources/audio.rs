//! Channel pair between the world and the headless audio thread.
//!
//! The engine never touches an audio device. Actors and the music manager
//! write [`AudioCmd`]s; when a host calls [`setup_audio`], the frame's
//! commands are forwarded to [`audio_thread`], which keeps the bookkeeping a
//! device backend would need and answers with [`AudioMessage`]s. Without the
//! bridge the commands simply expire with their message queue.
//!
//! [`shutdown_audio`] stops the thread and removes the bridge.

use std::thread::JoinHandle;

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, warn};

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::systems::audio::audio_thread;

/// Present only while the audio thread runs.
#[derive(Resource)]
pub struct AudioBridge {
    commands: Sender<AudioCmd>,
    replies: Receiver<AudioMessage>,
    handle: Option<JoinHandle<()>>,
}

impl AudioBridge {
    /// Queue a command for the audio thread. Returns `false` once it has exited.
    pub fn send(&self, cmd: AudioCmd) -> bool {
        self.commands.send(cmd).is_ok()
    }

    /// Replies received so far, without blocking.
    pub fn replies(&self) -> impl Iterator<Item = AudioMessage> + '_ {
        self.replies.try_iter()
    }
}

/// Start the audio thread and insert the [`AudioBridge`].
///
/// The `AudioCmd`/`AudioMessage` queues are created when missing, so this
/// also works on a world not built by `setup_world`.
pub fn setup_audio(world: &mut World) {
    if world.contains_resource::<AudioBridge>() {
        warn!("Audio thread already running");
        return;
    }

    let (commands, rx_cmd) = unbounded::<AudioCmd>();
    let (tx_msg, replies) = unbounded::<AudioMessage>();

    let handle = match std::thread::Builder::new()
        .name("advengine-audio".into())
        .spawn(move || audio_thread(rx_cmd, tx_msg))
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Could not start the audio thread, running silent: {}", e);
            return;
        }
    };

    world.insert_resource(AudioBridge {
        commands,
        replies,
        handle: Some(handle),
    });
    world.init_resource::<Messages<AudioCmd>>();
    world.init_resource::<Messages<AudioMessage>>();
}

/// Ask the audio thread to stop and wait for it.
pub fn shutdown_audio(world: &mut World) {
    let Some(mut bridge) = world.remove_resource::<AudioBridge>() else {
        return;
    };
    bridge.send(AudioCmd::Shutdown);
    if let Some(handle) = bridge.handle.take()
        && handle.join().is_err()
    {
        error!("Audio thread panicked");
    }
    debug!("Audio stopped");
}
