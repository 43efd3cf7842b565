//! Engine bootstrap and frame loop.
//!
//! - [`setup_world`] inserts the resources and observers every system relies on
//! - [`build_schedule`] orders the per-frame systems
//! - [`step`] runs one frame
//!
//! # Frame order
//!
//! 1. World time advances by the scaled delta
//! 2. Renderers of the current scene advance; skeletal events are triggered
//! 3. Position tweens and the music fade advance
//! 4. Scripts receive the frame's callbacks and verb requests and run actions
//! 5. Audio commands of the frame reach the audio thread
//!
//! Callbacks are never invoked from inside an update: every completion of
//! the frame is in the [`CallbackQueue`] before scripts see any of them.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::common_conditions::resource_exists;

use crate::events::audio::{AudioCmd, AudioMessage};
use crate::events::skeleton::skeleton_event_observer;
use crate::events::verb::VerbRequest;
use crate::resources::assets::{AssetLoader, AssetManager};
use crate::resources::audio::AudioBridge;
use crate::resources::callbackqueue::CallbackQueue;
use crate::resources::engineconfig::EngineConfig;
use crate::resources::music::MusicManager;
use crate::resources::scene::SceneRegistry;
use crate::resources::worldtime::WorldTime;
use crate::systems::audio::{
    forward_audio_cmds, poll_audio_messages, update_bevy_audio_cmds, update_bevy_audio_messages,
};
use crate::systems::renderer::update_actor_renderers;
use crate::systems::script::run_scripts;
use crate::systems::time::update_world_time;
use crate::systems::tween::{update_music, update_position_tweens};

/// Insert the engine resources and register the observers.
///
/// Audio and scripting are optional and set up by the host afterwards
/// ([`setup_audio`](crate::resources::audio::setup_audio), a
/// `LuaRuntime` non-send resource).
pub fn setup_world(world: &mut World, config: EngineConfig, loader: impl AssetLoader + 'static) {
    world.insert_resource(WorldTime::default().with_time_scale(config.time_scale));
    world.insert_resource(config);
    world.insert_resource(AssetManager::new(loader));
    world.insert_resource(CallbackQueue::new());
    world.insert_resource(SceneRegistry::new());
    world.insert_resource(MusicManager::new());
    world.init_resource::<Messages<VerbRequest>>();
    world.init_resource::<Messages<AudioCmd>>();
    world.init_resource::<Messages<AudioMessage>>();

    world.add_observer(skeleton_event_observer);
    // Ensure the observer is registered before we run any systems that may trigger events.
    world.flush();
}

pub fn build_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        (
            update_actor_renderers,
            update_position_tweens,
            update_music,
            run_scripts,
        )
            .chain(),
    );
    update.add_systems(
        // audio systems must be together
        (
            // First, advance AudioCmd messages and forward them to the audio thread
            update_bevy_audio_cmds,
            forward_audio_cmds.run_if(resource_exists::<AudioBridge>),
            // Then, pull audio thread messages and advance them
            poll_audio_messages.run_if(resource_exists::<AudioBridge>),
            update_bevy_audio_messages,
        )
            .chain()
            .after(run_scripts),
    );
    update
}

/// Run one frame of `dt` unscaled seconds.
pub fn step(world: &mut World, schedule: &mut Schedule, dt: f32) {
    update_world_time(world, dt);
    schedule.run(world);
    world.clear_trackers();
}
