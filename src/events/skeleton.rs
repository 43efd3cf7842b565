//! Skeletal animation events.
//!
//! Skeleton clips carry event keys authored at specific times. The name of
//! the key is the id of the actor it targets; its integer selects what to do
//! and its string is the argument. When playback crosses a key, the renderer
//! pushes a [`SkeletonEvent`] into its
//! [`AnimationContext`](crate::components::renderer::AnimationContext); the
//! update system then triggers it so that [`skeleton_event_observer`]
//! resolves the target in the current scene.
//!
//! # Event Flow
//!
//! 1. `update_actor_renderers` advances every renderer of the current scene
//! 2. Crossed event keys are collected as `SkeletonEvent`s
//! 3. After the update loop, each event is triggered
//! 4. `skeleton_event_observer` looks the target actor up by id
//! 5. The event starts an animation, plays a sound, or requests a verb
//!
//! A target that is not in the current scene is dropped with a debug log.
//!
//! # Related
//!
//! - [`crate::components::skeletalrenderer::SkeletalRenderer`] – collects the events
//! - [`crate::systems::renderer::update_actor_renderers`] – triggers them
//! - [`crate::events::verb::VerbRequest`] – what a verb event becomes

use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{debug, error};

use crate::components::actor::ActorSounds;
use crate::components::renderer::{ActorRenderer, AnimationContext};
use crate::components::tween::TweenType;
use crate::events::audio::AudioCmd;
use crate::events::verb::VerbRequest;
use crate::resources::assets::AssetManager;
use crate::resources::callbackqueue::CallbackQueue;
use crate::resources::scene::SceneRegistry;

pub const PLAY_ANIMATION_EVENT: i32 = 0;
pub const PLAY_SOUND_EVENT: i32 = 1;
pub const RUN_VERB_EVENT: i32 = 2;
/// Authoring marker for loop points, no runtime effect.
pub const LOOP_EVENT: i32 = 3;

/// What a skeletal event asks the target actor to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SkeletonEventKind {
    PlayAnimation(String),
    PlaySound(String),
    RunVerb(String),
    Loop,
}

impl SkeletonEventKind {
    /// Decode the integer/string pair of an event key.
    pub fn from_code(code: i32, argument: &str) -> Option<Self> {
        let argument = argument.to_string();
        match code {
            PLAY_ANIMATION_EVENT => Some(SkeletonEventKind::PlayAnimation(argument)),
            PLAY_SOUND_EVENT => Some(SkeletonEventKind::PlaySound(argument)),
            RUN_VERB_EVENT => Some(SkeletonEventKind::RunVerb(argument)),
            LOOP_EVENT => Some(SkeletonEventKind::Loop),
            _ => None,
        }
    }
}

/// Event fired when skeletal playback crosses an event key.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct SkeletonEvent {
    /// Id of the target actor in the current scene.
    pub actor: String,
    pub kind: SkeletonEventKind,
}

/// Observer dispatching [`SkeletonEvent`]s to their target actor.
///
/// Animations started here can cross event keys themselves; those are
/// re-triggered after this observer returns.
#[allow(clippy::too_many_arguments)]
pub fn skeleton_event_observer(
    trigger: On<SkeletonEvent>,
    mut commands: Commands,
    registry: Res<SceneRegistry>,
    mut assets: ResMut<AssetManager>,
    mut callbacks: ResMut<CallbackQueue>,
    mut renderers: Query<&mut ActorRenderer>,
    mut sounds: Query<&mut ActorSounds>,
    mut audio_cmd_writer: MessageWriter<AudioCmd>,
    mut verb_writer: MessageWriter<VerbRequest>,
) {
    let event = trigger.event();

    let Some(entity) = registry.current_scene().and_then(|s| s.actor(&event.actor)) else {
        debug!("Actor in skeleton event not found in scene: {}", event.actor);
        return;
    };

    match &event.kind {
        SkeletonEventKind::PlayAnimation(id) => {
            let Ok(mut renderer) = renderers.get_mut(entity) else {
                debug!("Actor '{}' has no renderer for animation '{}'", event.actor, id);
                return;
            };
            let mut fired = Vec::new();
            let mut ctx = AnimationContext::new(assets.loader_mut(), &mut callbacks, &mut fired);
            if let Err(e) = renderer.start_animation(&mut ctx, id, TweenType::SpriteDefined, 1, None)
            {
                error!("Skeleton event animation '{}.{}': {}", event.actor, id, e);
            }
            for ev in fired {
                commands.trigger(ev);
            }
        }
        SkeletonEventKind::PlaySound(id) => match sounds.get_mut(entity) {
            Ok(mut actor_sounds) => {
                let cmds = actor_sounds.play(&event.actor, id, assets.loader_mut());
                audio_cmd_writer.write_batch(cmds);
            }
            Err(_) => debug!("Actor '{}' has no sounds, cannot play '{}'", event.actor, id),
        },
        SkeletonEventKind::RunVerb(verb) => {
            verb_writer.write(VerbRequest {
                actor: event.actor.clone(),
                verb: verb.clone(),
            });
        }
        SkeletonEventKind::Loop => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes() {
        assert_eq!(
            SkeletonEventKind::from_code(0, "wave"),
            Some(SkeletonEventKind::PlayAnimation("wave".into()))
        );
        assert_eq!(
            SkeletonEventKind::from_code(1, "door.ogg"),
            Some(SkeletonEventKind::PlaySound("door.ogg".into()))
        );
        assert_eq!(
            SkeletonEventKind::from_code(2, ""),
            Some(SkeletonEventKind::RunVerb(String::new()))
        );
        assert_eq!(SkeletonEventKind::from_code(3, ""), Some(SkeletonEventKind::Loop));
        assert_eq!(SkeletonEventKind::from_code(7, "x"), None);
    }
}
