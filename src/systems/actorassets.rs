//! Actor asset lifecycle.
//!
//! Actors hold assets only while their scene is current. These helpers run
//! the load / finish / retrieve / dispose sequence on actor entities from
//! exclusive code (actions, scene switches, world restore). Skeletal events
//! crossed while retrieving are triggered once the resources are back in the
//! world; audio commands go to `Messages<AudioCmd>` when audio is set up.

use bevy_ecs::prelude::*;
use log::{debug, error, warn};

use crate::components::actor::{Actor, ActorSounds};
use crate::components::renderer::{ActorRenderer, AnimationContext};
use crate::error::{EngineError, Result};
use crate::events::audio::AudioCmd;
use crate::resources::assets::AssetManager;
use crate::resources::callbackqueue::CallbackQueue;
use crate::resources::scene::SceneRegistry;

/// Run `f` with an [`AnimationContext`] built from the world's resources.
///
/// [`AssetManager`] and [`CallbackQueue`] are taken out of the world for the
/// duration of `f`; the skeletal events collected are triggered afterwards.
pub fn with_animation_context<R>(
    world: &mut World,
    f: impl FnOnce(&mut World, &mut AnimationContext<'_>) -> R,
) -> R {
    let mut events = Vec::new();
    let result = world.resource_scope(|world, mut assets: Mut<AssetManager>| {
        world.resource_scope(|world, mut callbacks: Mut<CallbackQueue>| {
            let mut ctx = AnimationContext::new(assets.loader_mut(), &mut callbacks, &mut events);
            f(world, &mut ctx)
        })
    });
    for event in events {
        world.trigger(event);
    }
    result
}

fn write_audio_cmds(world: &mut World, cmds: Vec<AudioCmd>) {
    if cmds.is_empty() {
        return;
    }
    match world.get_resource_mut::<Messages<AudioCmd>>() {
        Some(mut messages) => {
            for cmd in cmds {
                messages.write(cmd);
            }
        }
        None => debug!("No audio set up, dropping {} audio commands", cmds.len()),
    }
}

fn actor_id(world: &World, entity: Entity) -> Option<String> {
    let id = world.get::<Actor>(entity).map(|a| a.id.clone());
    if id.is_none() {
        warn!("Entity {:?} is not an actor", entity);
    }
    id
}

/// Enqueue the actor's assets. Nothing is usable before [`finish_loading`].
pub fn load_actor(world: &mut World, entity: Entity) {
    let Some(id) = actor_id(world, entity) else {
        return;
    };
    let cmds = world.resource_scope(|world, mut assets: Mut<AssetManager>| {
        if let Some(mut renderer) = world.get_mut::<ActorRenderer>(entity) {
            renderer.load_assets(assets.loader_mut());
        }
        world
            .get_mut::<ActorSounds>(entity)
            .map(|mut sounds| sounds.load_assets(&id, assets.loader_mut()))
            .unwrap_or_default()
    });
    write_audio_cmds(world, cmds);
}

/// Block until every enqueued asset is available.
pub fn finish_loading(world: &mut World) {
    world.resource_mut::<AssetManager>().loader_mut().finish_loading();
}

/// Materialize the loaded assets of the actor and restore its animation.
pub fn retrieve_actor(world: &mut World, entity: Entity) -> Result<()> {
    with_animation_context(world, |world, ctx| {
        match world.get_mut::<ActorRenderer>(entity) {
            Some(mut renderer) => renderer.retrieve_assets(ctx),
            None => Ok(()),
        }
    })
}

/// Release everything the actor holds.
pub fn dispose_actor(world: &mut World, entity: Entity) {
    let Some(id) = actor_id(world, entity) else {
        return;
    };
    let cmds = world.resource_scope(|world, mut assets: Mut<AssetManager>| {
        if let Some(mut renderer) = world.get_mut::<ActorRenderer>(entity) {
            renderer.dispose(assets.loader_mut());
        }
        world
            .get_mut::<ActorSounds>(entity)
            .map(|mut sounds| sounds.dispose(&id, assets.loader_mut()))
            .unwrap_or_default()
    });
    write_audio_cmds(world, cmds);
}

/// Load, finish and retrieve a batch of actors.
///
/// Every actor is tried; the first retrieve error is returned.
pub fn bring_up_actors(world: &mut World, entities: &[Entity]) -> Result<()> {
    for &entity in entities {
        load_actor(world, entity);
    }
    finish_loading(world);

    let mut first_error = None;
    for &entity in entities {
        if let Err(e) = retrieve_actor(world, entity) {
            error!("Could not retrieve assets of {:?}: {}", entity, e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Make `id` the current scene.
///
/// The actors of the previous current scene release their assets before
/// the actors of the new one load theirs. Switching to the scene that is
/// already current does nothing.
pub fn set_current_scene(world: &mut World, id: &str) -> Result<()> {
    let registry = world.resource::<SceneRegistry>();
    let Some(scene) = registry.scene(id) else {
        return Err(EngineError::SceneNotFound(id.to_string()));
    };
    if registry.is_current(id) {
        return Ok(());
    }
    let incoming = scene.actors().to_vec();
    let outgoing = registry
        .current_scene()
        .map(|s| s.actors().to_vec())
        .unwrap_or_default();

    for entity in outgoing {
        dispose_actor(world, entity);
    }
    world
        .resource_mut::<SceneRegistry>()
        .set_current(Some(id.to_string()));
    debug!("Current scene: {}", id);

    bring_up_actors(world, &incoming)
}
