//! Building the world from its model, saving it and restoring it.
//!
//! Actor ids are unique across scenes, so a saved actor is found again by id
//! wherever it was moved to.

use bevy_ecs::prelude::*;
use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::components::actor::{Actor, ActorPosition};
use crate::components::renderer::{ActorRenderer, SerializationMode};
use crate::components::tween::PositionTween;
use crate::error::Result;
use crate::resources::callbackqueue::CallbackQueue;
use crate::resources::scene::{Scene, SceneRegistry};
use crate::resources::worlddata::{ActorState, SceneState, WorldModel, WorldState};
use crate::systems::actorassets::{bring_up_actors, dispose_actor, set_current_scene};

/// Spawn every actor of `model` and make its initial scene current.
pub fn spawn_world(world: &mut World, model: &WorldModel) -> Result<()> {
    for scene_model in &model.scenes {
        let mut scene = Scene::new(scene_model.id.clone());
        for actor in &scene_model.actors {
            let mut entity = world.spawn((
                Actor {
                    id: actor.id.clone(),
                    visible: actor.visible,
                },
                ActorPosition { pos: actor.pos },
                actor.sounds.clone(),
            ));
            if let Some(spec) = &actor.renderer {
                entity.insert(ActorRenderer::from_model(spec.kind, spec.model.clone()));
            }
            scene.add_actor(actor.id.clone(), entity.id());
        }
        info!("Scene '{}' with {} actors", scene.id, scene.len());
        world.resource_mut::<SceneRegistry>().add_scene(scene);
    }

    match &model.init_scene {
        Some(id) => set_current_scene(world, id),
        None => Ok(()),
    }
}

/// Capture scene membership and the live state of every actor.
pub fn save_world(world: &World) -> Result<WorldState> {
    let registry = world.resource::<SceneRegistry>();
    let mut scenes: Vec<&Scene> = registry.scenes().collect();
    scenes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut saved = Vec::with_capacity(scenes.len());
    for scene in scenes {
        let mut actors = Vec::with_capacity(scene.len());
        for &entity in scene.actors() {
            let Some(actor) = world.get::<Actor>(entity) else {
                continue;
            };
            actors.push(ActorState {
                id: actor.id.clone(),
                pos: world
                    .get::<ActorPosition>(entity)
                    .map(|p| p.pos)
                    .unwrap_or_default(),
                visible: actor.visible,
                renderer: world
                    .get::<ActorRenderer>(entity)
                    .map(|r| r.write(SerializationMode::State))
                    .transpose()?,
                tween: world.get::<PositionTween>(entity).cloned(),
            });
        }
        saved.push(SceneState {
            id: scene.id.clone(),
            actors,
        });
    }

    Ok(WorldState {
        current_scene: registry.current_scene_id().map(str::to_string),
        cut_mode: registry.cut_mode(),
        scenes: saved,
        pending_callbacks: world.resource::<CallbackQueue>().iter().cloned().collect(),
    })
}

/// Bring a world built from the same model back to `state`.
///
/// Actors missing from the world are skipped with a warning. Every actor is
/// restored even when one fails; the first failure is returned.
pub fn restore_world(world: &mut World, state: &WorldState) -> Result<()> {
    let mut by_id: FxHashMap<String, Entity> = FxHashMap::default();
    let mut actors = world.query::<(Entity, &Actor)>();
    for (entity, actor) in actors.iter(world) {
        by_id.insert(actor.id.clone(), entity);
    }

    let outgoing = world
        .resource::<SceneRegistry>()
        .current_scene()
        .map(|s| s.actors().to_vec())
        .unwrap_or_default();
    for entity in outgoing {
        dispose_actor(world, entity);
    }

    {
        let mut registry = world.resource_mut::<SceneRegistry>();
        for scene_state in &state.scenes {
            let mut scene = Scene::new(scene_state.id.clone());
            for actor in &scene_state.actors {
                match by_id.get(&actor.id) {
                    Some(&entity) => scene.add_actor(actor.id.clone(), entity),
                    None => warn!("Saved actor '{}' does not exist", actor.id),
                }
            }
            registry.add_scene(scene);
        }
        registry.set_current(state.current_scene.clone());
        registry.set_cut_mode(state.cut_mode);
    }

    let mut first_error = None;
    for actor in state.scenes.iter().flat_map(|s| &s.actors) {
        let Some(&entity) = by_id.get(&actor.id) else {
            continue;
        };
        let mut entity = world.entity_mut(entity);
        if let Some(mut a) = entity.get_mut::<Actor>() {
            a.visible = actor.visible;
        }
        if let Some(mut position) = entity.get_mut::<ActorPosition>() {
            position.pos = actor.pos;
        }
        match &actor.tween {
            Some(tween) => {
                entity.insert(tween.clone());
            }
            None => {
                entity.remove::<PositionTween>();
            }
        }
        if let (Some(value), Some(mut renderer)) = (&actor.renderer, entity.get_mut::<ActorRenderer>())
            && let Err(e) = renderer.read(SerializationMode::State, value)
        {
            warn!("Could not restore renderer of '{}': {}", actor.id, e);
            first_error.get_or_insert(e);
        }
    }

    {
        let mut callbacks = world.resource_mut::<CallbackQueue>();
        callbacks.drain();
        for cb in &state.pending_callbacks {
            callbacks.add(cb.clone());
        }
    }

    let incoming = world
        .resource::<SceneRegistry>()
        .current_scene()
        .map(|s| s.actors().to_vec())
        .unwrap_or_default();
    if let Err(e) = bring_up_actors(world, &incoming) {
        first_error.get_or_insert(e);
    }

    info!("World restored, current scene {:?}", state.current_scene);
    first_error.map_or(Ok(()), Err)
}
