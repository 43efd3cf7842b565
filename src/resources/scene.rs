//! Scenes and the scene registry.
//!
//! A [`Scene`] is an ordered list of actor entities plus an index by actor
//! id. The [`SceneRegistry`] resource owns every scene, knows which one is
//! current and carries the cut-mode flag.
//!
//! Only actors of the current scene are updated and hold loaded assets.
//! Moving actors between scenes is done by
//! [`MoveToSceneAction`](crate::actions::movetoscene::MoveToSceneAction);
//! switching the current scene by
//! [`set_current_scene`](crate::systems::actorassets::set_current_scene).

use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub id: String,
    actors: Vec<Entity>,
    index: FxHashMap<String, Entity>,
}

impl Scene {
    pub fn new(id: impl Into<String>) -> Self {
        Scene {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Append an actor. An actor with the same id is replaced in place.
    pub fn add_actor(&mut self, id: impl Into<String>, entity: Entity) {
        let id = id.into();
        if let Some(previous) = self.index.insert(id, entity)
            && let Some(slot) = self.actors.iter_mut().find(|e| **e == previous)
        {
            *slot = entity;
            return;
        }
        self.actors.push(entity);
    }

    pub fn remove_actor(&mut self, id: &str) -> Option<Entity> {
        let entity = self.index.remove(id)?;
        self.actors.retain(|e| *e != entity);
        Some(entity)
    }

    pub fn actor(&self, id: &str) -> Option<Entity> {
        self.index.get(id).copied()
    }

    /// Actor entities in insertion order.
    pub fn actors(&self) -> &[Entity] {
        &self.actors
    }

    pub fn actor_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Every scene of the world.
#[derive(Resource, Debug, Default)]
pub struct SceneRegistry {
    scenes: FxHashMap<String, Scene>,
    current: Option<String>,
    cut_mode: bool,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scene(&mut self, scene: Scene) {
        self.scenes.insert(scene.id.clone(), scene);
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn scene_mut(&mut self, id: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(id)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    pub fn current_scene_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.as_deref().and_then(|id| self.scenes.get(id))
    }

    /// Mark `id` as current without touching any asset.
    pub fn set_current(&mut self, id: Option<String>) {
        self.current = id;
    }

    pub fn is_current(&self, id: &str) -> bool {
        self.current.as_deref() == Some(id)
    }

    /// Scene holding the actor entity, if any.
    pub fn scene_of(&self, entity: Entity) -> Option<&str> {
        self.scenes
            .values()
            .find(|s| s.actors.contains(&entity))
            .map(|s| s.id.as_str())
    }

    pub fn cut_mode(&self) -> bool {
        self.cut_mode
    }

    pub fn set_cut_mode(&mut self, value: bool) {
        self.cut_mode = value;
    }
}
