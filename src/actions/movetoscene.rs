//! Move an actor from one scene to another.
//!
//! Only actors of the current scene hold assets, so the transfer keeps the
//! asset lifecycle in step with the scene membership:
//!
//! | from current | to current | effect                                   |
//! |--------------|------------|------------------------------------------|
//! | yes          | no         | the actor's assets are disposed          |
//! | no           | yes        | load, finish loading, retrieve           |
//! | yes          | yes        | dispose, then load again                 |
//! | no           | no         | membership only                          |
//!
//! Every id is resolved before anything is touched: a failed transfer
//! leaves both scenes as they were.

use bevy_ecs::prelude::*;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::actions::{Action, SceneActorRef};
use crate::error::{EngineError, Result};
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::scene::SceneRegistry;
use crate::systems::actorassets::{bring_up_actors, dispose_actor};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveToSceneAction {
    /// Actor to move. Without a scene it is taken from the current one.
    #[serde(default)]
    pub actor: SceneActorRef,
    /// Target scene. Empty or missing means the current scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
}

impl MoveToSceneAction {
    pub fn new(actor: SceneActorRef, scene: Option<&str>) -> Self {
        MoveToSceneAction {
            actor,
            scene: scene.map(str::to_string),
        }
    }

    /// Perform the transfer, reporting why it could not happen.
    pub fn move_actor(&self, world: &mut World) -> Result<()> {
        let registry = world.resource::<SceneRegistry>();

        let actor_id = self
            .actor
            .actor
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(EngineError::NoActorSpecified)?;

        let source_id = self
            .actor
            .scene_id(registry)
            .ok_or(EngineError::NoCurrentScene)?
            .to_string();
        let source = registry
            .scene(&source_id)
            .ok_or_else(|| EngineError::SceneNotFound(source_id.clone()))?;
        let entity = source
            .actor(actor_id)
            .ok_or_else(|| EngineError::ActorNotFound {
                actor: actor_id.to_string(),
                scene: source_id.clone(),
            })?;

        let target_id = match self.scene.as_deref().filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => registry
                .current_scene_id()
                .ok_or(EngineError::NoCurrentScene)?
                .to_string(),
        };
        if registry.scene(&target_id).is_none() {
            return Err(EngineError::SceneNotFound(target_id));
        }

        let from_current = registry.is_current(&source_id);
        let to_current = registry.is_current(&target_id);
        let actor_id = actor_id.to_string();

        if let Some(scene) = world.resource_mut::<SceneRegistry>().scene_mut(&source_id) {
            scene.remove_actor(&actor_id);
        }
        if from_current {
            dispose_actor(world, entity);
        }

        // The actor joins its new scene even when its assets fail to come up.
        let retrieved = if to_current {
            bring_up_actors(world, &[entity])
        } else {
            Ok(())
        };

        if let Some(scene) = world.resource_mut::<SceneRegistry>().scene_mut(&target_id) {
            scene.add_actor(actor_id.as_str(), entity);
        }
        debug!("Actor '{}' moved from '{}' to '{}'", actor_id, source_id, target_id);
        retrieved
    }
}

impl Action for MoveToSceneAction {
    fn run(&self, world: &mut World, _cb: Option<ActionCallback>) -> bool {
        if let Err(e) = self.move_actor(world) {
            error!("MoveToSceneAction: {}", e);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::actor::Actor;
    use crate::components::animation::AnimationDesc;
    use crate::components::renderer::{ActorRenderer, RendererKind};
    use crate::resources::assets::{AssetManager, MemoryAssetLoader};
    use crate::resources::callbackqueue::CallbackQueue;
    use crate::resources::scene::Scene;
    use crate::skeleton::data::tests::{figure_atlas, figure_file};
    use crate::systems::actorassets::set_current_scene;

    struct Fixture {
        world: World,
        hero: Entity,
    }

    /// `street` (current) holds the hero; `hall` is empty.
    fn fixture() -> Fixture {
        let mut loader = MemoryAssetLoader::new();
        loader.add_atlas("figure", figure_atlas());
        loader.add_skeleton("figure", figure_file());

        let mut world = World::new();
        world.insert_resource(AssetManager::new(loader));
        world.init_resource::<CallbackQueue>();
        world.init_resource::<SceneRegistry>();

        let mut renderer = ActorRenderer::new(RendererKind::Skeletal);
        renderer.add_animation(AnimationDesc::new("walk", "figure"));
        let hero = world.spawn((Actor::new("hero"), renderer)).id();

        {
            let mut registry = world.resource_mut::<SceneRegistry>();
            let mut street = Scene::new("street");
            street.add_actor("hero", hero);
            registry.add_scene(street);
            registry.add_scene(Scene::new("hall"));
        }
        set_current_scene(&mut world, "street").unwrap();
        Fixture { world, hero }
    }

    fn is_loaded(world: &World) -> bool {
        world.resource::<AssetManager>().loader().is_loaded("figure")
    }

    fn has_runtime(world: &World, hero: Entity) -> bool {
        world
            .get::<ActorRenderer>(hero)
            .and_then(ActorRenderer::as_skeletal)
            .is_some_and(|r| r.current_runtime().is_some())
    }

    #[test]
    fn test_move_out_of_current_scene_disposes() {
        let Fixture { mut world, hero } = fixture();
        assert!(is_loaded(&world));

        let action = MoveToSceneAction::new(SceneActorRef::new(None, "hero"), Some("hall"));
        assert!(!action.run(&mut world, Some(ActionCallback::new("cb"))));

        let registry = world.resource::<SceneRegistry>();
        assert!(!registry.scene("street").unwrap().contains("hero"));
        assert_eq!(registry.scene("hall").unwrap().actor("hero"), Some(hero));
        assert!(!is_loaded(&world));
        assert!(!has_runtime(&world, hero));
        let skeletal = world.get::<ActorRenderer>(hero).unwrap().as_skeletal().unwrap();
        assert!(skeletal.source_cache().is_empty());
    }

    #[test]
    fn test_move_into_current_scene_retrieves() {
        let Fixture { mut world, hero } = fixture();
        MoveToSceneAction::new(SceneActorRef::new(None, "hero"), Some("hall"))
            .move_actor(&mut world)
            .unwrap();
        assert!(!has_runtime(&world, hero));

        MoveToSceneAction::new(SceneActorRef::new(Some("hall"), "hero"), None)
            .move_actor(&mut world)
            .unwrap();

        assert!(is_loaded(&world));
        let registry = world.resource::<SceneRegistry>();
        assert_eq!(registry.scene("street").unwrap().actors(), &[hero]);
        assert!(has_runtime(&world, hero));
        let skeletal = world.get::<ActorRenderer>(hero).unwrap().as_skeletal().unwrap();
        assert_eq!(skeletal.current_animation_id().as_deref(), Some("walk"));
        assert!(skeletal.current_runtime().unwrap().state.current_clip().is_some());
    }

    #[test]
    fn test_move_within_current_scene_reloads() {
        let Fixture { mut world, hero } = fixture();
        MoveToSceneAction::new(SceneActorRef::new(None, "hero"), Some("street"))
            .move_actor(&mut world)
            .unwrap();
        assert!(is_loaded(&world));
        assert_eq!(world.resource::<SceneRegistry>().scene("street").unwrap().actors(), &[hero]);
    }

    #[test]
    fn test_failures_leave_scenes_untouched() {
        let Fixture { mut world, hero } = fixture();

        let no_actor = MoveToSceneAction::new(SceneActorRef::default(), Some("hall"));
        assert!(matches!(no_actor.move_actor(&mut world), Err(EngineError::NoActorSpecified)));

        let unknown = MoveToSceneAction::new(SceneActorRef::new(None, "ghost"), Some("hall"));
        assert!(matches!(unknown.move_actor(&mut world), Err(EngineError::ActorNotFound { .. })));

        let nowhere = MoveToSceneAction::new(SceneActorRef::new(None, "hero"), Some("attic"));
        assert!(matches!(nowhere.move_actor(&mut world), Err(EngineError::SceneNotFound(_))));
        assert!(!nowhere.run(&mut world, None));

        let registry = world.resource::<SceneRegistry>();
        assert_eq!(registry.scene("street").unwrap().actor("hero"), Some(hero));
        assert!(registry.scene("hall").unwrap().is_empty());
        assert!(is_loaded(&world));
    }
}
