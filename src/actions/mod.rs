//! Declarative actions run by the scripting layer.
//!
//! An action is a small, serializable command run against the world. It
//! returns whether it blocks: a blocking action hands `cb` to something that
//! queues it on completion, and the caller waits for that callback before
//! running its next action.
//!
//! Submodules overview:
//! - [`animation`] – start an animation on a scene actor
//! - [`movetoscene`] – move an actor between scenes, handling its assets
//! - [`position`] – tween an actor to a point
//! - [`setcutmode`] – toggle the cut-scene mode flag
//! - [`sound`] – play one of an actor's sound effects

pub mod animation;
pub mod movetoscene;
pub mod position;
pub mod setcutmode;
pub mod sound;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::resources::callbackqueue::ActionCallback;
use crate::resources::scene::SceneRegistry;

pub use animation::AnimationAction;
pub use movetoscene::MoveToSceneAction;
pub use position::PositionAction;
pub use setcutmode::SetCutmodeAction;
pub use sound::PlaySoundAction;

pub trait Action {
    /// Run against `world`. Returns `true` when the caller must wait for `cb`.
    fn run(&self, world: &mut World, cb: Option<ActionCallback>) -> bool;
}

/// Reference to an actor, optionally qualified by its scene.
///
/// Without a scene the actor is looked up in the current scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneActorRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl SceneActorRef {
    pub fn new(scene: Option<&str>, actor: &str) -> Self {
        SceneActorRef {
            scene: scene.map(str::to_string),
            actor: Some(actor.to_string()),
        }
    }

    /// Id of the referenced scene, falling back to the current one.
    pub fn scene_id<'a>(&'a self, registry: &'a SceneRegistry) -> Option<&'a str> {
        self.scene
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| registry.current_scene_id())
    }

    /// Entity of the referenced actor, if it is in its scene.
    pub fn entity(&self, registry: &SceneRegistry) -> Option<Entity> {
        let actor = self.actor.as_deref()?;
        registry.scene(self.scene_id(registry)?)?.actor(actor)
    }
}

/// Every action the engine knows, tagged by `type` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionKind {
    Animation(AnimationAction),
    MoveToScene(MoveToSceneAction),
    Position(PositionAction),
    SetCutmode(SetCutmodeAction),
    PlaySound(PlaySoundAction),
}

impl Action for ActionKind {
    fn run(&self, world: &mut World, cb: Option<ActionCallback>) -> bool {
        match self {
            ActionKind::Animation(a) => a.run(world, cb),
            ActionKind::MoveToScene(a) => a.run(world, cb),
            ActionKind::Position(a) => a.run(world, cb),
            ActionKind::SetCutmode(a) => a.run(world, cb),
            ActionKind::PlaySound(a) => a.run(world, cb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::scene::Scene;

    #[test]
    fn test_actor_ref_defaults_to_current_scene() {
        let mut world = World::new();
        let door = world.spawn_empty().id();
        let mut registry = SceneRegistry::new();
        let mut street = Scene::new("street");
        street.add_actor("door", door);
        registry.add_scene(street);
        registry.add_scene(Scene::new("hall"));

        let unqualified = SceneActorRef::new(None, "door");
        assert_eq!(unqualified.entity(&registry), None);

        registry.set_current(Some("street".into()));
        assert_eq!(unqualified.entity(&registry), Some(door));
        assert_eq!(SceneActorRef::new(Some("hall"), "door").entity(&registry), None);
    }

    #[test]
    fn test_action_kind_is_tagged() {
        let json = r#"[
            {"type": "SetCutmode"},
            {"type": "MoveToScene", "actor": {"actor": "key"}, "scene": "hall"}
        ]"#;
        let actions: Vec<ActionKind> = serde_json::from_str(json).unwrap();
        assert_eq!(actions[0], ActionKind::SetCutmode(SetCutmodeAction { value: true }));
        match &actions[1] {
            ActionKind::MoveToScene(a) => {
                assert_eq!(a.actor.actor.as_deref(), Some("key"));
                assert_eq!(a.scene.as_deref(), Some("hall"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }
}
