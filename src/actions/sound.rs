use bevy_ecs::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::actions::{Action, SceneActorRef};
use crate::components::actor::ActorSounds;
use crate::events::audio::AudioCmd;
use crate::resources::assets::AssetManager;
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::scene::SceneRegistry;

/// Play one of an actor's sound effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaySoundAction {
    pub actor: SceneActorRef,
    pub sound: String,
}

impl PlaySoundAction {
    pub fn new(actor: SceneActorRef, sound: impl Into<String>) -> Self {
        PlaySoundAction {
            actor,
            sound: sound.into(),
        }
    }
}

impl Action for PlaySoundAction {
    fn run(&self, world: &mut World, _cb: Option<ActionCallback>) -> bool {
        let (Some(entity), Some(actor_id)) = (
            self.actor.entity(world.resource::<SceneRegistry>()),
            self.actor.actor.clone(),
        ) else {
            warn!("PlaySoundAction: actor {:?} not found", self.actor);
            return false;
        };

        let cmds = world.resource_scope(|world, mut assets: Mut<AssetManager>| {
            world
                .get_mut::<ActorSounds>(entity)
                .map(|mut sounds| sounds.play(&actor_id, &self.sound, assets.loader_mut()))
        });
        match (cmds, world.get_resource_mut::<Messages<AudioCmd>>()) {
            (Some(cmds), Some(mut messages)) => {
                for cmd in cmds {
                    messages.write(cmd);
                }
            }
            (None, _) => warn!("PlaySoundAction: actor '{}' has no sounds", actor_id),
            (Some(_), None) => {}
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::actor::{Actor, SoundFx};
    use crate::resources::assets::MemoryAssetLoader;
    use crate::resources::scene::Scene;

    #[test]
    fn test_writes_audio_commands() {
        let mut loader = MemoryAssetLoader::new();
        loader.add_sound("door.ogg");
        let mut world = World::new();
        world.insert_resource(AssetManager::new(loader));
        world.init_resource::<SceneRegistry>();
        world.init_resource::<Messages<AudioCmd>>();

        let mut sounds = ActorSounds::default();
        sounds.add("door", SoundFx::new("door.ogg"));
        let hero = world.spawn((Actor::new("hero"), sounds)).id();
        {
            let mut registry = world.resource_mut::<SceneRegistry>();
            let mut street = Scene::new("street");
            street.add_actor("hero", hero);
            registry.add_scene(street);
            registry.set_current(Some("street".into()));
        }

        let action = PlaySoundAction::new(SceneActorRef::new(None, "hero"), "door");
        assert!(!action.run(&mut world, None));

        let cmds: Vec<AudioCmd> = world.resource_mut::<Messages<AudioCmd>>().drain().collect();
        assert_eq!(cmds.len(), 2);
        assert!(matches!(&cmds[1], AudioCmd::PlayFx { id, .. } if id == "hero.door"));
    }
}
