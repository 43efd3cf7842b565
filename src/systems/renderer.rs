//! Renderer update system.
//!
//! Advances the [`ActorRenderer`] of every actor in the current scene by the
//! frame delta. Completion callbacks go to the [`CallbackQueue`]; skeletal
//! events crossed during the update are triggered once every renderer has
//! been advanced, so each observer sees the whole frame's state.

use bevy_ecs::prelude::*;

use crate::components::actor::{Actor, ActorPosition};
use crate::components::renderer::{ActorRenderer, AnimationContext, Visual};
use crate::resources::assets::AssetManager;
use crate::resources::callbackqueue::CallbackQueue;
use crate::resources::scene::SceneRegistry;
use crate::resources::worldtime::WorldTime;

pub fn update_actor_renderers(
    time: Res<WorldTime>,
    registry: Res<SceneRegistry>,
    mut assets: ResMut<AssetManager>,
    mut callbacks: ResMut<CallbackQueue>,
    mut renderers: Query<&mut ActorRenderer>,
    mut commands: Commands,
) {
    let Some(scene) = registry.current_scene() else {
        return;
    };

    let mut events = Vec::new();
    let mut ctx = AnimationContext::new(assets.loader_mut(), &mut callbacks, &mut events);
    for &entity in scene.actors() {
        if let Ok(mut renderer) = renderers.get_mut(entity) {
            renderer.update(&mut ctx, time.delta);
        }
    }

    for event in events {
        commands.trigger(event);
    }
}

/// What the visible actors of the current scene look like, in scene order.
pub fn scene_visuals(world: &mut World, scale: f32) -> Vec<(String, Visual)> {
    let entities = world
        .resource::<SceneRegistry>()
        .current_scene()
        .map(|s| s.actors().to_vec())
        .unwrap_or_default();

    let mut query = world.query::<(&Actor, &ActorPosition, &mut ActorRenderer)>();
    entities
        .into_iter()
        .filter_map(|entity| {
            let (actor, position, mut renderer) = query.get_mut(world, entity).ok()?;
            actor
                .visible
                .then(|| (actor.id.clone(), renderer.visual(position.pos, scale)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::actor::Actor;
    use crate::components::animation::AnimationDesc;
    use crate::components::renderer::RendererKind;
    use crate::components::tween::TweenType;
    use crate::resources::assets::MemoryAssetLoader;
    use crate::resources::callbackqueue::ActionCallback;
    use crate::resources::scene::Scene;
    use crate::skeleton::data::tests::{figure_atlas, figure_file};
    use crate::systems::actorassets::{set_current_scene, with_animation_context};

    #[test]
    fn test_only_current_scene_advances() {
        let mut loader = MemoryAssetLoader::new();
        loader.add_atlas("figure", figure_atlas());
        loader.add_skeleton("figure", figure_file());

        let mut world = World::new();
        world.insert_resource(AssetManager::new(loader));
        world.init_resource::<CallbackQueue>();
        world.init_resource::<SceneRegistry>();
        world.init_resource::<WorldTime>();

        let spawn = |world: &mut World, id: &str| {
            let mut renderer = ActorRenderer::new(RendererKind::Skeletal);
            renderer.add_animation(AnimationDesc::new("wave", "figure"));
            world.spawn((Actor::new(id), renderer)).id()
        };
        let hero = spawn(&mut world, "hero");
        let guard = spawn(&mut world, "guard");
        {
            let mut registry = world.resource_mut::<SceneRegistry>();
            let mut street = Scene::new("street");
            street.add_actor("hero", hero);
            registry.add_scene(street);
            let mut hall = Scene::new("hall");
            hall.add_actor("guard", guard);
            registry.add_scene(hall);
        }
        set_current_scene(&mut world, "street").unwrap();

        with_animation_context(&mut world, |world, ctx| {
            let mut renderer = world.get_mut::<ActorRenderer>(hero).unwrap();
            renderer
                .start_animation(ctx, "wave", TweenType::NoRepeat, 1, Some(ActionCallback::new("waved")))
                .unwrap();
        });

        world.resource_mut::<WorldTime>().delta = 1.5;
        let mut schedule = Schedule::default();
        schedule.add_systems(update_actor_renderers);
        schedule.run(&mut world);

        assert!(world.get::<ActorRenderer>(hero).unwrap().is_complete());
        let drained = world.resource_mut::<CallbackQueue>().drain();
        assert_eq!(drained, vec![ActionCallback::new("waved")]);
    }
}
