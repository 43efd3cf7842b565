//! Tween systems.
//!
//! - [`update_position_tweens`] – walks actors along their [`PositionTween`]
//! - [`update_music`] – advances the music volume fade
//!
//! Both read the frame delta from [`WorldTime`] and queue completion
//! callbacks on the [`CallbackQueue`].

use bevy_ecs::prelude::*;

use crate::components::actor::ActorPosition;
use crate::components::tween::PositionTween;
use crate::events::audio::AudioCmd;
use crate::resources::callbackqueue::CallbackQueue;
use crate::resources::music::MusicManager;
use crate::resources::worldtime::WorldTime;

/// Advance position tweens, removing each one once it completes.
pub fn update_position_tweens(
    time: Res<WorldTime>,
    mut callbacks: ResMut<CallbackQueue>,
    mut query: Query<(Entity, &mut ActorPosition, &mut PositionTween)>,
    mut commands: Commands,
) {
    for (entity, mut position, mut tween) in query.iter_mut() {
        tween.0.update(&mut *position, time.delta, &mut callbacks);
        if tween.0.is_complete() {
            commands.entity(entity).remove::<PositionTween>();
        }
    }
}

/// Advance the music fade and forward the new volume.
pub fn update_music(
    time: Res<WorldTime>,
    mut music: ResMut<MusicManager>,
    mut callbacks: ResMut<CallbackQueue>,
    mut writer: MessageWriter<AudioCmd>,
) {
    if !music.is_fading() {
        return;
    }
    if let Some(cmd) = music.update(time.delta, &mut callbacks) {
        writer.write(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tween::Interpolation;
    use crate::resources::callbackqueue::ActionCallback;
    use glam::Vec2;

    fn world(delta: f32) -> World {
        let mut world = World::new();
        world.insert_resource(WorldTime {
            delta,
            ..Default::default()
        });
        world.init_resource::<CallbackQueue>();
        world
    }

    #[test]
    fn test_position_tween_moves_and_finishes() {
        let mut world = world(1.0);
        let hero = world
            .spawn((
                ActorPosition::new(0.0, 0.0),
                PositionTween::new(
                    Vec2::ZERO,
                    Vec2::new(20.0, 10.0),
                    2.0,
                    Interpolation::Linear,
                    Some(ActionCallback::new("arrived")),
                ),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(update_position_tweens);

        schedule.run(&mut world);
        assert_eq!(world.get::<ActorPosition>(hero).unwrap().pos, Vec2::new(10.0, 5.0));
        assert!(world.resource::<CallbackQueue>().is_empty());

        schedule.run(&mut world);
        assert_eq!(world.get::<ActorPosition>(hero).unwrap().pos, Vec2::new(20.0, 10.0));
        assert!(world.get::<PositionTween>(hero).is_none());
        assert_eq!(world.resource::<CallbackQueue>().len(), 1);
    }

    #[test]
    fn test_music_fade_writes_volume() {
        let mut world = world(0.5);
        world.init_resource::<Messages<AudioCmd>>();
        let mut music = MusicManager::new();
        music.play("theme", "theme.ogg");
        music.fade_to(0.0, 1.0, Interpolation::Linear, None);
        world.insert_resource(music);

        let mut schedule = Schedule::default();
        schedule.add_systems(update_music);
        schedule.run(&mut world);

        let cmds: Vec<AudioCmd> = world.resource_mut::<Messages<AudioCmd>>().drain().collect();
        assert_eq!(
            cmds,
            vec![AudioCmd::VolumeMusic {
                id: "theme".into(),
                vol: 0.5
            }]
        );
    }
}
