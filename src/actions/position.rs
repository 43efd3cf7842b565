use bevy_ecs::prelude::*;
use glam::Vec2;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::actions::{Action, SceneActorRef};
use crate::components::actor::ActorPosition;
use crate::components::tween::{Interpolation, PositionTween};
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::scene::SceneRegistry;

/// Tween an actor from where it stands to `pos`.
///
/// A zero duration places the actor at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionAction {
    pub actor: SceneActorRef,
    pub pos: Vec2,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub wait: bool,
}

impl PositionAction {
    pub fn new(actor: SceneActorRef, pos: Vec2, duration: f32) -> Self {
        PositionAction {
            actor,
            pos,
            duration,
            interpolation: Interpolation::Linear,
            wait: false,
        }
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }
}

impl Action for PositionAction {
    fn run(&self, world: &mut World, cb: Option<ActionCallback>) -> bool {
        let Some(entity) = self.actor.entity(world.resource::<SceneRegistry>()) else {
            warn!("PositionAction: actor {:?} not found", self.actor);
            return false;
        };
        let Some(mut position) = world.get_mut::<ActorPosition>(entity) else {
            warn!("PositionAction: actor {:?} has no position", self.actor);
            return false;
        };

        if self.duration <= 0.0 {
            position.pos = self.pos;
            world.entity_mut(entity).remove::<PositionTween>();
            return false;
        }

        let from = position.pos;
        let cb = if self.wait { cb } else { None };
        let blocking = cb.is_some();
        world.entity_mut(entity).insert(PositionTween::new(
            from,
            self.pos,
            self.duration,
            self.interpolation,
            cb,
        ));
        blocking
    }
}
