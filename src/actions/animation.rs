use bevy_ecs::prelude::*;
use log::error;
use serde::{Deserialize, Serialize};

use crate::actions::{Action, SceneActorRef};
use crate::components::renderer::ActorRenderer;
use crate::components::tween::TweenType;
use crate::error::{EngineError, Result};
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::scene::SceneRegistry;
use crate::systems::actorassets::with_animation_context;

fn default_repeat() -> TweenType {
    TweenType::SpriteDefined
}

fn default_count() -> i32 {
    1
}

/// Start an animation on an actor.
///
/// With `wait` set the action blocks until the animation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationAction {
    pub actor: SceneActorRef,
    pub animation: String,
    #[serde(default = "default_repeat")]
    pub repeat: TweenType,
    #[serde(default = "default_count")]
    pub count: i32,
    #[serde(default)]
    pub wait: bool,
}

impl AnimationAction {
    pub fn new(actor: SceneActorRef, animation: impl Into<String>) -> Self {
        AnimationAction {
            actor,
            animation: animation.into(),
            repeat: TweenType::SpriteDefined,
            count: 1,
            wait: false,
        }
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_repeat(mut self, repeat: TweenType, count: i32) -> Self {
        self.repeat = repeat;
        self.count = count;
        self
    }

    fn start(&self, world: &mut World, cb: Option<ActionCallback>) -> Result<()> {
        let registry = world.resource::<SceneRegistry>();
        let entity = self.actor.entity(registry).ok_or_else(|| EngineError::ActorNotFound {
            actor: self.actor.actor.clone().unwrap_or_default(),
            scene: self.actor.scene_id(registry).unwrap_or_default().to_string(),
        })?;

        with_animation_context(world, |world, ctx| {
            let Some(mut renderer) = world.get_mut::<ActorRenderer>(entity) else {
                return Err(EngineError::AnimationNotFound(self.animation.clone()));
            };
            renderer.start_animation(ctx, &self.animation, self.repeat, self.count, cb)
        })
    }
}

impl Action for AnimationAction {
    fn run(&self, world: &mut World, cb: Option<ActionCallback>) -> bool {
        let cb = if self.wait { cb } else { None };
        let blocking = cb.is_some();
        match self.start(world, cb) {
            Ok(()) => blocking,
            Err(e) => {
                error!("AnimationAction '{}': {}", self.animation, e);
                false
            }
        }
    }
}
