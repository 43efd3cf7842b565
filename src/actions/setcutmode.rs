use bevy_ecs::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::scene::SceneRegistry;

fn default_value() -> bool {
    true
}

/// Turn cut-scene mode on or off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCutmodeAction {
    #[serde(default = "default_value")]
    pub value: bool,
}

impl Default for SetCutmodeAction {
    fn default() -> Self {
        SetCutmodeAction { value: true }
    }
}

impl Action for SetCutmodeAction {
    fn run(&self, world: &mut World, _cb: Option<ActionCallback>) -> bool {
        debug!("Cut mode: {}", self.value);
        world.resource_mut::<SceneRegistry>().set_cut_mode(self.value);
        false
    }
}
