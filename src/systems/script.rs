//! Script dispatch system.
//!
//! [`run_scripts`] runs once per frame after every animation and tween
//! update. It hands the completed callbacks and the verb requests of the
//! frame to the Lua runtime (`on_callback(handle)` and
//! `on_verb(actor, verb)`), then applies whatever the script queued.
//! Without a runtime they are logged and dropped.

use bevy_ecs::prelude::*;
use log::debug;
#[cfg(feature = "lua")]
use log::error;

#[cfg(feature = "lua")]
use crate::actions::Action;
use crate::events::verb::VerbRequest;
use crate::resources::callbackqueue::CallbackQueue;
#[cfg(feature = "lua")]
use crate::resources::lua_runtime::{LuaRuntime, ScriptCmd};

/// Callbacks applied per frame before the rest are left for the next one.
///
/// Bounds a script that keeps completing zero-length actions.
#[cfg(feature = "lua")]
const MAX_CALLBACK_ROUNDS: usize = 16;

pub fn run_scripts(world: &mut World) {
    #[cfg(feature = "lua")]
    {
        if world.get_non_send_resource::<LuaRuntime>().is_some() {
            dispatch_to_lua(world);
            return;
        }
    }

    for cb in world.resource_mut::<CallbackQueue>().drain() {
        debug!("Callback '{}' completed with no script to receive it", cb.handle());
    }
    if let Some(mut verbs) = world.get_resource_mut::<Messages<VerbRequest>>() {
        for verb in verbs.drain() {
            debug!("Verb '{}' on '{}' has no script to run it", verb.verb, verb.actor);
        }
    }
}

#[cfg(feature = "lua")]
fn dispatch_to_lua(world: &mut World) {
    let mut verbs: Vec<VerbRequest> = world
        .get_resource_mut::<Messages<VerbRequest>>()
        .map(|mut m| m.drain().collect())
        .unwrap_or_default();

    // Commands queued while loading scripts are picked up by the first round.
    // Actions run here may complete at once and queue more callbacks.
    for _ in 0..MAX_CALLBACK_ROUNDS {
        let callbacks = world.resource_mut::<CallbackQueue>().drain();

        let cmds = {
            let Some(runtime) = world.get_non_send_resource::<LuaRuntime>() else {
                return;
            };
            for cb in &callbacks {
                if runtime.has_function("on_callback")
                    && let Err(e) = runtime.call_function::<_, ()>("on_callback", cb.handle())
                {
                    error!("on_callback('{}'): {}", cb.handle(), e);
                }
            }
            for verb in verbs.drain(..) {
                if !runtime.has_function("on_verb") {
                    debug!("Verb '{}' on '{}': no on_verb function", verb.verb, verb.actor);
                    continue;
                }
                if let Err(e) =
                    runtime.call_function::<_, ()>("on_verb", (verb.actor.as_str(), verb.verb.as_str()))
                {
                    error!("on_verb('{}', '{}'): {}", verb.actor, verb.verb, e);
                }
            }
            runtime.drain_commands()
        };
        if cmds.is_empty() {
            return;
        }

        apply_script_cmds(world, cmds);
    }
    debug!("Callback rounds exhausted, the rest run next frame");
}

/// Apply commands queued by a script, in order.
#[cfg(feature = "lua")]
pub fn apply_script_cmds(world: &mut World, cmds: Vec<ScriptCmd>) {
    use crate::components::tween::Interpolation;
    use crate::events::audio::AudioCmd;
    use crate::resources::music::MusicManager;
    use crate::systems::actorassets::set_current_scene;

    for cmd in cmds {
        match cmd {
            ScriptCmd::Run { action, cb } => {
                let handle = cb.as_ref().map(|c| c.handle().to_string());
                if action.run(world, cb) {
                    debug!("Waiting for callback {:?}", handle);
                }
            }
            ScriptCmd::SetScene { id } => {
                if let Err(e) = set_current_scene(world, &id) {
                    error!("set_scene('{}'): {}", id, e);
                }
            }
            ScriptCmd::PlayMusic { .. } | ScriptCmd::StopMusic | ScriptCmd::FadeMusic { .. } => {
                let Some(mut music) = world.get_resource_mut::<MusicManager>() else {
                    error!("No music manager for {:?}", cmd);
                    continue;
                };
                let audio = match cmd {
                    ScriptCmd::PlayMusic { id, path } => music.play(id, path),
                    ScriptCmd::StopMusic => music.stop(),
                    ScriptCmd::FadeMusic {
                        volume,
                        duration,
                        cb,
                    } => {
                        music.fade_to(volume, duration, Interpolation::Linear, cb);
                        Vec::new()
                    }
                    _ => Vec::new(),
                };
                write_audio(world, audio);
            }
        }
    }

    fn write_audio(world: &mut World, cmds: Vec<AudioCmd>) {
        if let Some(mut messages) = world.get_resource_mut::<Messages<AudioCmd>>() {
            for cmd in cmds {
                messages.write(cmd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::callbackqueue::ActionCallback;

    #[test]
    fn test_without_runtime_drains_everything() {
        let mut world = World::new();
        world.init_resource::<CallbackQueue>();
        world.init_resource::<Messages<VerbRequest>>();
        world.resource_mut::<CallbackQueue>().add(ActionCallback::new("done"));
        world.resource_mut::<Messages<VerbRequest>>().write(VerbRequest {
            actor: "door".into(),
            verb: "open".into(),
        });

        run_scripts(&mut world);
        assert!(world.resource::<CallbackQueue>().is_empty());
        assert!(world.resource::<Messages<VerbRequest>>().is_empty());
    }

    #[cfg(feature = "lua")]
    mod lua {
        use super::*;
        use crate::resources::scene::{Scene, SceneRegistry};

        fn world(script: &str) -> World {
            let mut world = World::new();
            world.init_resource::<CallbackQueue>();
            world.init_resource::<Messages<VerbRequest>>();
            world.init_resource::<SceneRegistry>();
            world.resource_mut::<SceneRegistry>().add_scene(Scene::new("street"));

            let runtime = LuaRuntime::new().unwrap();
            runtime.lua().load(script).exec().unwrap();
            world.insert_non_send_resource(runtime);
            world
        }

        #[test]
        fn test_verb_and_callback_reach_script() {
            let mut world = world(
                r#"
                seen = {}
                function on_verb(actor, verb)
                    table.insert(seen, actor .. ":" .. verb)
                    engine.set_cutmode(true)
                end
                function on_callback(handle)
                    table.insert(seen, handle)
                end
                "#,
            );
            world.resource_mut::<CallbackQueue>().add(ActionCallback::new("intro_done"));
            world.resource_mut::<Messages<VerbRequest>>().write(VerbRequest {
                actor: "door".into(),
                verb: "open".into(),
            });

            run_scripts(&mut world);

            assert!(world.resource::<SceneRegistry>().cut_mode());
            let runtime = world.non_send_resource::<LuaRuntime>();
            let seen: Vec<String> = runtime.lua().load("return seen").eval().unwrap();
            assert_eq!(seen, vec!["intro_done".to_string(), "door:open".to_string()]);
        }

        #[test]
        fn test_script_errors_do_not_stop_the_frame() {
            let mut world = world(
                r#"
                function on_callback(handle)
                    if handle == "bad" then error("boom") end
                    engine.set_cutmode(true)
                end
                "#,
            );
            world.resource_mut::<CallbackQueue>().add(ActionCallback::new("bad"));
            world.resource_mut::<CallbackQueue>().add(ActionCallback::new("good"));

            run_scripts(&mut world);
            assert!(world.resource::<SceneRegistry>().cut_mode());
            assert!(world.resource::<CallbackQueue>().is_empty());
        }
    }
}
