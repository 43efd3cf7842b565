//! Lua runtime core implementation.
//!
//! This module contains the `LuaRuntime` struct which manages the Lua interpreter
//! and provides the `engine` table API to Lua scripts.

use super::commands::*;
use crate::actions::{
    ActionKind, AnimationAction, MoveToSceneAction, PlaySoundAction, PositionAction,
    SceneActorRef, SetCutmodeAction,
};
use crate::components::tween::TweenType;
use crate::resources::callbackqueue::ActionCallback;
use glam::Vec2;
use mlua::prelude::*;
use std::cell::RefCell;

use log::{error, info, warn};

/// Shared state accessible from Lua function closures.
/// This is stored in Lua's app_data and allows Lua functions to queue commands.
struct LuaAppData {
    commands: RefCell<Vec<ScriptCmd>>,
}

/// Resource holding the Lua interpreter state.
///
/// This is a `NonSend` resource because the Lua state is not thread-safe.
/// It should be initialized once at startup and reused throughout the game.
pub struct LuaRuntime {
    lua: Lua,
}

/// Registers a Lua function that pushes a command to a queue in `LuaAppData`.
macro_rules! register_cmd {
    ($engine:expr, $lua:expr, $name:expr, $queue:ident,
     |$args:pat_param| $arg_ty:ty, $cmd:expr) => {
        $engine.set(
            $name,
            $lua.create_function(|lua, $args: $arg_ty| {
                lua.app_data_ref::<LuaAppData>()
                    .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                    .$queue
                    .borrow_mut()
                    .push($cmd);
                Ok(())
            })?,
        )?;
    };
}

/// `scene.actor` or plain `actor`.
fn actor_ref(name: &str) -> SceneActorRef {
    match name.split_once('.') {
        Some((scene, actor)) => SceneActorRef::new(Some(scene), actor),
        None => SceneActorRef::new(None, name),
    }
}

fn repeat_type(name: Option<String>) -> LuaResult<TweenType> {
    match name {
        None => Ok(TweenType::SpriteDefined),
        Some(name) => TweenType::from_name(&name)
            .ok_or_else(|| LuaError::runtime(format!("unknown repeat type '{}'", name))),
    }
}

impl LuaRuntime {
    /// Creates a new Lua runtime and registers the base engine API.
    ///
    /// # Errors
    ///
    /// Returns an error if Lua initialization or API registration fails.
    pub fn new() -> LuaResult<Self> {
        let lua = Lua::new();

        // Set up the package path so `require` can find scripts in assets/scripts/
        lua.load(r#"package.path = "./assets/scripts/?.lua;./assets/scripts/?/init.lua;" .. package.path"#)
            .exec()?;

        lua.set_app_data(LuaAppData {
            commands: RefCell::new(Vec::new()),
        });

        let runtime = Self { lua };
        runtime.register_base_api()?;
        runtime.register_action_api()?;
        runtime.register_music_api()?;

        Ok(runtime)
    }

    /// Registers logging functions in the `engine` table.
    fn register_base_api(&self) -> LuaResult<()> {
        let engine = self.lua.create_table()?;

        // engine.log(message) - General purpose logging
        engine.set(
            "log",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        // engine.log_info(message) - Info level logging
        engine.set(
            "log_info",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        // engine.log_warn(message) - Warning level logging
        engine.set(
            "log_warn",
            self.lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        // engine.log_error(message) - Error level logging
        engine.set(
            "log_error",
            self.lua.create_function(|_, msg: String| {
                error!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        self.lua.globals().set("engine", engine)?;

        Ok(())
    }

    /// Registers the action functions in the `engine` table.
    ///
    /// Actors are named `actor` (current scene) or `scene.actor`.
    fn register_action_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        // engine.start_animation(actor, id, [repeat], [count], [cb])
        engine.set(
            "start_animation",
            self.lua.create_function(
                |lua,
                 (actor, id, repeat, count, cb): (
                    String,
                    String,
                    Option<String>,
                    Option<i32>,
                    Option<String>,
                )| {
                    let action = AnimationAction::new(actor_ref(&actor), id)
                        .with_repeat(repeat_type(repeat)?, count.unwrap_or(1))
                        .with_wait(cb.is_some());
                    lua.app_data_ref::<LuaAppData>()
                        .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                        .commands
                        .borrow_mut()
                        .push(ScriptCmd::Run {
                            action: ActionKind::Animation(action),
                            cb: cb.map(ActionCallback::new),
                        });
                    Ok(())
                },
            )?,
        )?;

        register_cmd!(engine, self.lua, "move_to_scene", commands,
            |(actor, scene)| (String, Option<String>),
            ScriptCmd::Run {
                action: ActionKind::MoveToScene(MoveToSceneAction::new(actor_ref(&actor), scene.as_deref())),
                cb: None,
            });
        register_cmd!(engine, self.lua, "set_cutmode", commands,
            |value| Option<bool>,
            ScriptCmd::Run {
                action: ActionKind::SetCutmode(SetCutmodeAction { value: value.unwrap_or(true) }),
                cb: None,
            });
        register_cmd!(engine, self.lua, "play_sound", commands,
            |(actor, sound)| (String, String),
            ScriptCmd::Run {
                action: ActionKind::PlaySound(PlaySoundAction::new(actor_ref(&actor), sound)),
                cb: None,
            });
        register_cmd!(engine, self.lua, "tween_position", commands,
            |(actor, x, y, duration, cb)| (String, f32, f32, f32, Option<String>),
            ScriptCmd::Run {
                action: ActionKind::Position(
                    PositionAction::new(actor_ref(&actor), Vec2::new(x, y), duration).with_wait(cb.is_some()),
                ),
                cb: cb.map(ActionCallback::new),
            });
        register_cmd!(engine, self.lua, "set_scene", commands,
            |id| String, ScriptCmd::SetScene { id });

        // engine.run_action(table, [cb]) - any action in its serialized form
        engine.set(
            "run_action",
            self.lua
                .create_function(|lua, (value, cb): (LuaValue, Option<String>)| {
                    let action: ActionKind = lua.from_value(value)?;
                    lua.app_data_ref::<LuaAppData>()
                        .ok_or_else(|| LuaError::runtime("LuaAppData not found"))?
                        .commands
                        .borrow_mut()
                        .push(ScriptCmd::Run {
                            action,
                            cb: cb.map(ActionCallback::new),
                        });
                    Ok(())
                })?,
        )?;

        Ok(())
    }

    /// Registers music functions in the `engine` table.
    fn register_music_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;
        register_cmd!(engine, self.lua, "play_music", commands,
            |(id, path)| (String, String), ScriptCmd::PlayMusic { id, path });
        register_cmd!(engine, self.lua, "stop_music", commands,
            |()| (), ScriptCmd::StopMusic);
        register_cmd!(engine, self.lua, "fade_music", commands,
            |(volume, duration, cb)| (f32, f32, Option<String>),
            ScriptCmd::FadeMusic { volume, duration, cb: cb.map(ActionCallback::new) });
        Ok(())
    }

    /// Drains all queued commands.
    ///
    /// Call this after a Lua callback returns. The commands are handed out
    /// in the order the script queued them.
    pub fn drain_commands(&self) -> Vec<ScriptCmd> {
        self.lua
            .app_data_ref::<LuaAppData>()
            .map(|data| data.commands.borrow_mut().drain(..).collect())
            .unwrap_or_default()
    }

    /// Loads and executes a Lua script file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the script has syntax/runtime errors.
    pub fn run_script(&self, path: &str) -> LuaResult<()> {
        let script = std::fs::read_to_string(path)
            .map_err(|e| LuaError::ExternalError(std::sync::Arc::new(e)))?;
        self.lua.load(&script).set_name(path).exec()
    }

    /// Calls a global Lua function by name with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the function doesn't exist or execution fails.
    pub fn call_function<A, R>(&self, name: &str, args: A) -> LuaResult<R>
    where
        A: IntoLuaMulti,
        R: FromLuaMulti,
    {
        let func: LuaFunction = self.lua.globals().get(name)?;
        func.call(args)
    }

    /// Checks if a global function exists.
    pub fn has_function(&self, name: &str) -> bool {
        self.lua.globals().get::<LuaFunction>(name).is_ok()
    }

    /// Returns a reference to the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(runtime: &LuaRuntime, code: &str) {
        runtime.lua().load(code).exec().unwrap();
    }

    #[test]
    fn test_commands_keep_script_order() {
        let runtime = LuaRuntime::new().unwrap();
        exec(
            &runtime,
            r#"
            engine.set_cutmode(true)
            engine.move_to_scene("street.hero", "hall")
            engine.set_scene("hall")
            "#,
        );

        let cmds = runtime.drain_commands();
        assert_eq!(cmds.len(), 3);
        assert_eq!(
            cmds[0],
            ScriptCmd::Run {
                action: ActionKind::SetCutmode(SetCutmodeAction { value: true }),
                cb: None
            }
        );
        assert_eq!(
            cmds[1],
            ScriptCmd::Run {
                action: ActionKind::MoveToScene(MoveToSceneAction::new(
                    SceneActorRef::new(Some("street"), "hero"),
                    Some("hall")
                )),
                cb: None
            }
        );
        assert_eq!(cmds[2], ScriptCmd::SetScene { id: "hall".into() });
        assert!(runtime.drain_commands().is_empty());
    }

    #[test]
    fn test_start_animation_waits_with_callback() {
        let runtime = LuaRuntime::new().unwrap();
        exec(&runtime, r#"engine.start_animation("hero", "wave", "REPEAT", 2, "waved")"#);

        match runtime.drain_commands().pop() {
            Some(ScriptCmd::Run {
                action: ActionKind::Animation(action),
                cb,
            }) => {
                assert_eq!(action.animation, "wave");
                assert_eq!(action.repeat, TweenType::Repeat);
                assert_eq!(action.count, 2);
                assert!(action.wait);
                assert_eq!(cb, Some(ActionCallback::new("waved")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_repeat_type_raises() {
        let runtime = LuaRuntime::new().unwrap();
        let result = runtime
            .lua()
            .load(r#"engine.start_animation("hero", "wave", "SIDEWAYS")"#)
            .exec();
        assert!(result.is_err());
        assert!(runtime.drain_commands().is_empty());
    }

    #[test]
    fn test_run_action_from_table() {
        let runtime = LuaRuntime::new().unwrap();
        exec(
            &runtime,
            r#"engine.run_action({ type = "PlaySound", actor = { actor = "hero" }, sound = "door" })"#,
        );
        assert_eq!(
            runtime.drain_commands(),
            vec![ScriptCmd::Run {
                action: ActionKind::PlaySound(PlaySoundAction::new(
                    SceneActorRef::new(None, "hero"),
                    "door"
                )),
                cb: None
            }]
        );
    }

    #[test]
    fn test_call_function() {
        let runtime = LuaRuntime::new().unwrap();
        exec(&runtime, "function double(x) return x * 2 end");
        assert!(runtime.has_function("double"));
        assert!(!runtime.has_function("triple"));
        let result: i32 = runtime.call_function("double", 21).unwrap();
        assert_eq!(result, 42);
    }
}
