//! Lua scripting runtime.
//!
//! Scripts drive the adventure: they receive completed action callbacks and
//! verb requests, and answer by queueing actions through the global `engine`
//! table. Queued commands are applied by
//! [`run_scripts`](crate::systems::script::run_scripts) once the Lua call
//! returns.
//!
//! - [`commands`] - Command types queued by Lua
//! - [`runtime`] - Core Lua runtime implementation and `engine` table API
//!
//! # Example
//!
//! ```lua
//! function on_verb(actor, verb)
//!     if actor == "door" and verb == "open" then
//!         engine.set_cutmode(true)
//!         engine.start_animation("door", "opening", "NO_REPEAT", 1, "door_opened")
//!     end
//! end
//!
//! function on_callback(handle)
//!     if handle == "door_opened" then
//!         engine.move_to_scene("hero", "hall")
//!         engine.set_scene("hall")
//!         engine.set_cutmode(false)
//!     end
//! end
//! ```

mod commands;
mod runtime;

pub use commands::*;
pub use runtime::LuaRuntime;
