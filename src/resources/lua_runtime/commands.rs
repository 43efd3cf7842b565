//! Command types for Lua-Rust communication.
//!
//! These represent commands that Lua scripts can queue for execution
//! by Rust systems. Commands are processed after Lua callbacks return,
//! in the order they were queued.

use crate::actions::ActionKind;
use crate::resources::callbackqueue::ActionCallback;

/// Commands that Lua can queue.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCmd {
    /// Run an action; `cb` is handed back to `on_callback` when it completes
    Run {
        action: ActionKind,
        cb: Option<ActionCallback>,
    },
    /// Make a scene current
    SetScene { id: String },
    /// Start a looping music track
    PlayMusic { id: String, path: String },
    /// Stop the current music track
    StopMusic,
    /// Fade the music volume
    FadeMusic {
        volume: f32,
        duration: f32,
        cb: Option<ActionCallback>,
    },
}
