//! Deferred action callbacks.
//!
//! Tweens and renderers never invoke a completion callback from inside their
//! `update`. They push the callback handle into the [`CallbackQueue`]
//! resource, which the scripting layer drains once per frame after every
//! animation update has run.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Stable handle of a callback owned by the scripting/action layer.
///
/// The handle is what gets persisted in save games, so it must be resolvable
/// again after a restore.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCallback(String);

impl ActionCallback {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn handle(&self) -> &str {
        &self.0
    }
}

/// FIFO of callbacks whose animation or tween has completed.
#[derive(Resource, Debug, Default)]
pub struct CallbackQueue {
    pending: VecDeque<ActionCallback>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback for the next drain.
    pub fn add(&mut self, cb: ActionCallback) {
        self.pending.push_back(cb);
    }

    /// Take every pending callback in completion order.
    pub fn drain(&mut self) -> Vec<ActionCallback> {
        self.pending.drain(..).collect()
    }

    /// Move every callback of `other` to the back of this queue.
    pub fn append(&mut self, other: &mut CallbackQueue) {
        self.pending.append(&mut other.pending);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionCallback> {
        self.pending.iter()
    }
}
