//! Verb requests for the scripting layer.
//!
//! Verbs are scripted behaviours attached to actors ("open", "look at", ...).
//! The engine core never runs them itself: skeletal events write a
//! [`VerbRequest`] and the script system resolves it on its turn, after every
//! animation update of the frame.
//!
//! # Related
//!
//! - [`crate::events::skeleton::skeleton_event_observer`] – writes the requests
//! - [`crate::systems::script::run_scripts`] – consumes them

use bevy_ecs::message::Message;

#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct VerbRequest {
    pub actor: String,
    pub verb: String,
}
