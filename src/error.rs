//! Engine error types.
//!
//! Every fallible operation of the animation core, the asset layer and the
//! scene transfer protocol reports an [`EngineError`]. None of them is fatal:
//! the action and system layers log the error and keep the frame loop
//! running.

use thiserror::Error;

/// Errors produced by the engine core.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No descriptor resolves for the requested animation id, even after
    /// directional fallback.
    #[error("animation not found: {0}")]
    AnimationNotFound(String),

    /// A resource could not be materialized after loading.
    #[error("asset '{key}' unavailable: {reason}")]
    AssetUnavailable { key: String, reason: String },

    /// A skeleton data file was read but is not consistent.
    #[error("invalid skeleton '{key}': {reason}")]
    InvalidSkeleton { key: String, reason: String },

    /// The skeleton of a source has no clip with this name.
    #[error("clip not found in skeleton: {0}")]
    ClipNotFound(String),

    /// `dispose_source` called on an entry whose reference count is already 0.
    #[error("source '{0}' released more times than it was loaded")]
    SourceOverRelease(String),

    /// `dispose_source` called for a source that was never registered.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// A scene action was run without an actor id.
    #[error("no actor specified")]
    NoActorSpecified,

    /// The actor id does not exist in the scene.
    #[error("actor '{actor}' not found in scene '{scene}'")]
    ActorNotFound { actor: String, scene: String },

    #[error("scene not found: {0}")]
    SceneNotFound(String),

    #[error("no current scene")]
    NoCurrentScene,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
