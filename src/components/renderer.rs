//! Actor renderer component.
//!
//! [`ActorRenderer`] is the closed set of ways an actor can be animated:
//! - [`ActorRenderer::Atlas`] – frame animations from texture atlas regions
//! - [`ActorRenderer::Skeletal`] – bone animations from skeleton sources
//!
//! Both variants share the same contract: start animations by id (with
//! directional fallback), advance with `update`, load/retrieve/dispose their
//! sources, report a [`Visual`] and a bounding polygon, and serialize in
//! [`SerializationMode::Model`] or [`SerializationMode::State`].
//!
//! Operations that touch assets or callbacks take an [`AnimationContext`]
//! instead of reaching for world resources.

use bevy_ecs::prelude::Component;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::animation::{AnimationDesc, AnimationTable};
use crate::components::atlasrenderer::AtlasRenderer;
use crate::components::skeletalrenderer::SkeletalRenderer;
use crate::components::tween::TweenType;
use crate::error::Result;
use crate::events::skeleton::SkeletonEvent;
use crate::resources::assets::AssetLoader;
use crate::resources::callbackqueue::{ActionCallback, CallbackQueue};
use crate::skeleton::RegionQuad;

/// Collaborators threaded through renderer operations.
pub struct AnimationContext<'a> {
    pub loader: &'a mut dyn AssetLoader,
    /// Completion callbacks, drained after every update of the frame.
    pub callbacks: &'a mut CallbackQueue,
    /// Skeletal events crossed during the call.
    pub events: &'a mut Vec<SkeletonEvent>,
}

impl<'a> AnimationContext<'a> {
    pub fn new(
        loader: &'a mut dyn AssetLoader,
        callbacks: &'a mut CallbackQueue,
        events: &'a mut Vec<SkeletonEvent>,
    ) -> Self {
        AnimationContext {
            loader,
            callbacks,
            events,
        }
    }
}

/// Which half of a renderer to (de)serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationMode {
    /// Authored data: the animation table and the initial animation.
    Model,
    /// Live playback data for save games.
    State,
}

/// Authored renderer data shared by both variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererModel {
    #[serde(default)]
    pub fanims: AnimationTable,
    #[serde(default)]
    pub init_animation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Atlas,
    Skeletal,
}

/// What to present for an actor this frame, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    /// Posed region quads of a skeleton, in slot order.
    Skeleton { quads: Vec<RegionQuad> },
    /// One atlas region.
    Frame {
        atlas: String,
        region: String,
        index: i32,
        flip_x: bool,
        min: Vec2,
        max: Vec2,
    },
    /// Red rectangle drawn when no asset is available.
    Placeholder { min: Vec2, max: Vec2 },
}

impl Visual {
    /// Bottom-centred placeholder rectangle for an actor at `pos`.
    pub fn placeholder(pos: Vec2, width: f32, height: f32, scale: f32) -> Visual {
        let min = Vec2::new(pos.x - width / 2.0 * scale, pos.y);
        Visual::Placeholder {
            min,
            max: min + Vec2::new(width * scale, height * scale),
        }
    }
}

/// Even-odd point in polygon test.
pub fn polygon_contains(polygon: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Component, Debug)]
pub enum ActorRenderer {
    Atlas(AtlasRenderer),
    Skeletal(SkeletalRenderer),
}

impl ActorRenderer {
    pub fn new(kind: RendererKind) -> Self {
        Self::from_model(kind, RendererModel::default())
    }

    pub fn from_model(kind: RendererKind, model: RendererModel) -> Self {
        match kind {
            RendererKind::Atlas => ActorRenderer::Atlas(AtlasRenderer::from_model(model)),
            RendererKind::Skeletal => ActorRenderer::Skeletal(SkeletalRenderer::from_model(model)),
        }
    }

    pub fn kind(&self) -> RendererKind {
        match self {
            ActorRenderer::Atlas(_) => RendererKind::Atlas,
            ActorRenderer::Skeletal(_) => RendererKind::Skeletal,
        }
    }

    pub fn as_skeletal(&self) -> Option<&SkeletalRenderer> {
        match self {
            ActorRenderer::Skeletal(r) => Some(r),
            ActorRenderer::Atlas(_) => None,
        }
    }

    pub fn as_atlas(&self) -> Option<&AtlasRenderer> {
        match self {
            ActorRenderer::Atlas(r) => Some(r),
            ActorRenderer::Skeletal(_) => None,
        }
    }

    pub fn add_animation(&mut self, desc: AnimationDesc) {
        match self {
            ActorRenderer::Atlas(r) => r.add_animation(desc),
            ActorRenderer::Skeletal(r) => r.add_animation(desc),
        }
    }

    pub fn animations(&self) -> &AnimationTable {
        match self {
            ActorRenderer::Atlas(r) => r.animations(),
            ActorRenderer::Skeletal(r) => r.animations(),
        }
    }

    pub fn init_animation(&self) -> Option<&str> {
        match self {
            ActorRenderer::Atlas(r) => r.init_animation(),
            ActorRenderer::Skeletal(r) => r.init_animation(),
        }
    }

    pub fn current_animation_id(&self) -> Option<String> {
        match self {
            ActorRenderer::Atlas(r) => r.current_animation_id(),
            ActorRenderer::Skeletal(r) => r.current_animation_id(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            ActorRenderer::Atlas(r) => r.is_complete(),
            ActorRenderer::Skeletal(r) => r.is_complete(),
        }
    }

    pub fn width(&self) -> f32 {
        match self {
            ActorRenderer::Atlas(r) => r.width(),
            ActorRenderer::Skeletal(r) => r.width(),
        }
    }

    pub fn height(&self) -> f32 {
        match self {
            ActorRenderer::Atlas(r) => r.height(),
            ActorRenderer::Skeletal(r) => r.height(),
        }
    }

    pub fn bbox(&self) -> &[Vec2; 4] {
        match self {
            ActorRenderer::Atlas(r) => r.bbox(),
            ActorRenderer::Skeletal(r) => r.bbox(),
        }
    }

    /// Hit test of a point relative to the actor position.
    pub fn contains(&self, local: Vec2) -> bool {
        polygon_contains(self.bbox(), local)
    }

    pub fn start_animation(
        &mut self,
        ctx: &mut AnimationContext<'_>,
        id: &str,
        repeat_type: TweenType,
        count: i32,
        cb: Option<ActionCallback>,
    ) -> Result<()> {
        match self {
            ActorRenderer::Atlas(r) => r.start_animation(ctx, id, repeat_type, count, cb),
            ActorRenderer::Skeletal(r) => r.start_animation(ctx, id, repeat_type, count, cb),
        }
    }

    pub fn start_animation_dir(
        &mut self,
        ctx: &mut AnimationContext<'_>,
        id: &str,
        repeat_type: TweenType,
        count: i32,
        cb: Option<ActionCallback>,
        direction: Option<&str>,
    ) -> Result<()> {
        match self {
            ActorRenderer::Atlas(r) => {
                r.start_animation_dir(ctx, id, repeat_type, count, cb, direction)
            }
            ActorRenderer::Skeletal(r) => {
                r.start_animation_dir(ctx, id, repeat_type, count, cb, direction)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn start_animation_towards(
        &mut self,
        ctx: &mut AnimationContext<'_>,
        id: &str,
        repeat_type: TweenType,
        count: i32,
        cb: Option<ActionCallback>,
        p0: Vec2,
        pf: Vec2,
    ) -> Result<()> {
        match self {
            ActorRenderer::Atlas(r) => {
                r.start_animation_towards(ctx, id, repeat_type, count, cb, p0, pf)
            }
            ActorRenderer::Skeletal(r) => {
                r.start_animation_towards(ctx, id, repeat_type, count, cb, p0, pf)
            }
        }
    }

    pub fn update(&mut self, ctx: &mut AnimationContext<'_>, delta: f32) {
        match self {
            ActorRenderer::Atlas(r) => r.update(ctx, delta),
            ActorRenderer::Skeletal(r) => r.update(ctx, delta),
        }
    }

    pub fn load_assets(&mut self, loader: &mut dyn AssetLoader) {
        match self {
            ActorRenderer::Atlas(r) => r.load_assets(loader),
            ActorRenderer::Skeletal(r) => r.load_assets(loader),
        }
    }

    pub fn retrieve_assets(&mut self, ctx: &mut AnimationContext<'_>) -> Result<()> {
        match self {
            ActorRenderer::Atlas(r) => r.retrieve_assets(ctx),
            ActorRenderer::Skeletal(r) => r.retrieve_assets(ctx),
        }
    }

    pub fn dispose(&mut self, loader: &mut dyn AssetLoader) {
        match self {
            ActorRenderer::Atlas(r) => r.dispose(loader),
            ActorRenderer::Skeletal(r) => r.dispose(loader),
        }
    }

    pub fn visual(&mut self, pos: Vec2, scale: f32) -> Visual {
        match self {
            ActorRenderer::Atlas(r) => r.visual(pos, scale),
            ActorRenderer::Skeletal(r) => r.visual(pos, scale),
        }
    }

    pub fn write(&self, mode: SerializationMode) -> Result<Value> {
        match self {
            ActorRenderer::Atlas(r) => r.write(mode),
            ActorRenderer::Skeletal(r) => r.write(mode),
        }
    }

    pub fn read(&mut self, mode: SerializationMode, value: &Value) -> Result<()> {
        match self {
            ActorRenderer::Atlas(r) => r.read(mode, value),
            ActorRenderer::Skeletal(r) => r.read(mode, value),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::resources::assets::MemoryAssetLoader;

    /// Owns what an [`AnimationContext`] borrows.
    pub(crate) struct Harness {
        pub loader: MemoryAssetLoader,
        pub callbacks: CallbackQueue,
        pub events: Vec<SkeletonEvent>,
    }

    impl Harness {
        pub fn new() -> Self {
            Harness {
                loader: MemoryAssetLoader::new(),
                callbacks: CallbackQueue::new(),
                events: Vec::new(),
            }
        }

        pub fn ctx(&mut self) -> AnimationContext<'_> {
            AnimationContext::new(&mut self.loader, &mut self.callbacks, &mut self.events)
        }
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Vec2::new(-10.0, 0.0),
            Vec2::new(-10.0, 20.0),
            Vec2::new(10.0, 20.0),
            Vec2::new(10.0, 0.0),
        ];
        assert!(polygon_contains(&square, Vec2::new(0.0, 10.0)));
        assert!(polygon_contains(&square, Vec2::new(-9.0, 1.0)));
        assert!(!polygon_contains(&square, Vec2::new(11.0, 10.0)));
        assert!(!polygon_contains(&square, Vec2::new(0.0, -1.0)));
        assert!(!polygon_contains(&[], Vec2::ZERO));
    }

    #[test]
    fn test_placeholder_is_bottom_centred() {
        assert_eq!(
            Visual::placeholder(Vec2::new(50.0, 10.0), 20.0, 40.0, 2.0),
            Visual::Placeholder {
                min: Vec2::new(30.0, 10.0),
                max: Vec2::new(70.0, 90.0)
            }
        );
    }

    #[test]
    fn test_model_field_names() {
        let mut renderer = ActorRenderer::new(RendererKind::Skeletal);
        renderer.add_animation(AnimationDesc::new("idle", "hero"));
        let json = renderer.write(SerializationMode::Model).unwrap();
        assert_eq!(json["initAnimation"], "idle");
        assert_eq!(json["fanims"]["idle"]["source"], "hero");

        let mut copy = ActorRenderer::new(RendererKind::Skeletal);
        copy.read(SerializationMode::Model, &json).unwrap();
        assert_eq!(copy.animations(), renderer.animations());
        assert_eq!(copy.init_animation(), Some("idle"));
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(ActorRenderer::new(RendererKind::Atlas).kind(), RendererKind::Atlas);
        assert_eq!(
            serde_json::to_value(RendererKind::Skeletal).unwrap(),
            serde_json::json!("skeletal")
        );
    }
}
