//! Frame-based renderer over texture atlases.
//!
//! The frames of an animation are the atlas regions named after its id,
//! ordered by region index. Multi-frame animations run a [`FrameTween`];
//! a single-frame animation has nothing to play and queues its callback at
//! once. For atlas animations `AnimationDesc::duration` is the length of one
//! run in seconds.

use std::sync::Arc;

use glam::Vec2;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::animation::{
    AnimationDesc, AnimationTable, direction_string, dirs, flip_id, resolve,
};
use crate::components::renderer::{
    AnimationContext, RendererModel, SerializationMode, Visual, polygon_contains,
};
use crate::components::tween::{FrameTarget, FrameTween, TweenType};
use crate::error::{EngineError, Result};
use crate::resources::assets::{AssetLoader, AtlasRegion, TextureAtlas};
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::sourcecache::{CachedRuntime, SourceCache};

impl CachedRuntime for Arc<TextureAtlas> {
    fn materialize(loader: &dyn AssetLoader, _source: &str, atlas: &str) -> Result<Self> {
        loader.texture_atlas(atlas)
    }
}

#[derive(Debug, Default)]
struct FrameCursor {
    frames: usize,
    current: usize,
}

impl FrameTarget for FrameCursor {
    fn num_frames(&self) -> usize {
        self.frames
    }

    fn set_frame(&mut self, index: usize) {
        self.current = index;
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtlasState {
    current_animation: Option<String>,
    flip_x: bool,
    current_frame: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tween: Option<FrameTween>,
}

#[derive(Debug)]
pub struct AtlasRenderer {
    fanims: AnimationTable,
    init_animation: Option<String>,
    current_animation: Option<AnimationDesc>,
    flip_x: bool,
    frames: Vec<AtlasRegion>,
    cursor: FrameCursor,
    tween: Option<FrameTween>,
    source_cache: SourceCache<Arc<TextureAtlas>>,
    width: f32,
    height: f32,
    bbox: [Vec2; 4],
}

impl Default for AtlasRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasRenderer {
    pub fn new() -> Self {
        let mut renderer = AtlasRenderer {
            fanims: AnimationTable::default(),
            init_animation: None,
            current_animation: None,
            flip_x: false,
            frames: Vec::new(),
            cursor: FrameCursor::default(),
            tween: None,
            source_cache: SourceCache::new(),
            width: 200.0,
            height: 200.0,
            bbox: [Vec2::ZERO; 4],
        };
        renderer.compute_bbox();
        renderer
    }

    pub fn from_model(model: RendererModel) -> Self {
        let mut renderer = Self::new();
        renderer.fanims = model.fanims;
        renderer.init_animation = model.init_animation;
        renderer
    }

    pub fn animations(&self) -> &AnimationTable {
        &self.fanims
    }

    pub fn add_animation(&mut self, desc: AnimationDesc) {
        if self.init_animation.is_none() {
            self.init_animation = Some(desc.id.clone());
        }
        self.fanims.insert(desc.id.clone(), desc);
    }

    pub fn init_animation(&self) -> Option<&str> {
        self.init_animation.as_deref()
    }

    pub fn current_animation(&self) -> Option<&AnimationDesc> {
        self.current_animation.as_ref()
    }

    pub fn current_animation_id(&self) -> Option<String> {
        let desc = self.current_animation.as_ref()?;
        if self.flip_x {
            Some(flip_id(&desc.id).unwrap_or_else(|| desc.id.clone()))
        } else {
            Some(desc.id.clone())
        }
    }

    pub fn current_frame(&self) -> usize {
        self.cursor.current
    }

    pub fn num_frames(&self) -> usize {
        self.cursor.frames
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn is_complete(&self) -> bool {
        self.tween.as_ref().is_none_or(|t| t.is_complete())
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn bbox(&self) -> &[Vec2; 4] {
        &self.bbox
    }

    pub fn contains(&self, local: Vec2) -> bool {
        polygon_contains(&self.bbox, local)
    }

    pub fn source_cache(&self) -> &SourceCache<Arc<TextureAtlas>> {
        &self.source_cache
    }

    fn compute_bbox(&mut self) {
        let hw = self.width / 2.0;
        self.bbox = [
            Vec2::new(-hw, 0.0),
            Vec2::new(-hw, self.height),
            Vec2::new(hw, self.height),
            Vec2::new(hw, 0.0),
        ];
    }

    /// Look up the frames of `desc`, materializing its atlas when needed.
    fn load_frames(&mut self, loader: &mut dyn AssetLoader, desc: &AnimationDesc) -> Result<()> {
        let atlas = self
            .source_cache
            .retrieve_source(loader, &desc.source, desc.atlas.as_deref())?;

        let frames: Vec<AtlasRegion> = atlas.frames(&desc.id).into_iter().cloned().collect();
        let Some(first) = frames.first() else {
            return Err(EngineError::AssetUnavailable {
                key: desc.source.clone(),
                reason: format!("no region named '{}'", desc.id),
            });
        };

        self.width = first.width as f32;
        self.height = first.height as f32;
        self.cursor.frames = frames.len();
        self.frames = frames;
        self.compute_bbox();
        Ok(())
    }

    fn clear_current(&mut self) {
        self.current_animation = None;
        self.frames.clear();
        self.cursor = FrameCursor::default();
        self.tween = None;
        self.compute_bbox();
    }

    pub fn start_animation(
        &mut self,
        ctx: &mut AnimationContext<'_>,
        id: &str,
        repeat_type: TweenType,
        count: i32,
        cb: Option<ActionCallback>,
    ) -> Result<()> {
        let Some((desc, flip)) = resolve(&self.fanims, id).map(|(d, f)| (d.clone(), f)) else {
            error!("AnimationDesc not found: {}", id);
            return Err(EngineError::AnimationNotFound(id.to_string()));
        };

        if let Some(previous) = &self.current_animation
            && previous.dispose_when_played
        {
            let source = previous.source.clone();
            if let Err(e) = self.source_cache.dispose_source(ctx.loader, &source) {
                error!("Releasing '{}' after playing: {}", source, e);
            }
        }

        self.flip_x = flip;

        if let Err(e) = self.load_frames(ctx.loader, &desc) {
            error!("Could not load AnimationDesc {}: {}", id, e);
            self.clear_current();
            return Err(e);
        }

        let (repeat_type, count) = if repeat_type == TweenType::SpriteDefined {
            (desc.animation_type, desc.count)
        } else {
            (repeat_type, count)
        };

        if self.cursor.frames == 1 {
            self.cursor.current = 0;
            self.tween = None;
            if let Some(cb) = cb {
                ctx.callbacks.add(cb);
            }
        } else {
            self.cursor.current = if repeat_type.is_reverse() {
                self.cursor.frames - 1
            } else {
                0
            };
            let mut tween = FrameTween::new();
            tween.start(&mut self.cursor, repeat_type, count, desc.duration, cb);
            self.tween = Some(tween);
        }

        self.current_animation = Some(desc);
        Ok(())
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
        let mut anim = id.to_string();
        match direction {
            Some(dir) => {
                anim.push('.');
                anim.push_str(dir);
            }
            None => {
                if let Some(current) = self.current_animation_id()
                    && let Some(idx) = current.find('.')
                {
                    anim.push_str(&current[idx..]);
                }
            }
        }

        if resolve(&self.fanims, &anim).is_none() {
            anim = id.to_string();
        }
        self.start_animation(ctx, &anim, repeat_type, count, cb)
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
        let direction = direction_string(p0, pf, dirs(id, &self.fanims));
        self.start_animation_dir(ctx, id, repeat_type, count, cb, direction)
    }

    pub fn update(&mut self, ctx: &mut AnimationContext<'_>, delta: f32) {
        if let Some(tween) = &mut self.tween {
            tween.update(&mut self.cursor, delta, ctx.callbacks);
        }
    }

    pub fn load_assets(&mut self, loader: &mut dyn AssetLoader) {
        for desc in self.fanims.values().filter(|d| d.preload) {
            self.source_cache
                .load_source(loader, &desc.source, desc.atlas.as_deref());
        }

        let on_demand = match (&self.current_animation, &self.init_animation) {
            (Some(current), _) => Some(current).filter(|d| !d.preload),
            (None, Some(init)) => self.fanims.get(init).filter(|d| !d.preload),
            (None, None) => None,
        };
        if let Some(desc) = on_demand {
            self.source_cache
                .load_source(loader, &desc.source, desc.atlas.as_deref());
        }
    }

    /// Materialize the loaded atlases and restore the current frame list.
    pub fn retrieve_assets(&mut self, ctx: &mut AnimationContext<'_>) -> Result<()> {
        if let Err(e) = self.source_cache.retrieve_all(ctx.loader) {
            error!("Could not retrieve atlas sources: {}", e);
        }

        if let Some(desc) = self.current_animation.clone() {
            let current = self.cursor.current;
            if let Err(e) = self.load_frames(ctx.loader, &desc) {
                error!("Could not retrieve AnimationDesc {}: {}", desc.id, e);
                self.clear_current();
                return Err(e);
            }
            self.cursor.current = current.min(self.cursor.frames.saturating_sub(1));
        } else if let Some(init) = self.init_animation.clone() {
            self.start_animation(ctx, &init, TweenType::SpriteDefined, 1, None)?;
        }
        Ok(())
    }

    pub fn dispose(&mut self, loader: &mut dyn AssetLoader) {
        self.source_cache.dispose_all(loader);
        self.frames.clear();
    }

    pub fn visual(&mut self, pos: Vec2, scale: f32) -> Visual {
        let (Some(desc), Some(frame)) = (
            &self.current_animation,
            self.frames.get(self.cursor.current),
        ) else {
            return Visual::placeholder(pos, self.width, self.height, scale);
        };

        let min = Vec2::new(pos.x - self.width / 2.0 * scale, pos.y);
        Visual::Frame {
            atlas: desc.atlas_key().to_string(),
            region: frame.name.clone(),
            index: frame.index,
            flip_x: self.flip_x,
            min,
            max: min + Vec2::new(self.width * scale, self.height * scale),
        }
    }

    pub fn write(&self, mode: SerializationMode) -> Result<Value> {
        let value = match mode {
            SerializationMode::Model => serde_json::to_value(RendererModel {
                fanims: self.fanims.clone(),
                init_animation: self.init_animation.clone(),
            })?,
            SerializationMode::State => serde_json::to_value(AtlasState {
                current_animation: self.current_animation.as_ref().map(|d| d.id.clone()),
                flip_x: self.flip_x,
                current_frame: self.cursor.current,
                tween: self.tween.clone(),
            })?,
        };
        Ok(value)
    }

    pub fn read(&mut self, mode: SerializationMode, value: &Value) -> Result<()> {
        match mode {
            SerializationMode::Model => {
                let model: RendererModel = serde_json::from_value(value.clone())?;
                self.fanims = model.fanims;
                self.init_animation = model.init_animation;
            }
            SerializationMode::State => {
                let state: AtlasState = serde_json::from_value(value.clone())?;
                self.current_animation = state.current_animation.as_ref().and_then(|id| {
                    let desc = self.fanims.get(id).cloned();
                    if desc.is_none() {
                        warn!("Saved animation '{}' is not in the animation table", id);
                    }
                    desc
                });
                self.flip_x = state.flip_x;
                self.cursor.current = state.current_frame;
                self.tween = state.tween;
                self.frames.clear();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::renderer::tests::Harness;
    use crate::components::tween::INFINITY;

    fn harness() -> Harness {
        let mut regions: Vec<AtlasRegion> = (0..4)
            .map(|i| AtlasRegion::new("walk.left", 32, 64).with_index(i))
            .rev()
            .collect();
        regions.push(AtlasRegion::new("idle", 20, 50));
        let mut h = Harness::new();
        h.loader.add_atlas("hero", TextureAtlas::new(regions));
        h
    }

    fn renderer() -> AtlasRenderer {
        let mut r = AtlasRenderer::new();
        r.add_animation(AnimationDesc::new("idle", "hero"));
        r.add_animation(
            AnimationDesc::new("walk.left", "hero")
                .with_duration(1.0)
                .with_repeat(TweenType::NoRepeat, 1),
        );
        r
    }

    #[test]
    fn test_frames_follow_progress() {
        let mut h = harness();
        let mut r = renderer();
        r.start_animation(&mut h.ctx(), "walk.left", TweenType::SpriteDefined, 1, None)
            .unwrap();
        assert_eq!(r.num_frames(), 4);
        assert_eq!(r.current_frame(), 0);

        r.update(&mut h.ctx(), 0.5);
        assert_eq!(r.current_frame(), 2);
        r.update(&mut h.ctx(), 0.3);
        assert_eq!(r.current_frame(), 3);
        assert!(!r.is_complete());

        r.update(&mut h.ctx(), 0.3);
        assert!(r.is_complete());
        assert_eq!(r.current_frame(), 3);
    }

    #[test]
    fn test_single_frame_queues_callback_at_once() {
        let mut h = harness();
        let mut r = renderer();
        r.start_animation(&mut h.ctx(), "idle", TweenType::SpriteDefined, 1, Some(ActionCallback::new("now")))
            .unwrap();
        assert!(r.is_complete());
        assert_eq!(h.callbacks.drain(), vec![ActionCallback::new("now")]);
        assert_eq!(r.width(), 20.0);
        assert_eq!(r.height(), 50.0);
    }

    #[test]
    fn test_mirrored_frames() {
        let mut h = harness();
        let mut r = renderer();
        r.start_animation(&mut h.ctx(), "walk.right", TweenType::Repeat, INFINITY, None)
            .unwrap();
        assert!(r.flip_x());
        assert_eq!(r.current_animation_id().as_deref(), Some("walk.right"));
        match r.visual(Vec2::new(100.0, 0.0), 1.0) {
            Visual::Frame { region, flip_x, min, max, .. } => {
                assert_eq!(region, "walk.left");
                assert!(flip_x);
                assert_eq!(min, Vec2::new(84.0, 0.0));
                assert_eq!(max, Vec2::new(116.0, 64.0));
            }
            other => panic!("unexpected visual {:?}", other),
        }
    }

    #[test]
    fn test_reverse_starts_on_last_frame() {
        let mut h = harness();
        let mut r = renderer();
        r.start_animation(&mut h.ctx(), "walk.left", TweenType::Reverse, 1, Some(ActionCallback::new("r")))
            .unwrap();
        assert_eq!(r.current_frame(), 3);
        r.update(&mut h.ctx(), 0.6);
        assert_eq!(r.current_frame(), 1);
        r.update(&mut h.ctx(), 0.5);
        assert!(r.is_complete());
        assert_eq!(h.callbacks.len(), 1);
    }

    #[test]
    fn test_missing_region_is_an_asset_error() {
        let mut h = harness();
        let mut r = renderer();
        r.add_animation(AnimationDesc::new("jump", "hero"));
        let err = r
            .start_animation(&mut h.ctx(), "jump", TweenType::SpriteDefined, 1, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::AssetUnavailable { .. }));
        assert!(r.current_animation().is_none());
        assert!(matches!(r.visual(Vec2::ZERO, 1.0), Visual::Placeholder { .. }));
    }

    #[test]
    fn test_state_round_trip() {
        let mut h = harness();
        let mut r = renderer();
        r.start_animation(&mut h.ctx(), "walk.left", TweenType::Repeat, INFINITY, Some(ActionCallback::new("x")))
            .unwrap();
        r.update(&mut h.ctx(), 0.3);
        let model = r.write(SerializationMode::Model).unwrap();
        let state = r.write(SerializationMode::State).unwrap();
        assert_eq!(state["currentFrame"], 1);

        let mut restored = AtlasRenderer::new();
        restored.read(SerializationMode::Model, &model).unwrap();
        restored.read(SerializationMode::State, &state).unwrap();
        restored.load_assets(&mut h.loader);
        h.loader.finish_loading();
        restored.retrieve_assets(&mut h.ctx()).unwrap();

        assert_eq!(restored.current_animation().unwrap().id, "walk.left");
        assert_eq!(restored.current_frame(), 1);
        assert_eq!(restored.num_frames(), 4);

        restored.update(&mut h.ctx(), 0.25);
        assert_eq!(restored.current_frame(), 2);
    }

    #[test]
    fn test_retrieve_starts_init_animation() {
        let mut h = harness();
        let mut r = renderer();
        r.load_assets(&mut h.loader);
        h.loader.finish_loading();
        r.retrieve_assets(&mut h.ctx()).unwrap();
        assert_eq!(r.current_animation().unwrap().id, "idle");
        assert_eq!(r.source_cache().ref_count("hero"), 2);

        r.dispose(&mut h.loader);
        assert_eq!(h.loader.dispose_count("hero"), 1);
    }
}
