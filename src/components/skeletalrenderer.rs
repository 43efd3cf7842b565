//! Skeletal animation renderer.
//!
//! Plays bone-based animations from skeleton sources shared through a
//! reference-counted [`SourceCache`]. On top of the cache it handles:
//! - directional lookup with mirroring (see [`resolve`])
//! - repeat/reverse/count policies, queuing the completion callback
//! - skeleton event keys, turned into [`SkeletonEvent`]s
//! - the bounding polygon used for hit tests
//! - "model" and "state" serialization
//!
//! The animation id doubles as the clip name inside the skeleton source.
//! `AnimationDesc::duration` is the playback speed of the clip.

use std::sync::Arc;

use glam::Vec2;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::animation::{
    AnimationDesc, AnimationTable, direction_string, dirs, flip_id, resolve,
};
use crate::components::renderer::{
    AnimationContext, RendererModel, SerializationMode, Visual, polygon_contains,
};
use crate::components::tween::{INFINITY, TweenType};
use crate::error::{EngineError, Result};
use crate::events::skeleton::{SkeletonEvent, SkeletonEventKind};
use crate::resources::assets::AssetLoader;
use crate::resources::callbackqueue::ActionCallback;
use crate::resources::sourcecache::{CachedRuntime, SourceCache};
use crate::skeleton::data::EventKey;
use crate::skeleton::state::StateEvent;
use crate::skeleton::{AnimationState, Skeleton, SkeletonData};

/// Side of the square used when no usable extents can be computed.
pub const DEFAULT_DIM: f32 = 200.0;

/// Distance from the end at which reverse playback starts.
const REVERSE_EPSILON: f32 = 0.01;

/// Posed skeleton and its playback track, one per cached source.
#[derive(Debug)]
pub struct SkeletonRuntime {
    pub skeleton: Skeleton,
    pub state: AnimationState,
}

impl CachedRuntime for SkeletonRuntime {
    fn materialize(loader: &dyn AssetLoader, source: &str, atlas: &str) -> Result<Self> {
        let atlas = loader.texture_atlas(atlas)?;
        let file = loader.skeleton_file(source)?;
        let data = Arc::new(SkeletonData::build(source, &file, &atlas, loader.scale())?);
        Ok(SkeletonRuntime {
            skeleton: Skeleton::new(Arc::clone(&data)),
            state: AnimationState::new(data),
        })
    }
}

/// Live playback fields persisted in save games.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkeletalState {
    current_animation: Option<String>,
    flip_x: bool,
    cb: Option<ActionCallback>,
    current_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_animation_type: Option<TweenType>,
    last_animation_time: f32,
    complete: bool,
    /// Reverse wraps already played.
    #[serde(default, skip_serializing_if = "is_zero")]
    reverse_loops: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

#[derive(Debug)]
pub struct SkeletalRenderer {
    fanims: AnimationTable,
    init_animation: Option<String>,
    current_animation: Option<AnimationDesc>,
    animation_cb: Option<ActionCallback>,
    current_count: i32,
    current_animation_type: TweenType,
    flip_x: bool,
    /// Cache key of the source being played.
    current_source: Option<String>,
    width: f32,
    height: f32,
    source_cache: SourceCache<SkeletonRuntime>,
    /// Resume cursor in renderer time. Counts down for reverse playback.
    last_animation_time: f32,
    complete: bool,
    events_enabled: bool,
    reverse_loops: i32,
    bbox: [Vec2; 4],
}

impl Default for SkeletalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletalRenderer {
    pub fn new() -> Self {
        let mut renderer = SkeletalRenderer {
            fanims: AnimationTable::default(),
            init_animation: None,
            current_animation: None,
            animation_cb: None,
            current_count: 1,
            current_animation_type: TweenType::NoRepeat,
            flip_x: false,
            current_source: None,
            width: DEFAULT_DIM,
            height: DEFAULT_DIM,
            source_cache: SourceCache::new(),
            last_animation_time: 0.0,
            complete: false,
            events_enabled: true,
            reverse_loops: 0,
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

    /// Add a descriptor; the first one added becomes the initial animation.
    pub fn add_animation(&mut self, desc: AnimationDesc) {
        if self.init_animation.is_none() {
            self.init_animation = Some(desc.id.clone());
        }
        self.fanims.insert(desc.id.clone(), desc);
    }

    pub fn init_animation(&self) -> Option<&str> {
        self.init_animation.as_deref()
    }

    pub fn set_init_animation(&mut self, id: Option<String>) {
        self.init_animation = id;
    }

    pub fn current_animation(&self) -> Option<&AnimationDesc> {
        self.current_animation.as_ref()
    }

    /// Id as requested by the caller: mirrored when the authored one is flipped.
    pub fn current_animation_id(&self) -> Option<String> {
        let desc = self.current_animation.as_ref()?;
        if self.flip_x {
            Some(flip_id(&desc.id).unwrap_or_else(|| desc.id.clone()))
        } else {
            Some(desc.id.clone())
        }
    }

    pub fn current_animation_type(&self) -> TweenType {
        self.current_animation_type
    }

    pub fn current_count(&self) -> i32 {
        self.current_count
    }

    pub fn animation_cb(&self) -> Option<&ActionCallback> {
        self.animation_cb.as_ref()
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn last_animation_time(&self) -> f32 {
        self.last_animation_time
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Bounding polygon relative to the actor position.
    pub fn bbox(&self) -> &[Vec2; 4] {
        &self.bbox
    }

    pub fn contains(&self, local: Vec2) -> bool {
        polygon_contains(&self.bbox, local)
    }

    pub fn enable_events(&mut self, enabled: bool) {
        self.events_enabled = enabled;
    }

    pub fn source_cache(&self) -> &SourceCache<SkeletonRuntime> {
        &self.source_cache
    }

    /// Runtime of the source being played, once retrieved.
    pub fn current_runtime(&self) -> Option<&SkeletonRuntime> {
        self.current_source
            .as_deref()
            .and_then(|s| self.source_cache.get(s))
    }

    /// Clip names contained in the source of `desc`. Retrieves the source.
    pub fn internal_animations(
        &mut self,
        loader: &mut dyn AssetLoader,
        desc: &AnimationDesc,
    ) -> Result<Vec<String>> {
        let runtime = self
            .source_cache
            .retrieve_source(loader, &desc.source, desc.atlas.as_deref())?;
        Ok(runtime.skeleton.data().clip_names())
    }

    /// Start animation `id`, falling back to other directions when needed.
    ///
    /// `TweenType::SpriteDefined` takes repeat type and count from the
    /// descriptor. A callback of the previous animation is dropped unfired.
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

        self.current_source = Some(desc.source.clone());

        if self.source_cache.get(&desc.source).is_none()
            && let Err(e) =
                self.source_cache
                    .retrieve_source(ctx.loader, &desc.source, desc.atlas.as_deref())
        {
            error!("Could not load AnimationDesc {}: {}", id, e);
            self.current_animation = None;
            self.current_source = None;
            self.animation_cb = None;
            self.compute_bbox();
            return Err(e);
        }

        self.flip_x = flip;
        self.animation_cb = cb;

        if repeat_type == TweenType::SpriteDefined {
            self.current_animation_type = desc.animation_type;
            self.current_count = desc.count;
        } else {
            self.current_animation_type = repeat_type;
            self.current_count = count;
        }

        self.reverse_loops = 0;
        self.last_animation_time = if self.current_animation_type.is_reverse() {
            self.reverse_start(&desc)
        } else {
            0.0
        };
        self.current_animation = Some(desc);
        self.complete = false;

        if let Err(e) = self.set_current_animation(ctx) {
            error!("Could not start animation {}: {}", id, e);
            self.current_animation = None;
            self.animation_cb = None;
            self.compute_bbox();
            return Err(e);
        }
        Ok(())
    }

    /// Start `id` facing `direction`, or the direction of the current
    /// animation when `None`. Plays the bare id when that is not authored.
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

    /// Start `id` facing the travel direction from `p0` to `pf`.
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

    fn reverse_start(&self, desc: &AnimationDesc) -> f32 {
        let clip_duration = self
            .source_cache
            .get(&desc.source)
            .and_then(|rt| rt.skeleton.data().clip(&desc.id))
            .map_or(0.0, |clip| clip.duration);
        let speed = if desc.duration > 0.0 { desc.duration } else { 1.0 };
        (clip_duration / speed - REVERSE_EPSILON).max(0.0)
    }

    /// Reset the skeleton and play the current descriptor from the cursor.
    fn set_current_animation(&mut self, ctx: &mut AnimationContext<'_>) -> Result<()> {
        let (Some(desc), Some(source)) = (&self.current_animation, &self.current_source) else {
            return Ok(());
        };
        let runtime = self
            .source_cache
            .get_mut(source)
            .ok_or_else(|| EngineError::UnknownSource(source.clone()))?;

        runtime.skeleton.set_to_setup_pose();
        runtime.skeleton.set_flip_x(self.flip_x);
        runtime.state.set_time_scale(desc.duration);
        runtime
            .state
            .set_animation(&desc.id, self.current_animation_type == TweenType::Repeat)?;

        self.update_animation(ctx, self.last_animation_time);
        self.compute_bbox();
        Ok(())
    }

    /// Advance the track by `time` and pose the skeleton.
    fn update_animation(&mut self, ctx: &mut AnimationContext<'_>, time: f32) {
        let Some(runtime) = self
            .current_source
            .as_deref()
            .and_then(|s| self.source_cache.get_mut(s))
        else {
            return;
        };

        runtime.state.update(time);
        let fired = runtime.state.apply(&mut runtime.skeleton);
        runtime.skeleton.update_world_transform();

        for ev in fired {
            match ev {
                StateEvent::Event(key) => self.on_event(ctx, &key),
                StateEvent::Complete { loop_count } => {
                    self.on_complete(ctx, loop_count);
                }
            }
        }
    }

    /// Returns whether the animation is complete after this boundary.
    fn on_complete(&mut self, ctx: &mut AnimationContext<'_>, loop_count: i32) -> bool {
        if self.complete {
            return true;
        }

        if matches!(
            self.current_animation_type,
            TweenType::Repeat | TweenType::ReverseRepeat
        ) && (self.current_count == INFINITY || self.current_count > loop_count)
        {
            return false;
        }

        self.complete = true;
        self.compute_bbox();

        if let Some(cb) = self.animation_cb.take() {
            ctx.callbacks.add(cb);
        }
        true
    }

    fn on_event(&mut self, ctx: &mut AnimationContext<'_>, key: &EventKey) {
        if !self.events_enabled || self.current_animation_type.is_reverse() {
            return;
        }

        debug!("Skeleton event {}:{}.{}", key.int, key.name, key.string);

        match SkeletonEventKind::from_code(key.int, &key.string) {
            Some(kind) => ctx.events.push(SkeletonEvent {
                actor: key.name.clone(),
                kind,
            }),
            None => error!("Skeleton event not recognized: {}", key.int),
        }
    }

    /// Advance playback by `delta` seconds.
    pub fn update(&mut self, ctx: &mut AnimationContext<'_>, delta: f32) {
        if self.complete || self.current_runtime().is_none() {
            return;
        }

        let mut d = delta;

        if self.current_animation_type.is_reverse() {
            d = -delta;

            if self.last_animation_time <= 0.0 {
                self.last_animation_time = 0.0;
                self.reverse_loops += 1;

                if !self.on_complete(ctx, self.reverse_loops)
                    && self.current_animation_type == TweenType::ReverseRepeat
                {
                    if let Some(desc) = self.current_animation.clone() {
                        self.last_animation_time = self.reverse_start(&desc);
                    }
                    if let Err(e) = self.set_current_animation(ctx) {
                        error!("Could not rewind animation: {}", e);
                    }
                }
                return;
            }
        }

        self.last_animation_time += d;

        if self.last_animation_time >= 0.0 {
            self.update_animation(ctx, d);
        }
    }

    /// Recompute the bounding polygon from the current pose.
    ///
    /// Without a skeleton the polygon is a bottom-anchored rectangle of the
    /// last known size.
    fn compute_bbox(&mut self) {
        let runtime = self
            .current_source
            .as_deref()
            .and_then(|s| self.source_cache.get_mut(s));

        let Some(runtime) = runtime else {
            let hw = self.width / 2.0;
            self.bbox = [
                Vec2::new(-hw, 0.0),
                Vec2::new(-hw, self.height),
                Vec2::new(hw, self.height),
                Vec2::new(hw, 0.0),
            ];
            return;
        };

        runtime.skeleton.set_position(Vec2::ZERO);
        runtime.skeleton.update_world_transform();

        let extents = runtime
            .skeleton
            .bounds()
            .filter(|b| b.width() > 0.0 && b.height() > 0.0)
            .or_else(|| {
                runtime
                    .skeleton
                    .region_extents()
                    .filter(|b| b.width() > 0.0 && b.height() > 0.0)
            });

        let (min, max) = match extents {
            Some(b) => {
                self.width = b.width();
                self.height = b.height();
                (b.min, b.max)
            }
            None => {
                self.width = DEFAULT_DIM;
                self.height = DEFAULT_DIM;
                let half = DEFAULT_DIM / 2.0;
                (Vec2::splat(-half), Vec2::splat(half))
            }
        };

        self.bbox = [
            min,
            Vec2::new(min.x, max.y),
            max,
            Vec2::new(max.x, min.y),
        ];
    }

    /// Register the sources this actor will need. Never blocks.
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

    /// Materialize the loaded sources and restore the playing animation.
    ///
    /// A restored animation is replayed up to its cursor with events
    /// disabled, so effects fired before the save do not fire again.
    pub fn retrieve_assets(&mut self, ctx: &mut AnimationContext<'_>) -> Result<()> {
        if let Err(e) = self.source_cache.retrieve_all(ctx.loader) {
            error!("Could not retrieve skeleton sources: {}", e);
        }

        if let Some(desc) = self.current_animation.clone() {
            self.current_source = Some(desc.source.clone());

            if self.source_cache.get(&desc.source).is_none()
                && let Err(e) =
                    self.source_cache
                        .retrieve_source(ctx.loader, &desc.source, desc.atlas.as_deref())
            {
                error!("Could not retrieve AnimationDesc {}: {}", desc.id, e);
                self.current_animation = None;
                self.current_source = None;
                self.compute_bbox();
                return Err(e);
            }

            let events_enabled = self.events_enabled;
            self.events_enabled = false;
            let result = self.set_current_animation(ctx);
            self.events_enabled = events_enabled;
            result?;
        } else if let Some(init) = self.init_animation.clone() {
            self.start_animation(ctx, &init, TweenType::SpriteDefined, 1, None)?;
        }

        self.compute_bbox();
        Ok(())
    }

    /// Release every cached source.
    pub fn dispose(&mut self, loader: &mut dyn AssetLoader) {
        self.source_cache.dispose_all(loader);
        self.current_source = None;
    }

    /// What to present with the actor anchored at `pos`.
    pub fn visual(&mut self, pos: Vec2, scale: f32) -> Visual {
        let runtime = self
            .current_source
            .as_deref()
            .and_then(|s| self.source_cache.get_mut(s));

        match runtime {
            Some(runtime) if scale > 0.0 => {
                runtime.skeleton.set_position(pos / scale);
                runtime.skeleton.update_world_transform();
                let mut quads = runtime.skeleton.region_quads();
                for quad in &mut quads {
                    for corner in &mut quad.corners {
                        *corner *= scale;
                    }
                }
                Visual::Skeleton { quads }
            }
            _ => Visual::placeholder(pos, self.width, self.height, scale),
        }
    }

    pub fn write(&self, mode: SerializationMode) -> Result<Value> {
        let value = match mode {
            SerializationMode::Model => serde_json::to_value(RendererModel {
                fanims: self.fanims.clone(),
                init_animation: self.init_animation.clone(),
            })?,
            SerializationMode::State => {
                let current_animation = self.current_animation.as_ref().map(|d| d.id.clone());
                let current_animation_type =
                    current_animation.as_ref().map(|_| self.current_animation_type);
                serde_json::to_value(SkeletalState {
                    current_animation,
                    flip_x: self.flip_x,
                    cb: self.animation_cb.clone(),
                    current_count: self.current_count,
                    current_animation_type,
                    last_animation_time: self.last_animation_time,
                    complete: self.complete,
                    reverse_loops: self.reverse_loops,
                })?
            }
        };
        Ok(value)
    }

    /// Restore from `value`. State mode expects the model to be read first;
    /// runtime objects come back on the next `retrieve_assets`.
    pub fn read(&mut self, mode: SerializationMode, value: &Value) -> Result<()> {
        match mode {
            SerializationMode::Model => {
                let model: RendererModel = serde_json::from_value(value.clone())?;
                self.fanims = model.fanims;
                self.init_animation = model.init_animation;
            }
            SerializationMode::State => {
                let state: SkeletalState = serde_json::from_value(value.clone())?;

                self.current_animation = state.current_animation.as_ref().and_then(|id| {
                    let desc = self.fanims.get(id).cloned();
                    if desc.is_none() {
                        warn!("Saved animation '{}' is not in the animation table", id);
                    }
                    desc
                });
                self.flip_x = state.flip_x;
                self.animation_cb = state.cb;
                self.current_count = state.current_count;
                if let Some(animation_type) = state.current_animation_type {
                    self.current_animation_type = animation_type;
                }
                self.last_animation_time = state.last_animation_time;
                self.complete = state.complete;
                self.reverse_loops = state.reverse_loops;
                self.current_source = None;
            }
        }
        Ok(())
    }
}
