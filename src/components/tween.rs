//! Tween components for time-driven interpolation.
//!
//! This module provides the generic [`Tween`] state machine and its
//! specializations:
//! - [`FrameTween`] – maps progress onto a discrete frame index of a
//!   [`FrameTarget`] (atlas animations)
//! - [`PropertyTween`] – linearly interpolates a [`Lerp`] value onto a
//!   [`PropertyTarget`] (music volume, actor position)
//! - [`PositionTween`] – ECS component moving an actor's
//!   [`ActorPosition`](super::actor::ActorPosition)
//!
//! Each tween supports the named [`Interpolation`] curves and the
//! [`TweenType`] repeat policies. Completion never calls back synchronously:
//! the stored [`ActionCallback`] is pushed onto a [`CallbackQueue`].
//! See [`crate::systems::tween`] for the update systems.

use std::f32::consts::PI;

use bevy_ecs::prelude::Component;
use glam::Vec2;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::resources::callbackqueue::{ActionCallback, CallbackQueue};

/// Repeat count meaning "loop forever".
pub const INFINITY: i32 = -1;

/// Determines how a tween behaves when it reaches a boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TweenType {
    /// Play once and stop.
    #[default]
    NoRepeat,
    /// Restart from the beginning until `count` loops are done.
    Repeat,
    /// Play once backwards, from the end to the start.
    Reverse,
    /// Play backwards, wrapping to the end until `count` loops are done.
    ReverseRepeat,
    /// Flip direction at every boundary until `count` flips are done.
    Yoyo,
    /// Sentinel used by callers: take the policy authored in the animation
    /// descriptor.
    SpriteDefined,
}

impl TweenType {
    /// Whether playback starts at the end and runs towards zero.
    pub fn is_reverse(self) -> bool {
        matches!(self, TweenType::Reverse | TweenType::ReverseRepeat)
    }

    /// Parse the persisted/scripted name (`"REVERSE_REPEAT"`, `"yoyo"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "NO_REPEAT" => Some(TweenType::NoRepeat),
            "REPEAT" => Some(TweenType::Repeat),
            "REVERSE" => Some(TweenType::Reverse),
            "REVERSE_REPEAT" => Some(TweenType::ReverseRepeat),
            "YOYO" => Some(TweenType::Yoyo),
            "SPRITE_DEFINED" => Some(TweenType::SpriteDefined),
            _ => None,
        }
    }
}

/// Named easing curves.
///
/// Every curve maps `0.0` to `0.0` and `1.0` to `1.0`; the shape in between
/// differs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    #[default]
    Linear,
    Elastic,
    ElasticIn,
    ElasticOut,
    Swing,
    SwingIn,
    SwingOut,
    Bounce,
    BounceIn,
    BounceOut,
    Pow2,
    Pow2In,
    Pow2Out,
    Exp10,
}

const ELASTIC_VALUE: f32 = 2.0;
const ELASTIC_POWER: f32 = 10.0;
const BOUNCE_WIDTHS: [f32; 4] = [0.68, 0.34, 0.2, 0.15];
const BOUNCE_HEIGHTS: [f32; 4] = [1.0, 0.26, 0.11, 0.03];

fn bounce_out(a: f32) -> f32 {
    if a >= 1.0 {
        return 1.0;
    }
    let mut a = a + BOUNCE_WIDTHS[0] / 2.0;
    let mut width = 0.0;
    let mut height = 0.0;
    for (w, h) in BOUNCE_WIDTHS.iter().zip(BOUNCE_HEIGHTS.iter()) {
        width = *w;
        if a <= width {
            height = *h;
            break;
        }
        a -= width;
    }
    a /= width;
    let z = 4.0 / width * height * a;
    1.0 - (z - z * a) * width
}

fn bounce_in_out_half(a: f32) -> f32 {
    let test = a + BOUNCE_WIDTHS[0] / 2.0;
    if test < BOUNCE_WIDTHS[0] {
        return test / (BOUNCE_WIDTHS[0] / 2.0) - 1.0;
    }
    bounce_out(a)
}

impl Interpolation {
    /// Transform a linear progress value.
    ///
    /// The input is clamped to [0.0, 1.0] first.
    pub fn apply(self, t: f32) -> f32 {
        let a = t.clamp(0.0, 1.0);
        match self {
            Interpolation::Linear => a,
            Interpolation::Pow2 => {
                if a <= 0.5 {
                    (a * 2.0).powi(2) / 2.0
                } else {
                    ((a - 1.0) * 2.0).powi(2) / -2.0 + 1.0
                }
            }
            Interpolation::Pow2In => a * a,
            Interpolation::Pow2Out => -(a - 1.0).powi(2) + 1.0,
            Interpolation::Exp10 => {
                let min = ELASTIC_VALUE.powf(-ELASTIC_POWER);
                let scale = 1.0 / (1.0 - min);
                if a <= 0.5 {
                    (ELASTIC_VALUE.powf(ELASTIC_POWER * (a * 2.0 - 1.0)) - min) * scale / 2.0
                } else {
                    (2.0 - (ELASTIC_VALUE.powf(-ELASTIC_POWER * (a * 2.0 - 1.0)) - min) * scale)
                        / 2.0
                }
            }
            Interpolation::Elastic => {
                let bounces = -7.0 * PI;
                if a <= 0.5 {
                    let a = a * 2.0;
                    ELASTIC_VALUE.powf(ELASTIC_POWER * (a - 1.0)) * (a * bounces).sin() / 2.0
                } else {
                    let a = (1.0 - a) * 2.0;
                    1.0 - ELASTIC_VALUE.powf(ELASTIC_POWER * (a - 1.0)) * (a * bounces).sin() / 2.0
                }
            }
            Interpolation::ElasticIn => {
                if a >= 0.99 {
                    return 1.0;
                }
                let bounces = 6.0 * PI;
                ELASTIC_VALUE.powf(ELASTIC_POWER * (a - 1.0)) * (a * bounces).sin()
            }
            Interpolation::ElasticOut => {
                if a == 0.0 {
                    return 0.0;
                }
                let bounces = -7.0 * PI;
                let a = 1.0 - a;
                1.0 - ELASTIC_VALUE.powf(ELASTIC_POWER * (a - 1.0)) * (a * bounces).sin()
            }
            Interpolation::Swing => {
                let scale = 3.0;
                if a <= 0.5 {
                    let a = a * 2.0;
                    a * a * ((scale + 1.0) * a - scale) / 2.0
                } else {
                    let a = (a - 1.0) * 2.0;
                    a * a * ((scale + 1.0) * a + scale) / 2.0 + 1.0
                }
            }
            Interpolation::SwingIn => {
                let scale = 2.0;
                a * a * ((scale + 1.0) * a - scale)
            }
            Interpolation::SwingOut => {
                let scale = 2.0;
                let a = a - 1.0;
                a * a * ((scale + 1.0) * a + scale) + 1.0
            }
            Interpolation::BounceOut => bounce_out(a),
            Interpolation::BounceIn => 1.0 - bounce_out(1.0 - a),
            Interpolation::Bounce => {
                if a <= 0.5 {
                    (1.0 - bounce_in_out_half(1.0 - a * 2.0)) / 2.0
                } else {
                    bounce_in_out_half(a * 2.0 - 1.0) / 2.0 + 0.5
                }
            }
        }
    }
}

fn clamp_loops(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Generic time-progress state machine.
///
/// `elapsed` runs from 0 to `duration` (or from `duration` to 0 for the
/// reverse types). Loop boundaries are counted in `loops` and compared
/// against `count` ([`INFINITY`] never completes).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tween {
    duration: f32,
    elapsed: f32,
    #[serde(rename = "type")]
    tween_type: TweenType,
    count: i32,
    loops: i32,
    reverse: bool,
    complete: bool,
    interpolation: Interpolation,
    cb: Option<ActionCallback>,
}

impl Default for Tween {
    fn default() -> Self {
        Self::new()
    }
}

impl Tween {
    pub fn new() -> Self {
        Tween {
            duration: 1.0,
            elapsed: 0.0,
            tween_type: TweenType::NoRepeat,
            count: 1,
            loops: 0,
            reverse: false,
            complete: false,
            interpolation: Interpolation::Linear,
            cb: None,
        }
    }

    /// Configure and arm the tween.
    ///
    /// [`TweenType::SpriteDefined`] has no meaning at this level and is played
    /// as [`TweenType::NoRepeat`]. A previous callback is dropped unfired.
    pub fn start(
        &mut self,
        tween_type: TweenType,
        count: i32,
        duration: f32,
        interpolation: Interpolation,
        cb: Option<ActionCallback>,
    ) {
        self.tween_type = if tween_type == TweenType::SpriteDefined {
            warn!("SPRITE_DEFINED reached a plain tween, playing it as NO_REPEAT");
            TweenType::NoRepeat
        } else {
            tween_type
        };
        self.count = count;
        self.duration = duration;
        self.interpolation = interpolation;
        self.cb = cb;
        self.restart();
    }

    /// Re-arm without touching the configuration.
    pub fn restart(&mut self) {
        self.reverse = self.tween_type.is_reverse();
        self.elapsed = if self.reverse { self.duration } else { 0.0 };
        self.loops = 0;
        self.complete = false;
    }

    /// Advance by `delta` seconds.
    ///
    /// Returns `true` on the update that completes the tween; the callback
    /// is queued at that moment, never earlier and never twice.
    pub fn update(&mut self, delta: f32, callbacks: &mut CallbackQueue) -> bool {
        if self.complete {
            return false;
        }

        if self.duration <= 0.0 {
            self.elapsed = if self.reverse { 0.0 } else { self.duration.max(0.0) };
            self.finish(callbacks);
            return true;
        }

        self.elapsed += if self.reverse { -delta } else { delta };

        let hit_end = !self.reverse && self.elapsed >= self.duration;
        let hit_start = self.reverse && self.elapsed <= 0.0;
        if !hit_end && !hit_start {
            return false;
        }

        // Boundaries crossed by this step and how far past the last one it went.
        let duration = f64::from(self.duration);
        let over = if self.reverse {
            -f64::from(self.elapsed)
        } else {
            f64::from(self.elapsed) - duration
        };
        let crossed = (over / duration).floor() as i64 + 1;
        let mut past = over.rem_euclid(duration);
        if past >= duration {
            past = 0.0;
        }

        let budget = match self.tween_type {
            TweenType::Repeat | TweenType::ReverseRepeat | TweenType::Yoyo => {
                (self.count != INFINITY).then(|| i64::from(self.count.saturating_sub(self.loops)).max(1))
            }
            _ => Some(1),
        };

        if let Some(budget) = budget
            && crossed >= budget
        {
            self.loops = self.loops.saturating_add(clamp_loops(budget));
            // Direction at the final boundary: a yoyo flips at every one before it.
            if self.tween_type == TweenType::Yoyo && (budget - 1) % 2 == 1 {
                self.reverse = !self.reverse;
            }
            self.elapsed = if self.reverse { 0.0 } else { self.duration };
            self.finish(callbacks);
            return true;
        }

        self.loops = self.loops.saturating_add(clamp_loops(crossed));
        if self.tween_type == TweenType::Yoyo && crossed % 2 == 1 {
            self.reverse = !self.reverse;
        }
        self.elapsed = if self.reverse {
            (duration - past) as f32
        } else {
            past as f32
        };
        false
    }

    fn finish(&mut self, callbacks: &mut CallbackQueue) {
        self.complete = true;
        if let Some(cb) = self.cb.take() {
            callbacks.add(cb);
        }
    }

    /// Linear progress in [0, 1].
    pub fn linear_percent(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Progress passed through the configured interpolation curve.
    pub fn percent(&self) -> f32 {
        self.interpolation.apply(self.linear_percent())
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn tween_type(&self) -> TweenType {
        self.tween_type
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    /// Loop boundaries crossed since the last (re)start.
    pub fn loops(&self) -> i32 {
        self.loops
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn cb(&self) -> Option<&ActionCallback> {
        self.cb.as_ref()
    }

    pub fn set_cb(&mut self, cb: Option<ActionCallback>) {
        self.cb = cb;
    }
}

/// Something with a discrete set of frames.
pub trait FrameTarget {
    fn num_frames(&self) -> usize;
    fn set_frame(&mut self, index: usize);
}

/// Tween driving a frame index: `floor(percent * frames)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTween {
    tween: Tween,
}

impl FrameTween {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &mut self,
        target: &mut impl FrameTarget,
        tween_type: TweenType,
        count: i32,
        duration: f32,
        cb: Option<ActionCallback>,
    ) {
        self.tween
            .start(tween_type, count, duration, Interpolation::Linear, cb);
        self.update_target(target);
    }

    pub fn update(
        &mut self,
        target: &mut impl FrameTarget,
        delta: f32,
        callbacks: &mut CallbackQueue,
    ) -> bool {
        let completed = self.tween.update(delta, callbacks);
        self.update_target(target);
        completed
    }

    /// Push the frame for the current progress.
    ///
    /// Skipped once complete so the final frame stays on screen.
    pub fn update_target(&self, target: &mut impl FrameTarget) {
        let frames = target.num_frames();
        if frames == 0 || self.tween.is_complete() {
            return;
        }
        let percent = self.tween.percent();
        if percent < 1.0 {
            let index = (percent * frames as f32).floor() as usize;
            target.set_frame(index.min(frames - 1));
        }
    }

    pub fn tween(&self) -> &Tween {
        &self.tween
    }

    pub fn is_complete(&self) -> bool {
        self.tween.is_complete()
    }
}

/// Values a [`PropertyTween`] can interpolate.
pub trait Lerp: Copy {
    fn lerp(start: Self, end: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(start: f32, end: f32, t: f32) -> f32 {
        start + (end - start) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(start: Vec2, end: Vec2, t: f32) -> Vec2 {
        start + (end - start) * t
    }
}

/// Receiver of a continuous tweened property.
pub trait PropertyTarget<T> {
    fn set_property(&mut self, value: T);
}

/// Tween of a continuous scalar or vector: `start + percent * (end - start)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyTween<T> {
    pub start: T,
    pub end: T,
    tween: Tween,
}

impl<T: Lerp> PropertyTween<T> {
    /// One-shot tween from `start` to `end`.
    pub fn new(
        start: T,
        end: T,
        duration: f32,
        interpolation: Interpolation,
        cb: Option<ActionCallback>,
    ) -> Self {
        let mut tween = Tween::new();
        tween.start(TweenType::NoRepeat, 1, duration, interpolation, cb);
        PropertyTween { start, end, tween }
    }

    /// Tween with an explicit repeat policy.
    pub fn with_repeat(mut self, tween_type: TweenType, count: i32) -> Self {
        let cb = self.tween.cb.take();
        let duration = self.tween.duration;
        let interpolation = self.tween.interpolation;
        self.tween
            .start(tween_type, count, duration, interpolation, cb);
        self
    }

    pub fn value(&self) -> T {
        T::lerp(self.start, self.end, self.tween.percent())
    }

    pub fn update(
        &mut self,
        target: &mut impl PropertyTarget<T>,
        delta: f32,
        callbacks: &mut CallbackQueue,
    ) -> bool {
        let completed = self.tween.update(delta, callbacks);
        target.set_property(self.value());
        completed
    }

    pub fn tween(&self) -> &Tween {
        &self.tween
    }

    pub fn is_complete(&self) -> bool {
        self.tween.is_complete()
    }
}

/// Fade of the music volume, always a single non-repeating run.
pub type MusicVolumeTween = PropertyTween<f32>;

/// Animates an actor's position between two points.
#[derive(Component, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionTween(pub PropertyTween<Vec2>);

impl PositionTween {
    pub fn new(
        from: Vec2,
        to: Vec2,
        duration: f32,
        interpolation: Interpolation,
        cb: Option<ActionCallback>,
    ) -> Self {
        PositionTween(PropertyTween::new(from, to, duration, interpolation, cb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    const ALL_CURVES: [Interpolation; 14] = [
        Interpolation::Linear,
        Interpolation::Elastic,
        Interpolation::ElasticIn,
        Interpolation::ElasticOut,
        Interpolation::Swing,
        Interpolation::SwingIn,
        Interpolation::SwingOut,
        Interpolation::Bounce,
        Interpolation::BounceIn,
        Interpolation::BounceOut,
        Interpolation::Pow2,
        Interpolation::Pow2In,
        Interpolation::Pow2Out,
        Interpolation::Exp10,
    ];

    struct Frames {
        count: usize,
        current: Option<usize>,
    }

    impl FrameTarget for Frames {
        fn num_frames(&self) -> usize {
            self.count
        }
        fn set_frame(&mut self, index: usize) {
            self.current = Some(index);
        }
    }

    struct Volume(f32);

    impl PropertyTarget<f32> for Volume {
        fn set_property(&mut self, value: f32) {
            self.0 = value;
        }
    }

    fn started(tween_type: TweenType, count: i32, duration: f32, cb: &str) -> Tween {
        let mut tw = Tween::new();
        tw.start(
            tween_type,
            count,
            duration,
            Interpolation::Linear,
            Some(ActionCallback::new(cb)),
        );
        tw
    }

    // ==================== INTERPOLATION ====================

    #[test]
    fn test_curves_map_endpoints() {
        for curve in ALL_CURVES {
            assert!(approx_eq(curve.apply(0.0), 0.0), "{:?} at 0", curve);
            assert!(approx_eq(curve.apply(1.0), 1.0), "{:?} at 1", curve);
        }
    }

    #[test]
    fn test_curves_clamp_input() {
        for curve in ALL_CURVES {
            assert!(approx_eq(curve.apply(-0.5), 0.0), "{:?} below 0", curve);
            assert!(approx_eq(curve.apply(1.5), 1.0), "{:?} above 1", curve);
        }
    }

    #[test]
    fn test_pow2_shapes() {
        assert!(approx_eq(Interpolation::Pow2In.apply(0.5), 0.25));
        assert!(approx_eq(Interpolation::Pow2Out.apply(0.5), 0.75));
        assert!(approx_eq(Interpolation::Pow2.apply(0.5), 0.5));
        assert!(approx_eq(Interpolation::Pow2.apply(0.25), 0.125));
    }

    #[test]
    fn test_swing_out_overshoots() {
        let peak = (1..100)
            .map(|i| Interpolation::SwingOut.apply(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_bounce_out_stays_in_range() {
        for i in 0..=100 {
            let v = Interpolation::BounceOut.apply(i as f32 / 100.0);
            assert!((-EPSILON..=1.0 + EPSILON).contains(&v), "value {v}");
        }
    }

    #[test]
    fn test_interpolation_serializes_uppercase() {
        let json = serde_json::to_string(&Interpolation::ElasticIn).unwrap();
        assert_eq!(json, "\"ELASTICIN\"");
        let back: Interpolation = serde_json::from_str("\"POW2OUT\"").unwrap();
        assert_eq!(back, Interpolation::Pow2Out);
    }

    // ==================== TWEEN TYPE ====================

    #[test]
    fn test_tween_type_names() {
        assert_eq!(
            serde_json::to_string(&TweenType::ReverseRepeat).unwrap(),
            "\"REVERSE_REPEAT\""
        );
        assert_eq!(TweenType::from_name("yoyo"), Some(TweenType::Yoyo));
        assert_eq!(
            TweenType::from_name("SPRITE_DEFINED"),
            Some(TweenType::SpriteDefined)
        );
        assert_eq!(TweenType::from_name("sideways"), None);
    }

    // ==================== TWEEN STATE MACHINE ====================

    #[test]
    fn test_no_repeat_completes_exactly_once() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::NoRepeat, 1, 1.0, "done");

        let mut completions = 0;
        for _ in 0..20 {
            if tw.update(0.1, &mut q) {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(q.len(), 1);
        assert!(tw.is_complete());
        assert!(approx_eq(tw.elapsed(), 1.0));
    }

    #[test]
    fn test_no_repeat_random_deltas_complete_once() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..50 {
            let mut q = CallbackQueue::new();
            let mut tw = started(TweenType::NoRepeat, 1, 2.0, "cb");
            let mut total = 0.0;
            let mut completions = 0;
            while total < 4.0 {
                let d = rng.f32() * 0.3;
                total += d;
                if tw.update(d, &mut q) {
                    completions += 1;
                }
            }
            assert_eq!(completions, 1);
            assert_eq!(q.len(), 1);
        }
    }

    #[test]
    fn test_callback_is_queued_not_before_completion() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::NoRepeat, 1, 1.0, "done");
        tw.update(0.5, &mut q);
        assert!(q.is_empty());
        tw.update(0.6, &mut q);
        assert_eq!(q.drain()[0].handle(), "done");
    }

    #[test]
    fn test_repeat_completes_after_nth_boundary() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, 3, 1.0, "done");

        for _ in 0..2 {
            tw.update(1.0, &mut q);
            assert!(!tw.is_complete());
        }
        assert_eq!(tw.loops(), 2);
        tw.update(0.5, &mut q);
        assert!(!tw.is_complete());
        assert!(approx_eq(tw.linear_percent(), 0.5));

        tw.update(0.5, &mut q);
        assert!(tw.is_complete());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_repeat_infinite_never_completes() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, INFINITY, 0.5, "never");
        for _ in 0..1000 {
            tw.update(0.13, &mut q);
        }
        assert!(!tw.is_complete());
        assert!(q.is_empty());
        assert!(tw.loops() > 100);
    }

    #[test]
    fn test_repeat_large_delta_counts_every_boundary() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, 5, 1.0, "done");
        tw.update(3.5, &mut q);
        assert_eq!(tw.loops(), 3);
        assert!(approx_eq(tw.linear_percent(), 0.5));
        assert!(!tw.is_complete());
    }

    #[test]
    fn test_repeat_huge_step_over_tiny_duration_returns() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, INFINITY, 0.001, "never");
        assert!(!tw.update(1.0e9, &mut q));
        assert!(!tw.is_complete());
        assert_eq!(tw.loops(), i32::MAX);
        assert!((0.0..=0.001).contains(&tw.elapsed()));
        assert!(q.is_empty());

        let mut tw = started(TweenType::ReverseRepeat, INFINITY, 0.001, "never");
        assert!(!tw.update(1.0e9, &mut q));
        assert!((0.0..=0.001).contains(&tw.elapsed()));
    }

    #[test]
    fn test_finite_count_huge_step_stops_at_count() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, 3, 0.5, "done");
        assert!(tw.update(1.0e6, &mut q));
        assert_eq!(tw.loops(), 3);
        assert!(approx_eq(tw.elapsed(), 0.5));
        assert_eq!(q.len(), 1);

        let mut tw = started(TweenType::Yoyo, 4, 1.0, "done");
        assert!(tw.update(1.0e6, &mut q));
        assert_eq!(tw.loops(), 4);
        assert!(approx_eq(tw.elapsed(), 0.0));
    }

    #[test]
    fn test_yoyo_several_bounces_in_one_step() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Yoyo, INFINITY, 1.0, "never");
        tw.update(2.5, &mut q);
        assert_eq!(tw.loops(), 2);
        assert!(approx_eq(tw.elapsed(), 0.5));
        tw.update(1.0, &mut q);
        assert_eq!(tw.loops(), 3);
        assert!(approx_eq(tw.elapsed(), 0.5));
        tw.update(0.25, &mut q);
        assert!(approx_eq(tw.elapsed(), 0.25));
    }

    #[test]
    fn test_reverse_starts_at_end_and_completes_at_zero() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Reverse, 1, 1.0, "back");
        assert!(approx_eq(tw.elapsed(), 1.0));
        tw.update(0.4, &mut q);
        assert!(approx_eq(tw.elapsed(), 0.6));
        assert!(!tw.is_complete());
        assert!(tw.update(0.7, &mut q));
        assert!(approx_eq(tw.elapsed(), 0.0));
        assert!(!tw.update(0.7, &mut q));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_reverse_repeat_wraps_to_end() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::ReverseRepeat, 2, 1.0, "done");
        tw.update(1.25, &mut q);
        assert_eq!(tw.loops(), 1);
        assert!(approx_eq(tw.elapsed(), 0.75));
        assert!(!tw.is_complete());
        tw.update(1.0, &mut q);
        assert!(tw.is_complete());
        assert!(approx_eq(tw.elapsed(), 0.0));
    }

    #[test]
    fn test_yoyo_bounces_then_completes() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Yoyo, 2, 1.0, "done");
        tw.update(1.25, &mut q);
        assert!(approx_eq(tw.elapsed(), 0.75));
        assert!(!tw.is_complete());
        tw.update(0.5, &mut q);
        assert!(approx_eq(tw.elapsed(), 0.25));
        tw.update(0.5, &mut q);
        assert!(tw.is_complete());
        assert!(approx_eq(tw.elapsed(), 0.0));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_restart_replaces_state_not_config() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, 2, 1.0, "done");
        tw.update(1.5, &mut q);
        tw.restart();
        assert_eq!(tw.loops(), 0);
        assert!(approx_eq(tw.elapsed(), 0.0));
        assert_eq!(tw.count(), 2);
        assert_eq!(tw.tween_type(), TweenType::Repeat);
    }

    #[test]
    fn test_new_start_drops_stale_callback() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::NoRepeat, 1, 1.0, "stale");
        tw.update(0.5, &mut q);
        tw.start(
            TweenType::NoRepeat,
            1,
            1.0,
            Interpolation::Linear,
            Some(ActionCallback::new("fresh")),
        );
        tw.update(2.0, &mut q);
        let handles: Vec<String> = q.drain().iter().map(|c| c.handle().to_string()).collect();
        assert_eq!(handles, vec!["fresh"]);
    }

    #[test]
    fn test_zero_duration_completes_on_first_update() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, INFINITY, 0.0, "done");
        assert!(tw.update(0.016, &mut q));
        assert!(tw.is_complete());
    }

    #[test]
    fn test_sprite_defined_plays_once() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::SpriteDefined, 4, 1.0, "done");
        assert_eq!(tw.tween_type(), TweenType::NoRepeat);
        tw.update(1.0, &mut q);
        assert!(tw.is_complete());
    }

    #[test]
    fn test_tween_state_roundtrips_mid_flight() {
        let mut q = CallbackQueue::new();
        let mut tw = started(TweenType::Repeat, 3, 2.0, "handle");
        tw.update(2.5, &mut q);
        let json = serde_json::to_value(&tw).unwrap();
        assert_eq!(json["type"], "REPEAT");
        assert_eq!(json["cb"], "handle");

        let mut back: Tween = serde_json::from_value(json).unwrap();
        assert_eq!(back.loops(), 1);
        assert!(approx_eq(back.elapsed(), 0.5));
        back.update(3.5, &mut q);
        assert!(back.is_complete());
        assert_eq!(q.drain()[0].handle(), "handle");
    }

    // ==================== FRAME TWEEN ====================

    #[test]
    fn test_frame_tween_maps_progress_to_frames() {
        let mut q = CallbackQueue::new();
        let mut frames = Frames {
            count: 4,
            current: None,
        };
        let mut ft = FrameTween::new();
        ft.start(&mut frames, TweenType::NoRepeat, 1, 1.0, None);
        assert_eq!(frames.current, Some(0));

        ft.update(&mut frames, 0.3, &mut q);
        assert_eq!(frames.current, Some(1));
        ft.update(&mut frames, 0.3, &mut q);
        assert_eq!(frames.current, Some(2));
        ft.update(&mut frames, 0.2, &mut q);
        assert_eq!(frames.current, Some(3));
    }

    #[test]
    fn test_frame_tween_keeps_last_frame_after_completion() {
        let mut q = CallbackQueue::new();
        let mut frames = Frames {
            count: 4,
            current: None,
        };
        let mut ft = FrameTween::new();
        ft.start(
            &mut frames,
            TweenType::NoRepeat,
            1,
            1.0,
            Some(ActionCallback::new("f")),
        );
        ft.update(&mut frames, 0.9, &mut q);
        assert_eq!(frames.current, Some(3));
        assert!(ft.update(&mut frames, 0.5, &mut q));
        assert_eq!(frames.current, Some(3));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_frame_tween_reverse_walks_down() {
        let mut q = CallbackQueue::new();
        let mut frames = Frames {
            count: 5,
            current: None,
        };
        let mut ft = FrameTween::new();
        ft.start(&mut frames, TweenType::Reverse, 1, 1.0, None);
        // percent is 1.0 at the very start, so the first frame is set on update
        ft.update(&mut frames, 0.1, &mut q);
        assert_eq!(frames.current, Some(4));
        ft.update(&mut frames, 0.7, &mut q);
        assert_eq!(frames.current, Some(1));
    }

    // ==================== PROPERTY TWEEN ====================

    #[test]
    fn test_volume_fade_interpolates_linearly() {
        let mut q = CallbackQueue::new();
        let mut vol = Volume(1.0);
        let mut fade: MusicVolumeTween = PropertyTween::new(
            1.0,
            0.0,
            2.0,
            Interpolation::Linear,
            Some(ActionCallback::new("faded")),
        );
        fade.update(&mut vol, 0.5, &mut q);
        assert!(approx_eq(vol.0, 0.75));
        fade.update(&mut vol, 1.0, &mut q);
        assert!(approx_eq(vol.0, 0.25));
        assert!(fade.update(&mut vol, 1.0, &mut q));
        assert!(approx_eq(vol.0, 0.0));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_vec2_lerp() {
        let v = Vec2::lerp(Vec2::new(0.0, 10.0), Vec2::new(10.0, 0.0), 0.25);
        assert!(approx_eq(v.x, 2.5));
        assert!(approx_eq(v.y, 7.5));
    }

    #[test]
    fn test_property_tween_with_repeat_keeps_callback() {
        let mut q = CallbackQueue::new();
        let mut vol = Volume(0.0);
        let mut tw = PropertyTween::new(0.0, 1.0, 1.0, Interpolation::Linear, Some(ActionCallback::new("x")))
            .with_repeat(TweenType::Repeat, 2);
        tw.update(&mut vol, 1.5, &mut q);
        assert!(!tw.is_complete());
        assert!(approx_eq(vol.0, 0.5));
        tw.update(&mut vol, 0.5, &mut q);
        assert!(tw.is_complete());
        assert_eq!(q.len(), 1);
    }
}
