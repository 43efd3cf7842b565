//! Single-track animation playback over a [`Skeleton`].
//!
//! [`AnimationState::update`] only moves the track clock;
//! [`AnimationState::apply`] poses the skeleton and reports what happened
//! since the previous apply. Nothing is dispatched from here: callers decide
//! what a fired event or a completed loop means.

use std::sync::Arc;

use smallvec::SmallVec;

use super::data::{BoneTimeline, Clip, EventKey, SkeletonData};
use super::pose::Skeleton;
use crate::components::tween::Lerp;
use crate::error::{EngineError, Result};

/// Something that happened on the track during an apply.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// An event key was crossed.
    Event(EventKey),
    /// A loop boundary (looped clip) or the end (one-shot clip) was crossed.
    /// `loop_count` is the number of full cycles played so far.
    Complete { loop_count: i32 },
}

pub type StateEvents = SmallVec<[StateEvent; 4]>;

/// Whole cycles one apply walks through event by event.
const MAX_REPORTED_CYCLES: i64 = 8;

fn loop_count(cycles: i64) -> i32 {
    i32::try_from(cycles).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone)]
struct Track {
    clip: usize,
    looped: bool,
    track_time: f32,
    /// Track time of the previous apply; negative before the first one.
    last_time: f32,
}

#[derive(Debug, Clone)]
pub struct AnimationState {
    data: Arc<SkeletonData>,
    time_scale: f32,
    track: Option<Track>,
}

fn sample<T: Lerp>(keys: &[(f32, T)], time: f32) -> Option<T> {
    let (t0, v0) = *keys.first()?;
    if time <= t0 {
        return Some(v0);
    }
    let idx = keys.partition_point(|k| k.0 <= time);
    if idx >= keys.len() {
        return keys.last().map(|k| k.1);
    }
    let (ta, va) = keys[idx - 1];
    let (tb, vb) = keys[idx];
    let span = tb - ta;
    if span <= 0.0 {
        return Some(vb);
    }
    Some(T::lerp(va, vb, (time - ta) / span))
}

/// Pose `skeleton` at `time` seconds into `clip`, relative to the setup pose.
fn pose(clip: &Clip, skeleton: &mut Skeleton, time: f32) {
    let data = Arc::clone(skeleton.data());

    for timeline in &clip.bone_timelines {
        match timeline {
            BoneTimeline::Rotate { bone, keys } => {
                if let (Some(angle), Some(b)) = (sample(keys, time), skeleton.bone_mut(*bone)) {
                    b.rotation = data.bones[*bone].rotation + angle;
                }
            }
            BoneTimeline::Translate { bone, keys } => {
                if let (Some(offset), Some(b)) = (sample(keys, time), skeleton.bone_mut(*bone)) {
                    b.x = data.bones[*bone].x + offset.x;
                    b.y = data.bones[*bone].y + offset.y;
                }
            }
            BoneTimeline::Scale { bone, keys } => {
                if let (Some(factor), Some(b)) = (sample(keys, time), skeleton.bone_mut(*bone)) {
                    b.scale_x = data.bones[*bone].scale_x * factor.x;
                    b.scale_y = data.bones[*bone].scale_y * factor.y;
                }
            }
        }
    }

    for timeline in &clip.attachment_timelines {
        let idx = timeline.keys.partition_point(|k| k.0 <= time);
        let name = if idx == 0 {
            data.slots[timeline.slot].attachment.clone()
        } else {
            timeline.keys[idx - 1].1.clone()
        };
        skeleton.set_attachment(timeline.slot, name);
    }
}

impl AnimationState {
    pub fn new(data: Arc<SkeletonData>) -> Self {
        AnimationState {
            data,
            time_scale: 1.0,
            track: None,
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    /// Replace the track with clip `name` starting at time zero.
    pub fn set_animation(&mut self, name: &str, looped: bool) -> Result<()> {
        let clip = self
            .data
            .clip_index(name)
            .ok_or_else(|| EngineError::ClipNotFound(name.to_string()))?;
        self.track = Some(Track {
            clip,
            looped,
            track_time: 0.0,
            last_time: -1.0,
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.track = None;
    }

    pub fn current_clip(&self) -> Option<&Clip> {
        self.track.as_ref().map(|t| &self.data.clips[t.clip])
    }

    pub fn track_time(&self) -> Option<f32> {
        self.track.as_ref().map(|t| t.track_time)
    }

    /// Advance the track clock by `delta * time_scale`, never below zero.
    pub fn update(&mut self, delta: f32) {
        if let Some(track) = self.track.as_mut() {
            track.track_time = (track.track_time + delta * self.time_scale).max(0.0);
        }
    }

    /// Pose `skeleton` at the current track time.
    ///
    /// Reports events in `(last apply, now]` and every crossed completion, in
    /// time order. When time moved backwards nothing is reported.
    pub fn apply(&mut self, skeleton: &mut Skeleton) -> StateEvents {
        let mut out = StateEvents::new();
        let Some(track) = self.track.as_mut() else {
            return out;
        };
        let clip = &self.data.clips[track.clip];
        let duration = clip.duration;
        let now = track.track_time;
        let last = track.last_time;

        let time = if track.looped && duration > 0.0 {
            now % duration
        } else {
            now.min(duration)
        };
        pose(clip, skeleton, time);

        if now > last {
            if track.looped && duration > 0.0 {
                let mut first_cycle = if last < 0.0 {
                    0
                } else {
                    (last / duration).floor() as i64
                };
                let last_cycle = (now / duration).floor() as i64;
                // Cycles skipped whole by one large step collapse into a
                // single completion; only the cycle playing now reports events.
                if last_cycle - first_cycle > MAX_REPORTED_CYCLES {
                    out.push(StateEvent::Complete {
                        loop_count: loop_count(last_cycle),
                    });
                    first_cycle = last_cycle;
                }
                for cycle in first_cycle..=last_cycle {
                    let base = cycle as f32 * duration;
                    for ev in &clip.events {
                        let at = base + ev.time;
                        if at > last && at <= now {
                            out.push(StateEvent::Event(ev.clone()));
                        }
                    }
                    let boundary = base + duration;
                    if boundary > last && boundary <= now {
                        out.push(StateEvent::Complete {
                            loop_count: loop_count(cycle + 1),
                        });
                    }
                }
            } else {
                for ev in &clip.events {
                    if ev.time > last && ev.time <= now {
                        out.push(StateEvent::Event(ev.clone()));
                    }
                }
                if now >= duration && last < duration {
                    out.push(StateEvent::Complete { loop_count: 1 });
                }
            }
        }

        track.last_time = now;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::data::tests::{figure_atlas, figure_file};

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn setup() -> (Skeleton, AnimationState) {
        let data = Arc::new(
            SkeletonData::build("figure", &figure_file(), &figure_atlas(), 1.0).unwrap(),
        );
        (Skeleton::new(Arc::clone(&data)), AnimationState::new(data))
    }

    fn event_names(events: &StateEvents) -> Vec<String> {
        events
            .iter()
            .map(|e| match e {
                StateEvent::Event(k) => k.name.clone(),
                StateEvent::Complete { loop_count } => format!("complete{}", loop_count),
            })
            .collect()
    }

    #[test]
    fn test_unknown_clip() {
        let (_, mut state) = setup();
        assert!(matches!(
            state.set_animation("fly", true),
            Err(EngineError::ClipNotFound(_))
        ));
    }

    #[test]
    fn test_pose_interpolates_translate() {
        let (mut sk, mut state) = setup();
        state.set_animation("walk", true).unwrap();
        state.update(1.0);
        state.apply(&mut sk);
        let torso = sk.data().bone_index("torso").unwrap();
        assert!(approx_eq(sk.bones()[torso].x, 10.0));
        assert_eq!(sk.attachment(0), Some("body_alt"));
    }

    #[test]
    fn test_one_shot_events_and_single_completion() {
        let (mut sk, mut state) = setup();
        state.set_animation("walk", false).unwrap();
        assert!(state.apply(&mut sk).is_empty());

        state.update(0.6);
        assert_eq!(event_names(&state.apply(&mut sk)), vec!["door"]);

        state.update(2.0);
        assert_eq!(event_names(&state.apply(&mut sk)), vec!["complete1"]);

        state.update(1.0);
        assert!(state.apply(&mut sk).is_empty());
    }

    #[test]
    fn test_looped_reports_every_cycle() {
        let (mut sk, mut state) = setup();
        state.set_animation("walk", true).unwrap();
        state.apply(&mut sk);
        state.update(4.75);
        assert_eq!(
            event_names(&state.apply(&mut sk)),
            vec!["door", "complete1", "door", "complete2", "door"]
        );
    }

    #[test]
    fn test_time_scale_speeds_up_clock() {
        let (mut sk, mut state) = setup();
        state.set_time_scale(2.0);
        state.set_animation("wave", false).unwrap();
        state.update(0.5);
        assert!(approx_eq(state.track_time().unwrap(), 1.0));
        let events = state.apply(&mut sk);
        assert_eq!(event_names(&events), vec!["step", "complete1"]);
    }

    #[test]
    fn test_backwards_time_reports_nothing() {
        let (mut sk, mut state) = setup();
        state.set_animation("walk", false).unwrap();
        state.update(1.5);
        state.apply(&mut sk);
        state.update(-1.2);
        assert!(state.apply(&mut sk).is_empty());
        let torso = sk.data().bone_index("torso").unwrap();
        assert!(approx_eq(sk.bones()[torso].x, 3.0));
    }

    #[test]
    fn test_clock_never_negative() {
        let (_, mut state) = setup();
        state.set_animation("walk", false).unwrap();
        state.update(-5.0);
        assert_eq!(state.track_time(), Some(0.0));
    }

    #[test]
    fn test_huge_step_collapses_skipped_cycles() {
        let (mut sk, mut state) = setup();
        state.set_animation("walk", true).unwrap();
        state.update(1000.25);
        let events = state.apply(&mut sk);
        assert_eq!(event_names(&events), vec!["complete500"]);

        state.update(1.0e7);
        let events = state.apply(&mut sk);
        assert!(events.len() <= 3);
        assert_eq!(events[0], StateEvent::Complete { loop_count: 5_000_500 });
    }
}
