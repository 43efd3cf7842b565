//! Animation descriptors and directional lookup.
//!
//! An [`AnimationDesc`] is the authored description of one named animation:
//! which shared source it plays from, its playback speed divisor and its
//! default repeat policy. Renderers keep them in an [`AnimationTable`] keyed
//! by id.
//!
//! Ids may carry a direction suffix after a dot (`walk.frontleft`). Actors
//! rarely author every direction, so [`resolve`] substitutes the closest
//! authored variant, mirrored when needed.

use glam::Vec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::tween::{INFINITY, TweenType};

pub const FRONT: &str = "front";
pub const BACK: &str = "back";
pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";
pub const FRONTLEFT: &str = "frontleft";
pub const FRONTRIGHT: &str = "frontright";
pub const BACKLEFT: &str = "backleft";
pub const BACKRIGHT: &str = "backright";

/// Animation id -> descriptor.
pub type AnimationTable = FxHashMap<String, AnimationDesc>;

fn default_duration() -> f32 {
    1.0
}

fn default_animation_type() -> TweenType {
    TweenType::Repeat
}

fn default_count() -> i32 {
    INFINITY
}

fn default_true() -> bool {
    true
}

/// Static authored metadata of one animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationDesc {
    pub id: String,
    /// Shared resource key (skeleton file or atlas name).
    pub source: String,
    /// Atlas backing the source; defaults to the source name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atlas: Option<String>,
    /// Playback speed divisor, not seconds.
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default = "default_animation_type")]
    pub animation_type: TweenType,
    #[serde(default = "default_count")]
    pub count: i32,
    #[serde(default = "default_true")]
    pub preload: bool,
    #[serde(default)]
    pub dispose_when_played: bool,
}

impl AnimationDesc {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        AnimationDesc {
            id: id.into(),
            source: source.into(),
            atlas: None,
            duration: default_duration(),
            animation_type: default_animation_type(),
            count: default_count(),
            preload: true,
            dispose_when_played: false,
        }
    }

    pub fn with_atlas(mut self, atlas: impl Into<String>) -> Self {
        self.atlas = Some(atlas.into());
        self
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_repeat(mut self, animation_type: TweenType, count: i32) -> Self {
        self.animation_type = animation_type;
        self.count = count;
        self
    }

    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_dispose_when_played(mut self, dispose: bool) -> Self {
        self.dispose_when_played = dispose;
        self
    }

    /// Atlas key, falling back to the source name.
    pub fn atlas_key(&self) -> &str {
        self.atlas.as_deref().unwrap_or(&self.source)
    }
}

/// Mirror id: swaps a trailing `left` for `right` and vice versa.
///
/// Returns `None` when the id has no lateral component.
pub fn flip_id(id: &str) -> Option<String> {
    if let Some(base) = id.strip_suffix(LEFT) {
        Some(format!("{base}{RIGHT}"))
    } else {
        id.strip_suffix(RIGHT).map(|base| format!("{base}{LEFT}"))
    }
}

/// Split `walk.frontleft` into `("walk", Some("frontleft"))`.
pub fn split_direction(id: &str) -> (&str, Option<&str>) {
    match id.find('.') {
        Some(idx) => (&id[..idx], Some(&id[idx + 1..])),
        None => (id, None),
    }
}

fn lookup<'a>(table: &'a AnimationTable, id: &str) -> Option<(&'a AnimationDesc, bool)> {
    if let Some(desc) = table.get(id) {
        return Some((desc, false));
    }
    let flipped = flip_id(id)?;
    table.get(&flipped).map(|desc| (desc, true))
}

/// Resolve a requested id to an authored descriptor.
///
/// Returns the descriptor and whether it has to be drawn mirrored. Lookup
/// order:
/// 1. exact id, then its mirror
/// 2. diagonals fall back to `front`/`back`; plain `left`/`right` fall back
///    to `frontleft`/`frontright`; each followed by its mirror
/// 3. when step 2 landed on `front`/`back`, the pure lateral direction of
///    the request and its mirror
pub fn resolve<'a>(table: &'a AnimationTable, id: &str) -> Option<(&'a AnimationDesc, bool)> {
    if let Some(desc) = table.get(id) {
        return Some((desc, false));
    }

    let dot = id.rfind('.')?;
    let prefix = &id[..=dot];

    if let Some(found) = flip_id(id).and_then(|f| table.get(&f)) {
        return Some((found, true));
    }

    let fallback = if id.ends_with(FRONTLEFT) || id.ends_with(FRONTRIGHT) {
        format!("{prefix}{FRONT}")
    } else if id.ends_with(BACKLEFT) || id.ends_with(BACKRIGHT) {
        format!("{prefix}{BACK}")
    } else if id.ends_with(LEFT) {
        format!("{prefix}{FRONTLEFT}")
    } else if id.ends_with(RIGHT) {
        format!("{prefix}{FRONTRIGHT}")
    } else {
        return None;
    };

    if let Some(found) = lookup(table, &fallback) {
        return Some(found);
    }

    if fallback.ends_with(FRONT) || fallback.ends_with(BACK) {
        let lateral = if id.ends_with(LEFT) { LEFT } else { RIGHT };
        return lookup(table, &format!("{prefix}{lateral}"));
    }

    None
}

/// Number of directions authored for a base animation id.
///
/// 8 when `front`/`back` variants exist, 4 when only diagonals exist, 2 when
/// only lateral variants exist, 0 otherwise.
pub fn dirs(id: &str, table: &AnimationTable) -> u8 {
    let has = |dir: &str| table.contains_key(&format!("{id}.{dir}"));

    if has(FRONT) || has(BACK) {
        8
    } else if has(FRONTLEFT) || has(FRONTRIGHT) || has(BACKLEFT) || has(BACKRIGHT) {
        4
    } else if has(LEFT) || has(RIGHT) {
        2
    } else {
        0
    }
}

/// Direction suffix for travelling from `p0` to `pf` (y axis up).
pub fn direction_string(p0: Vec2, pf: Vec2, dirs: u8) -> Option<&'static str> {
    let d = pf - p0;
    let mut angle = d.y.atan2(d.x).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }

    match dirs {
        8 => {
            const SECTORS: [&str; 8] = [
                RIGHT, BACKRIGHT, BACK, BACKLEFT, LEFT, FRONTLEFT, FRONT, FRONTRIGHT,
            ];
            let idx = ((angle + 22.5) / 45.0) as usize % 8;
            Some(SECTORS[idx])
        }
        4 => {
            const QUADRANTS: [&str; 4] = [BACKRIGHT, BACKLEFT, FRONTLEFT, FRONTRIGHT];
            let idx = (angle / 90.0) as usize % 4;
            Some(QUADRANTS[idx])
        }
        2 => {
            if angle > 90.0 && angle < 270.0 {
                Some(LEFT)
            } else {
                Some(RIGHT)
            }
        }
        _ => None,
    }
}
