//! Skeleton data files and their validated runtime form.
//!
//! [`SkeletonFile`] mirrors the JSON written by the authoring tools. It is
//! turned into an immutable [`SkeletonData`] with [`SkeletonData::build`],
//! which resolves names to indices, applies the global asset scale, checks
//! region attachments against the texture atlas and sorts every timeline.

use std::collections::BTreeMap;

use glam::{Affine2, Vec2};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::resources::assets::TextureAtlas;

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkeletonFile {
    #[serde(default)]
    pub bones: Vec<BoneFile>,
    #[serde(default)]
    pub slots: Vec<SlotFile>,
    /// slot name -> attachment name -> attachment
    #[serde(default)]
    pub attachments: FxHashMap<String, FxHashMap<String, AttachmentFile>>,
    #[serde(default)]
    pub events: FxHashMap<String, EventFile>,
    #[serde(default)]
    pub animations: BTreeMap<String, ClipFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoneFile {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "one")]
    pub scale_x: f32,
    #[serde(default = "one")]
    pub scale_y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotFile {
    pub name: String,
    pub bone: String,
    #[serde(default)]
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttachmentFile {
    #[serde(rename_all = "camelCase")]
    Region {
        /// Atlas region name; defaults to the attachment name.
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
        #[serde(default)]
        rotation: f32,
        #[serde(default = "one")]
        scale_x: f32,
        #[serde(default = "one")]
        scale_y: f32,
        width: f32,
        height: f32,
    },
    BoundingBox {
        /// Flat `[x0, y0, x1, y1, ...]` list in bone space.
        vertices: Vec<f32>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFile {
    #[serde(default)]
    pub int: i32,
    #[serde(default)]
    pub string: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipFile {
    #[serde(default)]
    pub bones: FxHashMap<String, BoneTimelinesFile>,
    #[serde(default)]
    pub slots: FxHashMap<String, SlotTimelinesFile>,
    #[serde(default)]
    pub events: Vec<EventKeyFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoneTimelinesFile {
    #[serde(default)]
    pub rotate: Vec<RotateKey>,
    #[serde(default)]
    pub translate: Vec<TranslateKey>,
    #[serde(default)]
    pub scale: Vec<ScaleKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateKey {
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub angle: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateKey {
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleKey {
    #[serde(default)]
    pub time: f32,
    #[serde(default = "one")]
    pub x: f32,
    #[serde(default = "one")]
    pub y: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotTimelinesFile {
    #[serde(default)]
    pub attachment: Vec<AttachmentKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentKey {
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventKeyFile {
    #[serde(default)]
    pub time: f32,
    pub name: String,
    /// Overrides the event's default integer.
    #[serde(default)]
    pub int: Option<i32>,
    /// Overrides the event's default string.
    #[serde(default)]
    pub string: Option<String>,
}

// ---------------------------------------------------------------------------
// Runtime data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BoneData {
    pub name: String,
    pub parent: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

#[derive(Debug, Clone)]
pub struct RegionAttachment {
    pub region: String,
    /// Placement of the region relative to its bone.
    pub offset: Affine2,
    pub width: f32,
    pub height: f32,
}

impl RegionAttachment {
    /// Quad corners in bone space: bottom-left, top-left, top-right,
    /// bottom-right.
    pub fn local_corners(&self) -> [Vec2; 4] {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        [
            Vec2::new(-hw, -hh),
            Vec2::new(-hw, hh),
            Vec2::new(hw, hh),
            Vec2::new(hw, -hh),
        ]
        .map(|p| self.offset.transform_point2(p))
    }
}

#[derive(Debug, Clone)]
pub enum Attachment {
    Region(RegionAttachment),
    BoundingBox(Vec<Vec2>),
}

#[derive(Debug, Clone)]
pub struct SlotData {
    pub name: String,
    pub bone: usize,
    pub attachment: Option<String>,
    pub attachments: FxHashMap<String, Attachment>,
}

/// An event as it fires: `name` is the event name, `int` and `string` its
/// payload after key overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct EventKey {
    pub time: f32,
    pub name: String,
    pub int: i32,
    pub string: String,
}

#[derive(Debug, Clone)]
pub enum BoneTimeline {
    Rotate { bone: usize, keys: Vec<(f32, f32)> },
    Translate { bone: usize, keys: Vec<(f32, Vec2)> },
    Scale { bone: usize, keys: Vec<(f32, Vec2)> },
}

#[derive(Debug, Clone)]
pub struct AttachmentTimeline {
    pub slot: usize,
    pub keys: Vec<(f32, Option<String>)>,
}

/// One named animation of a skeleton.
#[derive(Debug, Clone)]
pub struct Clip {
    pub name: String,
    /// Time of the last key of any timeline.
    pub duration: f32,
    pub bone_timelines: Vec<BoneTimeline>,
    pub attachment_timelines: Vec<AttachmentTimeline>,
    /// Sorted by time.
    pub events: Vec<EventKey>,
}

/// Validated, immutable skeleton shared by every actor using a source.
#[derive(Debug, Clone)]
pub struct SkeletonData {
    pub name: String,
    pub bones: Vec<BoneData>,
    pub slots: Vec<SlotData>,
    pub clips: Vec<Clip>,
}

fn invalid(key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::InvalidSkeleton {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn sorted<T>(mut keys: Vec<(f32, T)>) -> Vec<(f32, T)> {
    keys.sort_by(|a, b| a.0.total_cmp(&b.0));
    keys
}

impl SkeletonData {
    /// Validate `file` against `atlas` and scale every length by `scale`.
    pub fn build(key: &str, file: &SkeletonFile, atlas: &TextureAtlas, scale: f32) -> Result<Self> {
        let mut bone_index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut bones = Vec::with_capacity(file.bones.len());

        for bone in &file.bones {
            let parent = match &bone.parent {
                Some(p) => Some(*bone_index.get(p.as_str()).ok_or_else(|| {
                    invalid(key, format!("bone '{}' has unknown parent '{}'", bone.name, p))
                })?),
                None => None,
            };
            if bone_index.insert(&bone.name, bones.len()).is_some() {
                return Err(invalid(key, format!("duplicate bone '{}'", bone.name)));
            }
            bones.push(BoneData {
                name: bone.name.clone(),
                parent,
                x: bone.x * scale,
                y: bone.y * scale,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
            });
        }

        let mut slot_index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut slots = Vec::with_capacity(file.slots.len());

        for slot in &file.slots {
            let bone = *bone_index.get(slot.bone.as_str()).ok_or_else(|| {
                invalid(key, format!("slot '{}' uses unknown bone '{}'", slot.name, slot.bone))
            })?;

            let mut attachments = FxHashMap::default();
            if let Some(authored) = file.attachments.get(&slot.name) {
                for (name, att) in authored {
                    attachments.insert(name.clone(), build_attachment(key, name, att, atlas, scale)?);
                }
            }
            if let Some(setup) = &slot.attachment
                && !attachments.contains_key(setup)
            {
                return Err(invalid(
                    key,
                    format!("slot '{}' sets up missing attachment '{}'", slot.name, setup),
                ));
            }

            slot_index.insert(&slot.name, slots.len());
            slots.push(SlotData {
                name: slot.name.clone(),
                bone,
                attachment: slot.attachment.clone(),
                attachments,
            });
        }

        let mut clips = Vec::with_capacity(file.animations.len());
        for (name, clip) in &file.animations {
            clips.push(build_clip(key, name, clip, file, &bone_index, &slot_index, &slots, scale)?);
        }

        Ok(SkeletonData {
            name: key.to_string(),
            bones,
            slots,
            clips,
        })
    }

    pub fn clip(&self, name: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.name == name)
    }

    pub fn clip_index(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name == name)
    }

    pub fn clip_names(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.name.clone()).collect()
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

fn build_attachment(
    key: &str,
    name: &str,
    att: &AttachmentFile,
    atlas: &TextureAtlas,
    scale: f32,
) -> Result<Attachment> {
    match att {
        AttachmentFile::Region {
            path,
            x,
            y,
            rotation,
            scale_x,
            scale_y,
            width,
            height,
        } => {
            let region = path.clone().unwrap_or_else(|| name.to_string());
            if atlas.region(&region).is_none() {
                return Err(invalid(key, format!("region '{}' not found in atlas", region)));
            }
            Ok(Attachment::Region(RegionAttachment {
                region,
                offset: Affine2::from_scale_angle_translation(
                    Vec2::new(*scale_x, *scale_y),
                    rotation.to_radians(),
                    Vec2::new(*x, *y) * scale,
                ),
                width: width * scale,
                height: height * scale,
            }))
        }
        AttachmentFile::BoundingBox { vertices } => {
            if vertices.len() % 2 != 0 || vertices.len() < 6 {
                return Err(invalid(
                    key,
                    format!("bounding box '{}' needs at least 3 vertex pairs", name),
                ));
            }
            Ok(Attachment::BoundingBox(
                vertices
                    .chunks_exact(2)
                    .map(|p| Vec2::new(p[0], p[1]) * scale)
                    .collect(),
            ))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_clip(
    key: &str,
    name: &str,
    clip: &ClipFile,
    file: &SkeletonFile,
    bone_index: &FxHashMap<&str, usize>,
    slot_index: &FxHashMap<&str, usize>,
    slots: &[SlotData],
    scale: f32,
) -> Result<Clip> {
    let mut duration: f32 = 0.0;
    let mut bone_timelines = Vec::new();
    let mut attachment_timelines = Vec::new();
    let mut events = Vec::new();

    for (bone_name, timelines) in &clip.bones {
        let bone = *bone_index.get(bone_name.as_str()).ok_or_else(|| {
            invalid(key, format!("clip '{}' animates unknown bone '{}'", name, bone_name))
        })?;

        if !timelines.rotate.is_empty() {
            let keys = sorted(timelines.rotate.iter().map(|k| (k.time, k.angle)).collect());
            duration = duration.max(keys.last().map_or(0.0, |k| k.0));
            bone_timelines.push(BoneTimeline::Rotate { bone, keys });
        }
        if !timelines.translate.is_empty() {
            let keys = sorted(
                timelines
                    .translate
                    .iter()
                    .map(|k| (k.time, Vec2::new(k.x, k.y) * scale))
                    .collect(),
            );
            duration = duration.max(keys.last().map_or(0.0, |k| k.0));
            bone_timelines.push(BoneTimeline::Translate { bone, keys });
        }
        if !timelines.scale.is_empty() {
            let keys = sorted(
                timelines
                    .scale
                    .iter()
                    .map(|k| (k.time, Vec2::new(k.x, k.y)))
                    .collect(),
            );
            duration = duration.max(keys.last().map_or(0.0, |k| k.0));
            bone_timelines.push(BoneTimeline::Scale { bone, keys });
        }
    }

    for (slot_name, timelines) in &clip.slots {
        let slot = *slot_index.get(slot_name.as_str()).ok_or_else(|| {
            invalid(key, format!("clip '{}' animates unknown slot '{}'", name, slot_name))
        })?;
        if timelines.attachment.is_empty() {
            continue;
        }
        for k in &timelines.attachment {
            if let Some(att) = &k.name
                && !slots[slot].attachments.contains_key(att)
            {
                return Err(invalid(
                    key,
                    format!("clip '{}' shows missing attachment '{}'", name, att),
                ));
            }
        }
        let keys = sorted(
            timelines
                .attachment
                .iter()
                .map(|k| (k.time, k.name.clone()))
                .collect(),
        );
        duration = duration.max(keys.last().map_or(0.0, |k| k.0));
        attachment_timelines.push(AttachmentTimeline { slot, keys });
    }

    for ev in &clip.events {
        let data = file.events.get(&ev.name).ok_or_else(|| {
            invalid(key, format!("clip '{}' fires undefined event '{}'", name, ev.name))
        })?;
        duration = duration.max(ev.time);
        events.push(EventKey {
            time: ev.time,
            name: ev.name.clone(),
            int: ev.int.unwrap_or(data.int),
            string: ev
                .string
                .clone()
                .or_else(|| data.string.clone())
                .unwrap_or_default(),
        });
    }
    events.sort_by(|a, b| a.time.total_cmp(&b.time));

    Ok(Clip {
        name: name.to_string(),
        duration,
        bone_timelines,
        attachment_timelines,
        events,
    })
}
