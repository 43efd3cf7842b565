//! Posed skeleton instance.

use std::sync::Arc;

use glam::{Affine2, Vec2};

use super::data::{Attachment, SkeletonData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub world: Affine2,
}

/// Axis-aligned extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Bounds> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let (min, max) = it.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Bounds { min, max })
    }
}

/// A region attachment placed in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionQuad {
    pub slot: String,
    pub region: String,
    pub corners: [Vec2; 4],
}

/// Mutable pose of a [`SkeletonData`].
#[derive(Debug, Clone)]
pub struct Skeleton {
    data: Arc<SkeletonData>,
    bones: Vec<Bone>,
    /// Active attachment name per slot.
    slots: Vec<Option<String>>,
    flip_x: bool,
    position: Vec2,
}

impl Skeleton {
    pub fn new(data: Arc<SkeletonData>) -> Self {
        let mut skeleton = Skeleton {
            bones: Vec::with_capacity(data.bones.len()),
            slots: Vec::with_capacity(data.slots.len()),
            data,
            flip_x: false,
            position: Vec2::ZERO,
        };
        skeleton.set_to_setup_pose();
        skeleton.update_world_transform();
        skeleton
    }

    pub fn data(&self) -> &Arc<SkeletonData> {
        &self.data
    }

    pub fn set_to_setup_pose(&mut self) {
        self.bones.clear();
        self.bones.extend(self.data.bones.iter().map(|b| Bone {
            x: b.x,
            y: b.y,
            rotation: b.rotation,
            scale_x: b.scale_x,
            scale_y: b.scale_y,
            world: Affine2::IDENTITY,
        }));
        self.slots.clear();
        self.slots
            .extend(self.data.slots.iter().map(|s| s.attachment.clone()));
    }

    pub fn set_flip_x(&mut self, flip: bool) {
        self.flip_x = flip;
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    pub fn attachment(&self, slot: usize) -> Option<&str> {
        self.slots.get(slot).and_then(|s| s.as_deref())
    }

    pub fn set_attachment(&mut self, slot: usize, name: Option<String>) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = name;
        }
    }

    /// Recompute bone world transforms. Parents always precede children.
    pub fn update_world_transform(&mut self) {
        let flip = if self.flip_x { -1.0 } else { 1.0 };
        let root = Affine2::from_translation(self.position) * Affine2::from_scale(Vec2::new(flip, 1.0));

        for i in 0..self.bones.len() {
            let b = self.bones[i];
            let local = Affine2::from_scale_angle_translation(
                Vec2::new(b.scale_x, b.scale_y),
                b.rotation.to_radians(),
                Vec2::new(b.x, b.y),
            );
            let parent = match self.data.bones[i].parent {
                Some(p) => self.bones[p].world,
                None => root,
            };
            self.bones[i].world = parent * local;
        }
    }

    fn active_attachments(&self) -> impl Iterator<Item = (usize, &Attachment)> {
        self.data.slots.iter().enumerate().filter_map(|(i, slot)| {
            let name = self.slots[i].as_deref()?;
            slot.attachments.get(name).map(|a| (i, a))
        })
    }

    /// World-space quads of every visible region attachment in slot order.
    pub fn region_quads(&self) -> Vec<RegionQuad> {
        self.active_attachments()
            .filter_map(|(i, att)| match att {
                Attachment::Region(region) => {
                    let world = self.bones[self.data.slots[i].bone].world;
                    Some(RegionQuad {
                        slot: self.data.slots[i].name.clone(),
                        region: region.region.clone(),
                        corners: region.local_corners().map(|p| world.transform_point2(p)),
                    })
                }
                Attachment::BoundingBox(_) => None,
            })
            .collect()
    }

    /// Extents of the visible bounding-box attachments.
    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<Vec2> = self
            .active_attachments()
            .filter_map(|(i, att)| match att {
                Attachment::BoundingBox(vertices) => {
                    let world = self.bones[self.data.slots[i].bone].world;
                    Some(vertices.iter().map(move |v| world.transform_point2(*v)))
                }
                Attachment::Region(_) => None,
            })
            .flatten()
            .collect();
        Bounds::from_points(points)
    }

    /// Extents of the visible region quads.
    pub fn region_extents(&self) -> Option<Bounds> {
        Bounds::from_points(self.region_quads().into_iter().flat_map(|q| q.corners))
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

    fn figure() -> Skeleton {
        let data = SkeletonData::build("figure", &figure_file(), &figure_atlas(), 1.0).unwrap();
        Skeleton::new(Arc::new(data))
    }

    #[test]
    fn test_setup_pose_world_transform() {
        let sk = figure();
        let torso = sk.bones()[1].world.translation;
        assert!(approx_eq(torso.x, 0.0));
        assert!(approx_eq(torso.y, 50.0));
    }

    #[test]
    fn test_region_quads_follow_bones() {
        let mut sk = figure();
        sk.set_position(Vec2::new(100.0, 0.0));
        sk.update_world_transform();
        let quads = sk.region_quads();
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].region, "body");
        let ext = sk.region_extents().unwrap();
        assert!(approx_eq(ext.min.x, 80.0));
        assert!(approx_eq(ext.max.x, 120.0));
        assert!(approx_eq(ext.min.y, 0.0));
        assert!(approx_eq(ext.max.y, 100.0));
    }

    #[test]
    fn test_bounds_from_bounding_box() {
        let sk = figure();
        let b = sk.bounds().unwrap();
        assert!(approx_eq(b.width(), 60.0));
        assert!(approx_eq(b.height(), 120.0));
    }

    #[test]
    fn test_flip_mirrors_horizontally() {
        let mut sk = figure();
        let torso_index = sk.data().bone_index("torso").unwrap();
        sk.bone_mut(torso_index).unwrap().x = 10.0;
        sk.update_world_transform();
        assert!(approx_eq(sk.bones()[torso_index].world.translation.x, 10.0));
        sk.set_flip_x(true);
        sk.update_world_transform();
        assert!(approx_eq(sk.bones()[torso_index].world.translation.x, -10.0));
    }

    #[test]
    fn test_hidden_attachment_has_no_quad() {
        let mut sk = figure();
        sk.set_attachment(0, None);
        assert!(sk.region_quads().is_empty());
        assert!(sk.region_extents().is_none());
    }
}
