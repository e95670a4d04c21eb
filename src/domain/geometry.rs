/// Axis-aligned boxes in a y-up world.
///
/// `Rect` is a local-space box stored in a definition (offset from an
/// owner's origin). `Aabb` is the same box placed in the world.

use glam::Vec2;

use crate::error::DefinitionError;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    /// Zero-area boxes are allowed; negative extents are not.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self, DefinitionError> {
        if w < 0.0 || h < 0.0 {
            return Err(DefinitionError::NegativeBox { w, h });
        }
        Ok(Rect { x, y, w, h })
    }

    /// Place the box relative to a world origin.
    pub fn at(&self, origin: Vec2) -> Aabb {
        let min = origin + Vec2::new(self.x, self.y);
        Aabb { min, max: min + Vec2::new(self.w, self.h) }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Inclusive test: boxes that share an edge overlap.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_box_is_rejected() {
        assert!(Rect::new(0.0, 0.0, -1.0, 2.0).is_err());
        assert!(Rect::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn rect_is_placed_at_origin() {
        let r = Rect::new(-1.0, 2.0, 4.0, 3.0).unwrap();
        let b = r.at(Vec2::new(10.0, 10.0));
        assert_eq!(b.min, Vec2::new(9.0, 12.0));
        assert_eq!(b.max, Vec2::new(13.0, 15.0));
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0).unwrap().at(Vec2::ZERO);
        let b = Rect::new(2.0, 0.0, 2.0, 2.0).unwrap().at(Vec2::ZERO);
        let c = Rect::new(2.5, 0.0, 2.0, 2.0).unwrap().at(Vec2::ZERO);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
