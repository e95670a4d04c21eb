/// Sprites, the draw surface, and the collision capability.
///
/// A sprite is an ASCII mask: `' '` and `'.'` are transparent, every other
/// char is an opaque pixel (and the glyph the terminal draws for it).
/// One pixel is one world unit. A sprite's origin is its bottom-left
/// corner; rows are stored top-first as written in the sheet file.
///
/// Collision has two phases:
///   1. `boxes_overlap` : cheap AABB test on interaction boxes
///   2. `pixels_overlap`: opaque-mask intersection of the displayed sprites

use std::collections::HashMap;

use glam::Vec2;

use super::geometry::Aabb;
use crate::error::DefinitionError;

pub type SpriteId = usize;

#[derive(Clone, Debug)]
pub struct Sprite {
    width: usize,
    height: usize,
    rows: Vec<Vec<char>>,
}

impl Sprite {
    /// Short rows are padded with transparent pixels.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Option<Self> {
        let rows: Vec<Vec<char>> = rows.iter().map(|r| r.as_ref().chars().collect()).collect();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            return None;
        }
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, ' ');
                r
            })
            .collect::<Vec<_>>();
        Some(Sprite { width, height: rows.len(), rows })
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    /// Opaque glyph at sprite-local `(px, py)`, y-up from the bottom row.
    pub fn pixel(&self, px: i32, py: i32, mirrored: bool) -> Option<char> {
        if px < 0 || py < 0 || px as usize >= self.width || py as usize >= self.height {
            return None;
        }
        let col = if mirrored { self.width - 1 - px as usize } else { px as usize };
        let row = self.height - 1 - py as usize;
        match self.rows[row][col] {
            ' ' | '.' => None,
            c => Some(c),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Spritesheet {
    name: String,
    sprites: Vec<Sprite>,
}

impl Spritesheet {
    pub fn new(name: impl Into<String>, sprites: Vec<Sprite>) -> Result<Self, DefinitionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DefinitionError::EmptyName { kind: "spritesheet" });
        }
        Ok(Spritesheet { name, sprites })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn len(&self) -> usize { self.sprites.len() }
    pub fn is_empty(&self) -> bool { self.sprites.is_empty() }
    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> { self.sprites.get(id) }
}

#[derive(Clone, Debug, Default)]
pub struct SpriteAtlas {
    sheets: HashMap<String, Spritesheet>,
}

impl SpriteAtlas {
    pub fn new() -> Self {
        SpriteAtlas::default()
    }

    pub fn insert(&mut self, sheet: Spritesheet) {
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Spritesheet> {
        self.sheets.get(name)
    }

    pub fn sprite(&self, sheet: &str, id: SpriteId) -> Option<&Sprite> {
        self.sheets.get(sheet).and_then(|s| s.sprite(id))
    }
}

/// A sprite as currently displayed at a world position.
#[derive(Clone, Copy, Debug)]
pub struct SpriteSubject<'a> {
    pub position: Vec2,
    pub sheet: &'a str,
    pub sprite: SpriteId,
    pub mirrored: bool,
}

/// Something sprites can be drawn onto.
pub trait Surface {
    fn draw_sprite(&mut self, subject: &SpriteSubject);
}

pub trait Collision {
    fn boxes_overlap(&self, a: &Aabb, b: &Aabb) -> bool;
    fn pixels_overlap(&self, a: &SpriteSubject, b: &SpriteSubject) -> bool;
}

impl Collision for SpriteAtlas {
    fn boxes_overlap(&self, a: &Aabb, b: &Aabb) -> bool {
        a.overlaps(b)
    }

    fn pixels_overlap(&self, a: &SpriteSubject, b: &SpriteSubject) -> bool {
        let (sa, sb) = match (self.sprite(a.sheet, a.sprite), self.sprite(b.sheet, b.sprite)) {
            (Some(sa), Some(sb)) => (sa, sb),
            _ => return false,
        };

        let (ax, ay) = (a.position.x.round() as i32, a.position.y.round() as i32);
        let (bx, by) = (b.position.x.round() as i32, b.position.y.round() as i32);

        let x0 = ax.max(bx);
        let x1 = (ax + sa.width as i32).min(bx + sb.width as i32);
        let y0 = ay.max(by);
        let y1 = (ay + sa.height as i32).min(by + sb.height as i32);

        for wy in y0..y1 {
            for wx in x0..x1 {
                if sa.pixel(wx - ax, wy - ay, a.mirrored).is_some()
                    && sb.pixel(wx - bx, wy - by, b.mirrored).is_some()
                {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas() -> SpriteAtlas {
        let mut atlas = SpriteAtlas::new();
        let ring = Sprite::from_rows(&["###", "#.#", "###"]).unwrap();
        let flag = Sprite::from_rows(&["#  ", "#  "]).unwrap();
        let dot = Sprite::from_rows(&["#"]).unwrap();
        atlas.insert(Spritesheet::new("test", vec![ring, flag, dot]).unwrap());
        atlas
    }

    fn subject(sprite: SpriteId, x: f32, y: f32, mirrored: bool) -> SpriteSubject<'static> {
        SpriteSubject { position: Vec2::new(x, y), sheet: "test", sprite, mirrored }
    }

    #[test]
    fn pixel_lookup_is_y_up() {
        let s = Sprite::from_rows(&["a ", "bc"]).unwrap();
        assert_eq!(s.pixel(0, 0, false), Some('b'));
        assert_eq!(s.pixel(1, 0, false), Some('c'));
        assert_eq!(s.pixel(0, 1, false), Some('a'));
        assert_eq!(s.pixel(1, 1, false), None);
        assert_eq!(s.pixel(0, 0, true), Some('c'));
        assert_eq!(s.pixel(5, 0, false), None);
    }

    #[test]
    fn empty_sprite_rejected() {
        assert!(Sprite::from_rows::<&str>(&[]).is_none());
        assert!(Sprite::from_rows(&[""]).is_none());
    }

    #[test]
    fn overlapping_opaque_pixels_collide() {
        let a = atlas();
        assert!(a.pixels_overlap(&subject(0, 0.0, 0.0, false), &subject(0, 2.0, 2.0, false)));
    }

    #[test]
    fn transparent_hole_does_not_collide() {
        let a = atlas();
        // The dot sits exactly in the ring's transparent centre.
        assert!(!a.pixels_overlap(&subject(0, 0.0, 0.0, false), &subject(2, 1.0, 1.0, false)));
        // Boxes overlap all the same.
        let ring = Aabb { min: Vec2::ZERO, max: Vec2::new(3.0, 3.0) };
        let dot = Aabb { min: Vec2::new(1.0, 1.0), max: Vec2::new(2.0, 2.0) };
        assert!(a.boxes_overlap(&ring, &dot));
    }

    #[test]
    fn mirroring_moves_pixels() {
        let a = atlas();
        let ring = subject(0, 0.0, 0.0, false);
        // Unmirrored, the mast sits left of the ring.
        assert!(!a.pixels_overlap(&ring, &subject(1, -1.0, 1.0, false)));
        // Mirrored, it moves two columns right into the ring's top row.
        assert!(a.pixels_overlap(&ring, &subject(1, -1.0, 1.0, true)));
    }

    #[test]
    fn unknown_sprite_never_collides() {
        let a = atlas();
        assert!(!a.pixels_overlap(&subject(0, 0.0, 0.0, false), &subject(9, 0.0, 0.0, false)));
    }
}
