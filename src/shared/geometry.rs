//! Rectangles in root-window coordinates

/// Window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &Geometry) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    /// Top-left corner that centers a `width`x`height` box inside `self`
    pub fn center_of(&self, width: u32, height: u32) -> (i32, i32) {
        (
            self.x + (self.width as i32 - width as i32) / 2,
            self.y + (self.height as i32 - height as i32) / 2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let g = Geometry::new(10, 10, 100, 50);
        assert!(g.contains(10, 10));
        assert!(g.contains(109, 59));
        assert!(!g.contains(110, 20));
        assert!(!g.contains(20, 60));
    }

    #[test]
    fn test_intersects() {
        let a = Geometry::new(0, 0, 100, 100);
        assert!(a.intersects(&Geometry::new(50, 50, 100, 100)));
        assert!(!a.intersects(&Geometry::new(100, 0, 10, 10)));
    }

    #[test]
    fn test_center_of() {
        let screen = Geometry::new(0, 0, 1920, 1080);
        assert_eq!(screen.center_of(20, 10), (950, 535));
    }
}
