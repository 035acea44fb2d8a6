use bytemuck::{Pod, Zeroable};

/// Linear RGBA color.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Scales the color channels, leaving alpha alone.
    #[inline]
    pub fn scaled(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k, self.a)
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

/// Axis-aligned rectangle (top-left origin).
///
/// In the overlay pass units are logical pixels. In the geometry and post-process passes
/// the same units are used, with `depth` on [`Quad`] placing the rectangle in the scene.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, px: f32, py: f32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.w && py < self.y + self.h
    }
}

/// Viewport size in logical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Solid quad submitted by draw listeners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub rect: Rect,
    pub color: Color,
    /// Depth in [0, 1]; 0 is nearest. Only meaningful in the geometry pass.
    pub depth: f32,
}

impl Quad {
    pub fn new(rect: Rect, color: Color) -> Self {
        Self { rect, color, depth: 0.5 }
    }

    pub fn at_depth(mut self, depth: f32) -> Self {
        self.depth = depth.clamp(0.0, 1.0);
        self
    }
}

/// Omni light accumulated into the light buffer.
///
/// `position` is in viewport pixels for x/y and depth units for z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub position: [f32; 3],
    pub color: Color,
    pub radius: f32,
    pub intensity: f32,
}

impl PointLight {
    pub fn new(position: [f32; 3], color: Color, radius: f32) -> Self {
        Self { position, color, radius, intensity: 1.0 }
    }
}

/// Infinitely distant light; contributes to every lit pixel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: [f32; 3],
    pub color: Color,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: [f32; 3], color: Color) -> Self {
        Self { direction, color, intensity: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(9.9, 9.9));
        assert!(!r.contains(10.0, 10.0));
        assert!(!r.contains(-0.1, 5.0));
    }

    #[test]
    fn quad_depth_is_clamped() {
        let q = Quad::new(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE).at_depth(3.0);
        assert_eq!(q.depth, 1.0);
    }

    #[test]
    fn scaled_keeps_alpha() {
        let c = Color::new(0.5, 0.25, 1.0, 0.5).scaled(2.0);
        assert_eq!(c, Color::new(1.0, 0.5, 2.0, 0.5));
    }
}
