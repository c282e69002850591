//! 2D canvas rendering
//!
//! The game only issues draw calls through [`Surface`]; the host owns the
//! canvas element and its sizing. On wasm the surface is the browser's
//! `CanvasRenderingContext2d`.

#[cfg(target_arch = "wasm32")]
pub mod canvas;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;

use glam::Vec2;

use crate::sim::{BubbleNode, Scene, SkillLevel};

/// RGBA color, alpha in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BACKGROUND: Color = Color::rgb(8, 10, 24);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_css(&self) -> String {
        format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
    }
}

/// Bubble fill color per skill level
pub fn skill_color(level: SkillLevel) -> Color {
    match level {
        SkillLevel::Novice => Color::rgb(110, 200, 255),
        SkillLevel::Intermediate => Color::rgb(120, 230, 170),
        SkillLevel::Confident => Color::rgb(250, 210, 100),
        SkillLevel::Expert => Color::rgb(250, 140, 90),
        SkillLevel::Master => Color::rgb(210, 120, 250),
    }
}

/// Minimal drawing API the game needs
pub trait Surface {
    fn clear(&mut self, width: f32, height: f32, color: Color);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: Vec2);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn fill_radial_gradient(&mut self, center: Vec2, radius: f32, inner: Color, outer: Color);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, line_width: f32, color: Color);
    fn fill_text(&mut self, text: &str, pos: Vec2, size_px: f32, color: Color);
}

/// Hidden bubbles are barely visible
const HIDDEN_ALPHA: f32 = 0.06;
/// Names are only drawn on bubbles at least this large
const LABEL_MIN_RADIUS: f32 = 22.0;

/// Draw one frame: background, bubbles, effects. Never fails; nodes with
/// non-finite geometry are reported and skipped.
pub fn draw_frame<S: Surface>(surface: &mut S, scene: &mut Scene, parallax: Vec2, now_ms: f64) {
    let (width, height) = (scene.sim.width(), scene.sim.height());
    surface.clear(width, height, Color::BACKGROUND);

    let shake = scene.effects.screen_shake_offset(now_ms);
    surface.save();
    surface.translate(shake + parallax);

    for node in scene.sim.nodes().iter().filter(|n| !n.is_popped) {
        if !node.has_finite_geometry() {
            log::warn!(
                "Skipping bubble {} with invalid geometry ({:?}, r={})",
                node.id,
                node.pos,
                node.current_radius
            );
            continue;
        }
        draw_bubble(surface, node);
    }

    let Scene { sim, effects, .. } = scene;
    effects.draw(surface, sim.nodes(), now_ms);
    surface.restore();
}

fn draw_bubble<S: Surface>(surface: &mut S, node: &BubbleNode) {
    let base = skill_color(node.skill_level);
    let alpha = if node.is_hidden {
        HIDDEN_ALPHA
    } else if node.is_visited {
        0.45
    } else {
        0.9
    };

    if node.is_hovered {
        surface.fill_circle(
            node.pos,
            node.current_radius * 1.15,
            base.with_alpha(alpha * 0.25),
        );
    }
    surface.fill_radial_gradient(
        node.pos,
        node.current_radius,
        Color::WHITE.with_alpha(alpha * 0.8),
        base.with_alpha(alpha),
    );
    if node.is_tough {
        surface.stroke_circle(node.pos, node.current_radius, 3.0, Color::WHITE.with_alpha(alpha));
    }
    if node.is_hidden {
        return;
    }
    if node.is_question {
        surface.fill_text("?", node.pos, node.current_radius, Color::WHITE.with_alpha(alpha));
    } else if node.current_radius >= LABEL_MIN_RADIUS && !node.name.is_empty() {
        let size = (node.current_radius * 0.35).clamp(10.0, 18.0);
        surface.fill_text(&node.name, node.pos, size, Color::WHITE.with_alpha(alpha));
    }
}
