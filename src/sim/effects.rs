//! Transient canvas effects: explosion rings, debris, floating text, shake
//!
//! Every effect carries its own start time and duration and expires once
//! `(now - start) / duration >= 1`. Nothing here feeds back into gameplay.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::node::BubbleNode;
use crate::consts::*;
use crate::ease_out_cubic;
use crate::render::{Color, Surface};

/// Normalized progress of an effect, unclamped
#[inline]
fn progress(now_ms: f64, start_ms: f64, duration_ms: f64) -> f32 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    ((now_ms - start_ms) / duration_ms) as f32
}

#[derive(Debug, Clone)]
pub struct ExplosionEffect {
    pub pos: Vec2,
    pub max_radius: f32,
    pub color: Color,
    pub start_ms: f64,
    pub duration_ms: f64,
}

/// Floating text flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Xp,
    LifeLoss,
    Info,
}

impl TextKind {
    fn color(self) -> Color {
        match self {
            TextKind::Xp => Color::rgb(255, 215, 90),
            TextKind::LifeLoss => Color::rgb(255, 90, 90),
            TextKind::Info => Color::rgb(235, 240, 255),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FloatingText {
    pub text: String,
    pub pos: Vec2,
    pub kind: TextKind,
    pub start_ms: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone)]
pub struct DebrisParticle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub color: Color,
    pub start_ms: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Copy)]
struct ScreenShake {
    start_ms: f64,
    duration_ms: f64,
    intensity: f32,
}

#[derive(Debug, Clone)]
pub struct EffectsLayer {
    explosions: Vec<ExplosionEffect>,
    texts: Vec<FloatingText>,
    debris: Vec<DebrisParticle>,
    shake: Option<ScreenShake>,
    max_debris_per_burst: usize,
    shake_enabled: bool,
    rng: Pcg32,
}

impl EffectsLayer {
    pub fn new(seed: u64, max_debris_per_burst: usize, shake_enabled: bool) -> Self {
        Self {
            explosions: Vec::new(),
            texts: Vec::new(),
            debris: Vec::new(),
            shake: None,
            max_debris_per_burst,
            shake_enabled,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn set_shake_enabled(&mut self, enabled: bool) {
        self.shake_enabled = enabled;
        if !enabled {
            self.shake = None;
        }
    }

    pub fn set_max_debris_per_burst(&mut self, max: usize) {
        self.max_debris_per_burst = max;
    }

    pub fn explosions(&self) -> &[ExplosionEffect] {
        &self.explosions
    }

    pub fn texts(&self) -> &[FloatingText] {
        &self.texts
    }

    pub fn debris(&self) -> &[DebrisParticle] {
        &self.debris
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.is_some()
    }

    pub fn create_explosion_effect(&mut self, pos: Vec2, max_radius: f32, color: Color, now_ms: f64) {
        self.explosions.push(ExplosionEffect {
            pos,
            max_radius,
            color,
            start_ms: now_ms,
            duration_ms: EXPLOSION_DURATION_MS,
        });
    }

    pub fn create_floating_text(&mut self, text: impl Into<String>, pos: Vec2, kind: TextKind, now_ms: f64) {
        self.texts.push(FloatingText {
            text: text.into(),
            pos,
            kind,
            start_ms: now_ms,
            duration_ms: FLOATING_TEXT_DURATION_MS,
        });
    }

    /// Burst of debris flying outward from `pos`
    pub fn create_debris_effect(&mut self, pos: Vec2, source_radius: f32, color: Color, now_ms: f64) {
        let count = self.max_debris_per_burst;
        for _ in 0..count {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let speed = self.rng.random_range(2.0..7.0);
            let dir = Vec2::new(angle.cos(), angle.sin());
            let spawn_dist = self.rng.random_range(0.0..source_radius.max(1.0));
            self.debris.push(DebrisParticle {
                pos: pos + dir * spawn_dist,
                vel: dir * speed,
                size: self.rng.random_range(2.0..5.0),
                color,
                start_ms: now_ms,
                duration_ms: DEBRIS_DURATION_MS * self.rng.random_range(0.7..1.0),
            });
        }
    }

    pub fn trigger_screen_shake(&mut self, intensity: f32, now_ms: f64) {
        if !self.shake_enabled {
            return;
        }
        self.shake = Some(ScreenShake {
            start_ms: now_ms,
            duration_ms: SHAKE_DURATION_MS,
            intensity,
        });
    }

    /// Shake offset for this render; quadratic decay, clears itself when done
    pub fn screen_shake_offset(&mut self, now_ms: f64) -> Vec2 {
        let Some(shake) = self.shake else {
            return Vec2::ZERO;
        };
        let p = progress(now_ms, shake.start_ms, shake.duration_ms);
        if p >= 1.0 {
            self.shake = None;
            return Vec2::ZERO;
        }
        let remaining = 1.0 - p.max(0.0);
        let magnitude = shake.intensity * remaining * remaining;
        let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
        Vec2::new(angle.cos(), angle.sin()) * magnitude
    }

    /// Expire finished effects and integrate debris against the live bubbles
    pub fn update(&mut self, nodes: &[BubbleNode], now_ms: f64) {
        self.explosions
            .retain(|e| progress(now_ms, e.start_ms, e.duration_ms) < 1.0);
        self.texts
            .retain(|t| progress(now_ms, t.start_ms, t.duration_ms) < 1.0);
        self.debris
            .retain(|d| progress(now_ms, d.start_ms, d.duration_ms) < 1.0);

        for particle in &mut self.debris {
            particle.pos += particle.vel;
            particle.vel.y += DEBRIS_GRAVITY;
            collide_debris(particle, nodes);
        }
    }

    /// Update, then render every live effect
    pub fn draw<S: Surface>(&mut self, surface: &mut S, nodes: &[BubbleNode], now_ms: f64) {
        self.update(nodes, now_ms);

        for explosion in &self.explosions {
            let p = progress(now_ms, explosion.start_ms, explosion.duration_ms).max(0.0);
            let radius = explosion.max_radius * ease_out_cubic(p);
            let line_width = 4.0 * (1.0 - p) + 0.5;
            surface.stroke_circle(
                explosion.pos,
                radius,
                line_width,
                explosion.color.with_alpha(1.0 - p),
            );
        }

        for particle in &self.debris {
            let p = progress(now_ms, particle.start_ms, particle.duration_ms).max(0.0);
            surface.fill_circle(particle.pos, particle.size, particle.color.with_alpha(1.0 - p));
        }

        for text in &self.texts {
            let p = progress(now_ms, text.start_ms, text.duration_ms).max(0.0);
            let pos = text.pos - Vec2::new(0.0, FLOATING_TEXT_RISE * ease_out_cubic(p));
            surface.fill_text(&text.text, pos, 18.0, text.kind.color().with_alpha(1.0 - p));
        }
    }

    /// Drop everything, including an in-progress shake
    pub fn clear_all_effects(&mut self) {
        self.explosions.clear();
        self.texts.clear();
        self.debris.clear();
        self.shake = None;
    }
}

/// Resolve at most one bubble collision for a particle this frame
fn collide_debris(particle: &mut DebrisParticle, nodes: &[BubbleNode]) {
    for node in nodes.iter().filter(|n| !n.is_popped && n.has_finite_geometry()) {
        let offset = particle.pos - node.pos;
        let dist = offset.length();
        let min_dist = node.current_radius + particle.size;
        if dist >= min_dist || dist <= f32::EPSILON {
            continue;
        }
        let normal = offset / dist;
        let approach = particle.vel.dot(normal);
        if approach < 0.0 {
            particle.vel = (particle.vel - 2.0 * approach * normal) * DEBRIS_RESTITUTION;
        }
        particle.size *= DEBRIS_SHRINK;
        // Out of the overlap so it cannot stick
        particle.pos = node.pos + normal * (min_dist + 0.5);
        break;
    }
}
