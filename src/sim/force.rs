//! Force-directed bubble simulation
//!
//! Every tick combines a weak center pull, weak radial attraction toward a
//! ring around the center, weak many-body repulsion and strong collision
//! resolution. Energy (alpha) decays slowly and a watchdog reheats it, so
//! bubbles never fully settle.

use glam::Vec2;
use rand::Rng;

use super::node::{BubbleId, BubbleNode};
use crate::clamp_to_bounds;
use crate::consts::*;

#[derive(Debug, Clone)]
pub struct ForceSimulation {
    width: f32,
    height: f32,
    /// Current energy; scales every continuous force
    alpha: f32,
    alpha_decay: f32,
    running: bool,
    last_watchdog_ms: f64,
    nodes: Vec<BubbleNode>,
}

impl ForceSimulation {
    /// Set up forces for a canvas of the given size
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            alpha: ALPHA_START,
            alpha_decay: ALPHA_DECAY,
            running: true,
            last_watchdog_ms: 0.0,
            nodes: Vec::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.max(0.0);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Refresh energy so impulses keep propagating
    pub fn reheat(&mut self) {
        self.alpha = self.alpha.max(ALPHA_START);
        self.running = true;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Replace the active node list. Position memory lives in the lifecycle
    /// manager and is not touched here.
    pub fn update_nodes(&mut self, nodes: Vec<BubbleNode>) {
        self.nodes = nodes;
    }

    pub fn nodes(&self) -> &[BubbleNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [BubbleNode] {
        &mut self.nodes
    }

    pub fn take_nodes(&mut self) -> Vec<BubbleNode> {
        std::mem::take(&mut self.nodes)
    }

    pub fn node(&self, id: BubbleId) -> Option<&BubbleNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: BubbleId) -> Option<&mut BubbleNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Cancel the watchdog and release all nodes
    pub fn stop(&mut self) {
        self.running = false;
        self.nodes.clear();
        log::debug!("Force simulation stopped");
    }

    /// Advance one frame of force integration
    pub fn tick(&mut self, now_ms: f64) {
        if !self.running {
            return;
        }
        self.watchdog(now_ms);

        let alpha = self.alpha;
        let center = Vec2::new(self.width / 2.0, self.height / 2.0);
        let ring = self.width.min(self.height) * RADIAL_RADIUS_FACTOR;

        // Center pull and radial attraction
        for node in self.nodes.iter_mut().filter(|n| interacts(n)) {
            node.vel += (center - node.pos) * CENTER_STRENGTH * alpha;

            let offset = node.pos - center;
            let dist = offset.length();
            if dist > f32::EPSILON {
                let k = (ring - dist) / dist * RADIAL_STRENGTH * alpha;
                node.vel += offset * k;
            }
        }

        self.apply_many_body(alpha);
        self.apply_collisions();

        for node in self.nodes.iter_mut().filter(|n| interacts(n)) {
            node.pos += node.vel;
        }

        self.alpha += (0.0 - self.alpha) * self.alpha_decay;
    }

    /// Reheat on a fixed interval when energy has decayed below the floor
    fn watchdog(&mut self, now_ms: f64) {
        if now_ms - self.last_watchdog_ms < WATCHDOG_INTERVAL_MS {
            return;
        }
        self.last_watchdog_ms = now_ms;
        if self.alpha < ALPHA_FLOOR {
            self.alpha = ALPHA_START;
            log::debug!("Simulation reheated (alpha {:.3})", self.alpha);
        }
    }

    fn apply_many_body(&mut self, alpha: f32) {
        let n = self.nodes.len();
        let max_dist_sq = CHARGE_MAX_DISTANCE * CHARGE_MAX_DISTANCE;
        for i in 0..n {
            for j in (i + 1)..n {
                if !interacts(&self.nodes[i]) || !interacts(&self.nodes[j]) {
                    continue;
                }
                let delta = self.nodes[j].pos - self.nodes[i].pos;
                let dist_sq = delta.length_squared().max(1.0);
                if dist_sq > max_dist_sq {
                    continue;
                }
                // Negative strength: i is pushed away from j and vice versa
                let w = CHARGE_STRENGTH * alpha / dist_sq;
                self.nodes[i].vel += delta * w;
                self.nodes[j].vel -= delta * w;
            }
        }
    }

    fn apply_collisions(&mut self) {
        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                if !interacts(a) || !interacts(b) {
                    continue;
                }
                let ri = a.current_radius + COLLISION_MARGIN;
                let rj = b.current_radius + COLLISION_MARGIN;
                let min_dist = ri + rj;

                // Resolve against predicted positions
                let delta = (a.pos + a.vel) - (b.pos + b.vel);
                let dist = delta.length();
                if dist >= min_dist || dist <= f32::EPSILON {
                    continue;
                }

                let k = (min_dist - dist) / dist * COLLISION_STRENGTH;
                let (ri2, rj2) = (ri * ri, rj * rj);
                let share_i = rj2 / (ri2 + rj2);
                let push = delta * k;
                self.nodes[i].vel += push * share_i;
                self.nodes[j].vel -= push * (1.0 - share_i);
            }
        }
    }

    /// Additive repulsion of every other node within `radius` of `center`
    ///
    /// Strength falls off linearly to zero at `radius`; the resulting speed is
    /// clamped to the gentle push limit.
    pub fn push_neighbors(
        &mut self,
        center: Vec2,
        radius: f32,
        strength: f32,
        exclude: Option<BubbleId>,
    ) {
        if !center.is_finite() {
            return;
        }
        for node in self.nodes.iter_mut() {
            if !interacts(node) || Some(node.id) == exclude {
                continue;
            }
            let offset = node.pos - center;
            let dist = offset.length();
            if dist >= radius || dist <= f32::EPSILON {
                continue;
            }
            let force = (1.0 - dist / radius) * strength;
            node.vel = (node.vel + offset / dist * force).clamp_length_max(PUSH_MAX_SPEED);
        }
    }

    /// Radial blast from a point; affected nodes are moved one step and kept
    /// inside the canvas
    pub fn explode_from_point<R: Rng>(
        &mut self,
        origin: Vec2,
        radius: f32,
        strength: f32,
        rng: &mut R,
    ) {
        if !origin.is_finite() {
            return;
        }
        let (width, height) = (self.width, self.height);
        let mut affected = 0usize;
        for node in self.nodes.iter_mut().filter(|n| interacts(n)) {
            let offset = node.pos - origin;
            let dist = offset.length();
            if dist >= radius {
                continue;
            }
            let dir = if dist <= f32::EPSILON {
                let angle = rng.random_range(0.0..std::f32::consts::TAU);
                Vec2::new(angle.cos(), angle.sin())
            } else {
                offset / dist
            };
            let force = (1.0 - dist / radius) * strength;
            node.vel = (node.vel + dir * force).clamp_length_max(EXPLOSION_MAX_SPEED);
            node.pos = clamp_to_bounds(node.pos + node.vel, node.current_radius, width, height);
            affected += 1;
        }
        if affected > 0 {
            self.reheat();
        }
    }
}

/// Popped nodes and nodes with broken geometry exert and receive no force
fn interacts(node: &BubbleNode) -> bool {
    !node.is_popped && node.has_finite_geometry() && node.vel.is_finite()
}
