//! The live bubble scene: force simulation, lifecycle and effects together
//!
//! This is the canvas-control surface handed to the interaction controller
//! and the game; nothing reaches it through globals.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::effects::EffectsLayer;
use super::force::ForceSimulation;
use super::lifecycle::{self, BubbleLifecycle};
use super::node::{BubbleId, BubbleNode};
use crate::consts::*;
use crate::content::BubbleRecord;
use crate::render::{Color, skill_color};

#[derive(Debug, Clone)]
pub struct Scene {
    pub sim: ForceSimulation,
    pub lifecycle: BubbleLifecycle,
    pub effects: EffectsLayer,
    rng: Pcg32,
}

impl Scene {
    pub fn new(
        width: f32,
        height: f32,
        seed: u64,
        breathing: bool,
        max_debris: usize,
        shake_enabled: bool,
    ) -> Self {
        Self {
            sim: ForceSimulation::new(width, height),
            lifecycle: BubbleLifecycle::new(breathing),
            // Cosmetic stream, decorrelated from gameplay
            effects: EffectsLayer::new(seed ^ 0x9E37_79B9_7F4A_7C15, max_debris, shake_enabled),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn width(&self) -> f32 {
        self.sim.width()
    }

    pub fn height(&self) -> f32 {
        self.sim.height()
    }

    pub fn nodes(&self) -> &[BubbleNode] {
        self.sim.nodes()
    }

    pub fn node(&self, id: BubbleId) -> Option<&BubbleNode> {
        self.sim.node(id)
    }

    pub fn node_mut(&mut self, id: BubbleId) -> Option<&mut BubbleNode> {
        self.sim.node_mut(id)
    }

    pub fn rng_mut(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    /// Rebuild the node set from records, resuming remembered positions
    pub fn set_bubbles(&mut self, records: &[BubbleRecord]) {
        self.lifecycle.save_positions(self.sim.nodes());
        let (width, height) = (self.width(), self.height());
        let nodes = self
            .lifecycle
            .create_nodes(records, width, height, &mut self.rng);
        log::debug!("Scene rebuilt with {} bubbles", nodes.len());
        self.sim.update_nodes(nodes);
        self.sim.reheat();
    }

    /// Advance physics and idle animation by one frame
    pub fn frame(&mut self, now_ms: f64) {
        self.sim.tick(now_ms);
        let (width, height) = (self.width(), self.height());
        self.lifecycle
            .update_bubble_states(self.sim.nodes_mut(), width, height, now_ms, &mut self.rng);
    }

    pub fn find_bubble_under_cursor(&self, point: Vec2) -> Option<BubbleId> {
        lifecycle::find_bubble_under_cursor(point, self.sim.nodes()).map(|n| n.id)
    }

    /// Gentle push of the bubbles around a hovered one
    pub fn push_neighbors_of(&mut self, id: BubbleId) {
        let Some(node) = self.sim.node(id) else {
            return;
        };
        let (center, radius) = (node.pos, node.current_radius * HOVER_PUSH_RADIUS_FACTOR);
        self.sim
            .push_neighbors(center, radius, HOVER_PUSH_STRENGTH, Some(id));
    }

    /// Repulsion blast plus a visible ring
    pub fn explode_at(&mut self, point: Vec2, radius: f32, strength: f32, now_ms: f64) {
        self.sim
            .explode_from_point(point, radius, strength, &mut self.rng);
        self.effects
            .create_explosion_effect(point, radius * 0.5, Color::WHITE.with_alpha(0.6), now_ms);
    }

    /// Pop a bubble in place: it stops being hit-testable and bursts into
    /// debris; the node itself stays until [`Scene::remove_bubble`]
    pub fn pop_bubble(&mut self, id: BubbleId, radius: f32, strength: f32, now_ms: f64) -> Option<Vec2> {
        let node = self.sim.node_mut(id)?;
        node.is_popped = true;
        let (pos, r, color) = (node.pos, node.current_radius, skill_color(node.skill_level));

        self.sim.explode_from_point(pos, radius, strength, &mut self.rng);
        self.effects.create_explosion_effect(pos, r * 2.0, color, now_ms);
        self.effects.create_debris_effect(pos, r, color, now_ms);
        self.effects.trigger_screen_shake(SHAKE_INTENSITY, now_ms);
        Some(pos)
    }

    /// Drop a node from the live set, remembering where everything was
    pub fn remove_bubble(&mut self, id: BubbleId) -> bool {
        if self.sim.node(id).is_none() {
            return false;
        }
        self.lifecycle.save_positions(self.sim.nodes());
        let next = lifecycle::remove_bubble(id, self.sim.nodes());
        self.sim.update_nodes(next);
        true
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.sim.resize(width, height);
    }

    /// Stop physics and drop effects. Positions survive unless `forget_positions`.
    pub fn teardown(&mut self, forget_positions: bool) {
        self.lifecycle.save_positions(self.sim.nodes());
        self.sim.stop();
        self.effects.clear_all_effects();
        if forget_positions {
            self.lifecycle.clear_saved_positions();
        }
    }

    /// Fresh integrator after a teardown
    pub fn restart_simulation(&mut self) {
        let (width, height) = (self.width(), self.height());
        self.sim = ForceSimulation::new(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with(ids: &[BubbleId]) -> Scene {
        let mut scene = Scene::new(800.0, 600.0, 3, false, 6, true);
        let records: Vec<_> = ids
            .iter()
            .map(|&id| BubbleRecord {
                id,
                ..Default::default()
            })
            .collect();
        scene.set_bubbles(&records);
        scene
    }

    #[test]
    fn test_pop_then_remove() {
        let mut scene = scene_with(&[1, 2, 3]);
        let pos = scene.node(2).unwrap().pos;
        assert_eq!(scene.pop_bubble(2, POP_RADIUS, POP_STRENGTH, 0.0), Some(pos));
        assert_eq!(scene.find_bubble_under_cursor(pos).filter(|&id| id == 2), None);
        assert!(!scene.effects.debris().is_empty());
        assert!(scene.effects.is_shaking());

        assert!(scene.remove_bubble(2));
        assert!(scene.node(2).is_none());
        assert_eq!(scene.nodes().len(), 2);
        assert!(!scene.remove_bubble(2));
    }

    #[test]
    fn test_rebuild_keeps_positions() {
        let mut scene = scene_with(&[1, 2]);
        scene.node_mut(1).unwrap().pos = Vec2::new(200.0, 200.0);
        scene.set_bubbles(&[BubbleRecord {
            id: 1,
            ..Default::default()
        }]);
        assert_eq!(scene.nodes().len(), 1);
        assert_eq!(scene.node(1).unwrap().pos, Vec2::new(200.0, 200.0));
    }

    #[test]
    fn test_broken_node_stays_isolated() {
        let mut scene = scene_with(&[1, 2, 3, 4, 5]);
        for (i, node) in scene.sim.nodes_mut().iter_mut().enumerate() {
            node.pos = Vec2::new(300.0 + 40.0 * i as f32, 300.0);
        }
        scene.node_mut(1).unwrap().pos.x = f32::NAN;

        scene.frame(16.0);
        scene.pop_bubble(1, POP_RADIUS, POP_STRENGTH, 16.0);
        scene.explode_at(Vec2::new(320.0, 300.0), EMPTY_CLICK_RADIUS, EMPTY_CLICK_STRENGTH, 20.0);
        scene.frame(32.0);

        let broken: Vec<BubbleId> = scene
            .nodes()
            .iter()
            .filter(|n| !n.has_finite_geometry() || !n.vel.is_finite())
            .map(|n| n.id)
            .collect();
        assert_eq!(broken, vec![1]);
    }

    #[test]
    fn test_teardown_forgets_positions() {
        let mut scene = scene_with(&[1]);
        scene.effects.trigger_screen_shake(4.0, 0.0);
        scene.teardown(true);
        assert!(scene.nodes().is_empty());
        assert!(!scene.effects.is_shaking());
        assert!(scene.lifecycle.saved_position(1).is_none());
        assert!(!scene.sim.is_running());
        scene.restart_simulation();
        assert!(scene.sim.is_running());
    }
}
