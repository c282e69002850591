//! Bubble lifecycle: node creation, idle animation, removal and hit-testing
//!
//! Positions are remembered by bubble id across node-set rebuilds so a
//! bubble that reappears (filter change, year change, resize) resumes where
//! it was instead of jumping.

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;

use super::node::{BubbleId, BubbleNode};
use crate::clamp_to_bounds;
use crate::consts::*;
use crate::content::BubbleRecord;

/// Reference canvas edge used to scale bubble radii
const REFERENCE_EDGE: f32 = 800.0;

/// Remembered kinematic state of a bubble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedPosition {
    pub pos: Vec2,
    pub vel: Vec2,
}

#[derive(Debug, Clone)]
pub struct BubbleLifecycle {
    saved_positions: HashMap<BubbleId, SavedPosition>,
    /// Idle radius oscillation (disabled on low-power platforms)
    breathing_enabled: bool,
}

impl Default for BubbleLifecycle {
    fn default() -> Self {
        Self::new(true)
    }
}

impl BubbleLifecycle {
    pub fn new(breathing_enabled: bool) -> Self {
        Self {
            saved_positions: HashMap::new(),
            breathing_enabled,
        }
    }

    pub fn breathing_enabled(&self) -> bool {
        self.breathing_enabled
    }

    pub fn set_breathing(&mut self, enabled: bool) {
        self.breathing_enabled = enabled;
    }

    /// Radius scale for the canvas size
    pub fn radius_scale(width: f32, height: f32) -> f32 {
        (width.min(height) / REFERENCE_EDGE).clamp(0.6, 1.4)
    }

    /// Turn content records into simulation-ready nodes
    pub fn create_nodes<R: Rng>(
        &self,
        records: &[BubbleRecord],
        width: f32,
        height: f32,
        rng: &mut R,
    ) -> Vec<BubbleNode> {
        let scale = Self::radius_scale(width, height);
        records
            .iter()
            .map(|record| {
                let base_radius = record.skill_level.base_radius() * scale;
                let mut node = BubbleNode::new(record.id, record.skill_level, base_radius);
                node.name = record.name.clone();
                node.year = record.year;
                node.is_hidden = record.is_hidden;
                node.is_question = record.is_question;
                node.is_tough = record.is_tough;
                node.question_id = record.question_id;
                node.oscillation_phase = rng.random_range(0.0..std::f32::consts::TAU);

                match self.saved_positions.get(&record.id) {
                    Some(saved) => {
                        node.pos = clamp_to_bounds(saved.pos, base_radius, width, height);
                        node.vel = saved.vel;
                    }
                    None => {
                        let max_x = (width - base_radius).max(base_radius + 1.0);
                        let max_y = (height - base_radius).max(base_radius + 1.0);
                        node.pos = Vec2::new(
                            rng.random_range(base_radius..max_x),
                            rng.random_range(base_radius..max_y),
                        );
                        node.vel = Vec2::ZERO;
                    }
                }
                node
            })
            .collect()
    }

    /// Per-frame idle animation, damping and containment
    pub fn update_bubble_states<R: Rng>(
        &self,
        nodes: &mut [BubbleNode],
        width: f32,
        height: f32,
        now_ms: f64,
        rng: &mut R,
    ) {
        // Wrap to keep f32 phase precision over long sessions
        let t = (now_ms % 1.0e7) as f32;
        for node in nodes.iter_mut().filter(|n| !n.is_popped) {
            node.radius += (node.target_radius - node.radius) * RADIUS_EASE;

            let breathing = if self.breathing_enabled {
                1.0 + (t * BREATHING_SPEED + node.oscillation_phase).sin() * BREATHING_AMPLITUDE
            } else {
                1.0
            };
            let pulse = match node.pulse.and_then(|p| p.scale_at(now_ms)) {
                Some(scale) => scale,
                None => {
                    node.pulse = None;
                    1.0
                }
            };
            node.current_radius = (node.radius * breathing * pulse).max(0.0);

            // Slow drift, independent per node
            let phase = node.oscillation_phase;
            node.pos.x += (t * DRIFT_SPEED + phase).sin() * DRIFT_AMPLITUDE
                + rng.random_range(-DRIFT_JITTER..=DRIFT_JITTER);
            node.pos.y += (t * DRIFT_SPEED * 0.8 + phase * 1.3).cos() * DRIFT_AMPLITUDE
                + rng.random_range(-DRIFT_JITTER..=DRIFT_JITTER);

            node.vel *= VELOCITY_DAMPING;
            if node.vel.x.abs() < VELOCITY_EPSILON {
                node.vel.x = 0.0;
            }
            if node.vel.y.abs() < VELOCITY_EPSILON {
                node.vel.y = 0.0;
            }

            let padded = node.current_radius * 1.05;
            let clamped = clamp_to_bounds(node.pos, padded, width, height);
            if clamped.x != node.pos.x {
                node.vel.x = 0.0;
            }
            if clamped.y != node.pos.y {
                node.vel.y = 0.0;
            }
            node.pos = clamped;
        }
    }

    /// Remember the kinematic state of every node
    pub fn save_positions(&mut self, nodes: &[BubbleNode]) {
        for node in nodes {
            self.saved_positions.insert(
                node.id,
                SavedPosition {
                    pos: node.pos,
                    vel: node.vel,
                },
            );
        }
    }

    pub fn clear_saved_positions(&mut self) {
        self.saved_positions.clear();
    }

    pub fn saved_position(&self, id: BubbleId) -> Option<SavedPosition> {
        self.saved_positions.get(&id).copied()
    }
}

/// The node list without `id`. Does not touch the simulation; callers push
/// the result back themselves.
pub fn remove_bubble(id: BubbleId, nodes: &[BubbleNode]) -> Vec<BubbleNode> {
    nodes.iter().filter(|n| n.id != id).cloned().collect()
}

/// Topmost live node containing the point (later nodes draw on top)
pub fn find_bubble_under_cursor(point: Vec2, nodes: &[BubbleNode]) -> Option<&BubbleNode> {
    nodes
        .iter()
        .rev()
        .find(|n| !n.is_popped && n.contains(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::node::SkillLevel;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn record(id: BubbleId) -> BubbleRecord {
        BubbleRecord {
            id,
            name: format!("bubble {}", id),
            ..Default::default()
        }
    }

    fn node_at(id: BubbleId, x: f32, y: f32, r: f32) -> BubbleNode {
        let mut node = BubbleNode::new(id, SkillLevel::Novice, r);
        node.pos = Vec2::new(x, y);
        node
    }

    #[test]
    fn test_create_nodes_in_bounds() {
        let mut rng = Pcg32::seed_from_u64(1);
        let lifecycle = BubbleLifecycle::default();
        let records: Vec<_> = (0..30).map(record).collect();
        let nodes = lifecycle.create_nodes(&records, 800.0, 600.0, &mut rng);
        assert_eq!(nodes.len(), 30);
        for node in &nodes {
            assert!(node.pos.x >= node.base_radius && node.pos.x <= 800.0 - node.base_radius);
            assert!(node.pos.y >= node.base_radius && node.pos.y <= 600.0 - node.base_radius);
            assert_eq!(node.vel, Vec2::ZERO);
            assert_eq!(node.radius, node.base_radius);
        }
    }

    #[test]
    fn test_position_memory_survives_removal() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut lifecycle = BubbleLifecycle::default();
        let records = vec![record(1), record(2)];
        let mut nodes = lifecycle.create_nodes(&records, 800.0, 600.0, &mut rng);
        nodes[0].pos = Vec2::new(123.0, 234.0);
        nodes[0].vel = Vec2::new(1.5, -2.5);

        lifecycle.save_positions(&nodes);
        let remaining = remove_bubble(1, &nodes);
        assert_eq!(remaining.len(), 1);

        let readded = lifecycle.create_nodes(&[record(1)], 800.0, 600.0, &mut rng);
        assert_eq!(readded[0].pos, Vec2::new(123.0, 234.0));
        assert_eq!(readded[0].vel, Vec2::new(1.5, -2.5));

        lifecycle.clear_saved_positions();
        assert!(lifecycle.saved_position(1).is_none());
        let fresh = lifecycle.create_nodes(&[record(1)], 800.0, 600.0, &mut rng);
        assert_eq!(fresh[0].vel, Vec2::ZERO);
    }

    #[test]
    fn test_remove_bubble_is_pure() {
        let nodes = vec![node_at(1, 0.0, 0.0, 5.0), node_at(2, 0.0, 0.0, 5.0)];
        let next = remove_bubble(2, &nodes);
        assert_eq!(nodes.len(), 2);
        assert_eq!(next.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(remove_bubble(99, &nodes).len(), 2);
    }

    #[test]
    fn test_overlap_returns_topmost() {
        let nodes = vec![
            node_at(1, 100.0, 100.0, 40.0),
            node_at(2, 120.0, 100.0, 40.0),
        ];
        let hit = find_bubble_under_cursor(Vec2::new(110.0, 100.0), &nodes).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn test_popped_nodes_not_hit() {
        let mut nodes = vec![node_at(1, 100.0, 100.0, 40.0)];
        nodes[0].is_popped = true;
        assert!(find_bubble_under_cursor(Vec2::new(100.0, 100.0), &nodes).is_none());
    }

    #[test]
    fn test_damping_snaps_to_rest() {
        let mut rng = Pcg32::seed_from_u64(3);
        let lifecycle = BubbleLifecycle::new(false);
        let mut nodes = vec![node_at(1, 400.0, 300.0, 30.0)];
        nodes[0].vel = Vec2::new(0.5, -0.5);
        for frame in 0..200 {
            lifecycle.update_bubble_states(&mut nodes, 800.0, 600.0, frame as f64 * 16.0, &mut rng);
        }
        assert_eq!(nodes[0].vel, Vec2::ZERO);
    }

    #[test]
    fn test_breathing_bounded() {
        let mut rng = Pcg32::seed_from_u64(4);
        let lifecycle = BubbleLifecycle::new(true);
        let mut nodes = vec![node_at(1, 400.0, 300.0, 30.0)];
        for frame in 0..500 {
            lifecycle.update_bubble_states(&mut nodes, 800.0, 600.0, frame as f64 * 16.0, &mut rng);
            let r = nodes[0].current_radius;
            assert!(r >= 30.0 * (1.0 - BREATHING_AMPLITUDE) - 1e-3);
            assert!(r <= 30.0 * (1.0 + BREATHING_AMPLITUDE) + 1e-3);
        }
    }

    #[test]
    fn test_hover_target_eases_radius() {
        let mut rng = Pcg32::seed_from_u64(5);
        let lifecycle = BubbleLifecycle::new(false);
        let mut nodes = vec![node_at(1, 400.0, 300.0, 30.0)];
        nodes[0].target_radius = 36.0;
        for frame in 0..60 {
            lifecycle.update_bubble_states(&mut nodes, 800.0, 600.0, frame as f64 * 16.0, &mut rng);
        }
        assert!((nodes[0].current_radius - 36.0).abs() < 0.1);
    }

    proptest! {
        #[test]
        fn prop_hit_single_node(
            x in 100.0f32..700.0,
            y in 100.0f32..500.0,
            r in 10.0f32..60.0,
            angle in 0.0f32..std::f32::consts::TAU,
            frac in 0.0f32..0.99,
        ) {
            let nodes = vec![
                node_at(1, x, y, r),
                // Far away, never overlapping
                node_at(2, x + 1000.0, y + 1000.0, r),
            ];
            let inside = Vec2::new(x, y) + Vec2::new(angle.cos(), angle.sin()) * r * frac;
            prop_assert_eq!(find_bubble_under_cursor(inside, &nodes).map(|n| n.id), Some(1));

            let outside = Vec2::new(x, y) + Vec2::new(angle.cos(), angle.sin()) * r * 1.5;
            prop_assert!(find_bubble_under_cursor(outside, &nodes).is_none());
        }
    }
}
